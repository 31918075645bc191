use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{Config, HeadwatersInput, LayerSource, PrecipitationInput, SoilInput, Stage};
use crate::error::{ModelError, Result};
use crate::model::slope::SlopeTransform;
use crate::model::{
    self, CFactor, Importance, ImportanceLayer, LandCover, PriorityMasks, Rainfall, RunoffInput, RunoffParams,
};
use crate::raster::{CellStat, Raster, cell_statistics, check_aligned, ops, resample};
use crate::readers::{read_features, read_raster};
use crate::soils::{SoilAttribute, SoilMapUnits, soil_attribute_raster};
use crate::utils::{log_raster_summary, resolve_raster_files};
use crate::vector::{Feature, centroids};
use crate::workflow::RunManifest;
use crate::writers::write_raster;

/// Runs the selected workflow stages on the grid of the elevation input.
///
/// Products are written to the output directory as they are made. A stage
/// that needs a product from a stage that was not selected reads it back
/// from a previous run's output.
pub struct WorkflowRunner {
    config: Config,
    template: Raster,
    products: HashMap<String, Raster>,
    manifest: RunManifest,
}

impl WorkflowRunner {
    pub fn new(config: Config) -> Result<Self> {
        let elevation = &config.inputs().elevation;
        info!("Reading processing grid from {}", elevation.display());

        let mut template = read_raster(elevation)?;
        if let Some(bbox) = config.bbox() {
            template = template.crop(bbox)?;
        }
        log_raster_summary("elevation", &template);

        fs::create_dir_all(config.output_directory())?;
        let manifest = RunManifest::new(config.output_directory());

        Ok(Self {
            config,
            template,
            products: HashMap::new(),
            manifest,
        })
    }

    pub fn template(&self) -> &Raster {
        &self.template
    }

    /// In-memory product from this run, if it was made
    pub fn get(&self, name: &str) -> Option<&Raster> {
        self.products.get(name)
    }

    pub fn run(mut self) -> Result<RunManifest> {
        let stages = self.config.stages().to_vec();
        info!("Running {} stages: {:?}", stages.len(), stages);

        for stage in &stages {
            info!("=== Stage {} ===", stage);
            match stage {
                Stage::SoilLoss => self.soil_loss()?,
                Stage::Runoff => self.runoff()?,
                Stage::SoilSensitivity => self.soil_sensitivity()?,
                Stage::Flow => self.flow()?,
                Stage::Karst => self.karst()?,
                Stage::Position => self.position()?,
                Stage::Impact => self.impact()?,
                Stage::Priority => self.priority()?,
            }
            self.manifest.stages.push(*stage);
        }

        self.manifest.finish();
        let path = self.manifest.save()?;
        info!("Mission complete. Manifest saved to {}", path.display());

        Ok(self.manifest)
    }

    fn product_path(&self, name: &str) -> PathBuf {
        self.config
            .output_directory()
            .join(format!("{}.{}", name, self.config.output_format().extension()))
    }

    fn store(&mut self, stage: Stage, name: &str, raster: Raster) -> Result<()> {
        log_raster_summary(name, &raster);

        let path = self.product_path(name);
        write_raster(&raster, &path)?;
        info!("Saved {}", path.display());

        self.manifest
            .record(stage, name, &path, raster.statistics().valid_count);
        self.products.insert(name.to_string(), raster);
        Ok(())
    }

    /// Product made earlier in this run, or written by a previous one
    fn product(&mut self, name: &str) -> Result<Raster> {
        if let Some(raster) = self.products.get(name) {
            return Ok(raster.clone());
        }

        let path = self.product_path(name);
        if !path.exists() {
            return Err(ModelError::Workflow(format!(
                "product '{}' is not available; run the stage that makes it first ({} not found)",
                name,
                path.display()
            )));
        }

        debug!("Reading product {} from {}", name, path.display());
        let raster = read_raster(&path)?;
        check_aligned(&self.template, &raster)?;
        self.products.insert(name.to_string(), raster.clone());
        Ok(raster)
    }

    /// Read a raster that is already on the processing grid
    fn load_aligned(&self, path: &Path) -> Result<Raster> {
        let mut raster = read_raster(path)?;
        if let Some(bbox) = self.config.bbox() {
            raster = raster.crop(bbox)?;
        }
        check_aligned(&self.template, &raster)
            .map_err(|e| ModelError::NotAligned(format!("{}: {}", path.display(), e)))?;
        Ok(raster)
    }

    /// Read a coarse raster and downscale it onto the processing grid
    fn load_downscaled(&self, path: &Path) -> Result<Raster> {
        let raster = read_raster(path)?;
        if check_aligned(&self.template, &raster).is_ok() {
            return Ok(raster);
        }
        info!("Downscaling {} to the processing grid...", path.display());
        resample::bilinear(&raster, &self.template)
    }

    fn load_mask(&self, path: Option<&PathBuf>) -> Result<Option<Raster>> {
        path.map(|p| self.load_aligned(p)).transpose()
    }

    /// Cells where the elevation is valid
    fn domain(&self) -> Raster {
        ops::map(&self.template, |_| 1.0)
    }

    fn load_soil(&self, input: &SoilInput, attribute: SoilAttribute) -> Result<Raster> {
        match input {
            SoilInput::Raster(source) => {
                let files = resolve_raster_files(source)?;
                let rasters = files
                    .iter()
                    .map(|f| self.load_aligned(f))
                    .collect::<Result<Vec<_>>>()?;
                let refs: Vec<&Raster> = rasters.iter().collect();
                cell_statistics(&refs, CellStat::Maximum)
            }
            SoilInput::Soils(paths) => {
                let field = attribute.source_field();
                let mut sources = Vec::with_capacity(paths.len());
                for path in paths {
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string());
                    match read_features(path, &[field]) {
                        Ok(features) => sources.push(SoilMapUnits { name, features }),
                        Err(e) => warn!("Failed to read {}: {}", name, e),
                    }
                }
                soil_attribute_raster(&mut sources, attribute, &self.template)
            }
        }
    }

    /// Name tag for products that depend on the land cover assumption
    fn cover_tag(&self) -> &'static str {
        if self.config.inputs().land_cover.is_some() {
            "lc"
        } else {
            "bare"
        }
    }

    fn soil_loss(&mut self) -> Result<()> {
        let stage = Stage::SoilLoss;
        let inputs = self.config.inputs().clone();
        let params = self.config.parameters().clone();

        let r_path = inputs
            .r_factor
            .as_ref()
            .ok_or_else(|| ModelError::Workflow("r_factor input is required".into()))?;
        let k_input = inputs
            .k_factor
            .as_ref()
            .ok_or_else(|| ModelError::Workflow("k_factor input is required".into()))?;

        info!("Preparing the R-factor raster...");
        let r = self.load_downscaled(r_path)?;
        self.store(stage, "rusleR", r.clone())?;

        info!("Preparing the K-factor raster...");
        let k = self.load_soil(k_input, SoilAttribute::KFactor)?;
        self.store(stage, "rusleK", k.clone())?;

        info!("Preparing the S-factor raster...");
        let slope = model::slope_transform(&self.template, params.slope_input, SlopeTransform::Rusle, params.z_factor)?;
        if let Some(percent) = slope.percent_slope {
            self.store(stage, "slope_perc", percent)?;
        }
        self.store(stage, "rusleS", slope.transformed.clone())?;

        let rksc = model::soil_loss_rksc(&r, &k, &slope.transformed, CFactor::Constant(params.c_factor))?;
        self.store(stage, "rusleRKSC_bare", rksc)
    }

    fn precipitation(&self, input: &PrecipitationInput) -> Result<Raster> {
        match input {
            PrecipitationInput::Raster(path) => self.load_downscaled(path),
            PrecipitationInput::Points { path, field } => {
                info!("Interpolating precipitation from {}...", path.display());
                let features = read_features(path, &[field.as_str()])?;
                let points = centroids(&features, field)?;
                let params = self.config.parameters();
                model::interpolate::idw(&points, &self.template, params.idw_power, params.idw_radius)
            }
        }
    }

    fn runoff(&mut self) -> Result<()> {
        let stage = Stage::Runoff;
        let inputs = self.config.inputs().clone();
        let params = self.config.parameters().clone();
        let tag = self.cover_tag();

        let hydro_input = inputs
            .hydro_group
            .as_ref()
            .ok_or_else(|| ModelError::Workflow("hydro_group input is required".into()))?;
        let precip_input = inputs
            .precipitation
            .as_ref()
            .ok_or_else(|| ModelError::Workflow("precipitation input is required".into()))?;

        info!("Preparing the hydrologic group raster...");
        let hydro = self.load_soil(hydro_input, SoilAttribute::HydroGroup)?;
        self.store(stage, "HydroGrp", hydro.clone())?;

        info!("Preparing the curve number raster...");
        let curve_numbers = match &inputs.land_cover {
            Some(path) => {
                let lc = self.load_aligned(path)?;
                model::curve_number(LandCover::Raster(&lc), &hydro)?
            }
            None => model::curve_number(LandCover::Constant(params.land_cover_code), &hydro)?,
        };
        self.store(stage, &format!("curvNum_{}", tag), curve_numbers.clone())?;

        info!("Preparing the rainfall raster...");
        let precip = self.precipitation(precip_input)?;
        self.store(stage, "maxPrecip", precip.clone())?;

        let runoff_params = RunoffParams {
            conv_fact: params.precip_conversion,
            volume: params.runoff_volume,
            cell_area_cm2: None,
        };
        let out = model::event_runoff(&curve_numbers, RunoffInput::CurveNumber, Rainfall::Raster(&precip), runoff_params)?;

        if let Some(retention) = out.retention {
            self.store(stage, &format!("Retention_{}", tag), retention)?;
        }
        self.store(stage, &format!("runoffDepth_{}", tag), out.depth)?;
        if let Some(volume) = out.volume {
            self.store(stage, &format!("runoffVol_{}", tag), volume)?;
        }
        Ok(())
    }

    fn soil_sensitivity(&mut self) -> Result<()> {
        let stage = Stage::SoilSensitivity;
        let tag = self.cover_tag();

        let soil_loss = self.product("rusleRKSC_bare")?;
        let runoff = self.product(&format!("runoffDepth_{tag}"))?;
        let mask = self.load_mask(self.config.inputs().process_mask.as_ref())?;

        let out = model::soil_sensitivity_score(&soil_loss, &runoff, mask.as_ref(), self.config.parameters().num_sd)?;

        self.store(stage, &format!("soilLoss_Score_{}", tag), out.soil_loss_score)?;
        self.store(stage, &format!("runoff_Score_{}", tag), out.runoff_score)?;
        self.store(stage, &format!("soilSens_Score_{}", tag), out.sensitivity)
    }

    fn headwaters(&self, input: &HeadwatersInput) -> Result<Raster> {
        match input {
            HeadwatersInput::Raster(path) => self.load_aligned(path),
            HeadwatersInput::Vector {
                flowlines,
                catchments,
                boundary,
            } => {
                let fields = self.config.parameters().headwater_fields();
                let flowlines = read_features(flowlines, &[fields.id.as_str(), fields.flag.as_str()])?;
                let catchments = read_features(catchments, &[fields.id.as_str()])?;
                let boundary = read_features(boundary, &[])?;

                let mask = match self.load_mask(self.config.inputs().process_mask.as_ref())? {
                    Some(mask) => mask,
                    None => self.domain(),
                };
                model::headwaters_indicator(&flowlines, &catchments, &boundary, &mask, &fields)
            }
        }
    }

    fn flow(&mut self) -> Result<()> {
        let stage = Stage::Flow;
        let inputs = self.config.inputs().clone();

        let flow_path = inputs
            .flow_length
            .as_ref()
            .ok_or_else(|| ModelError::Workflow("flow_length input is required".into()))?;
        let flow_length = self.load_aligned(flow_path)?;

        let headwaters = match &inputs.headwaters {
            Some(input) => {
                let raster = self.headwaters(input)?;
                self.store(stage, "Hdwtrs", raster.clone())?;
                Some(raster)
            }
            None => None,
        };

        let score = model::flow_score(&flow_length, headwaters.as_ref(), &self.config.parameters().flow_params())?;
        self.store(stage, "FlowScore", score)
    }

    fn karst(&mut self) -> Result<()> {
        let stage = Stage::Karst;
        let inputs = self.config.inputs().clone();
        let params = self.config.parameters().clone();

        let proc_mask = self.domain();
        let clip_mask = match self.load_mask(inputs.clip_mask.as_ref())? {
            Some(mask) => mask,
            None => proc_mask.clone(),
        };

        let sink_score = match &inputs.sinkholes {
            Some(sinks) => {
                let polys = read_features(&sinks.path, &[sinks.area_field.as_str()])?;
                let out = model::sink_score(&polys, &sinks.area_field, &proc_mask, &clip_mask, params.search_radius)?;
                info!("{} sinkhole centroids", out.points.len());
                self.store(stage, "sinkDens", out.density)?;
                self.store(stage, "sinkScore", out.score.clone())?;
                Some(out.score)
            }
            None => None,
        };

        let karst_params = params.karst_params();
        let out = match &inputs.karst {
            Some(LayerSource::Raster(path)) => {
                let karst = self.load_aligned(path)?;
                model::karst_score_from_raster(&karst, &proc_mask, &clip_mask, sink_score.as_ref(), &karst_params)?
            }
            Some(LayerSource::Vector(path)) => {
                let polys: Vec<Feature> = read_features(path, &[])?;
                model::karst_score(&polys, &proc_mask, &clip_mask, sink_score.as_ref(), &karst_params)?
            }
            None => return Err(ModelError::Workflow("karst input is required".into())),
        };

        self.store(stage, "karst_Raster", out.karst_raster)?;
        self.store(stage, "karst_eDist", out.distance)?;
        if sink_score.is_some() {
            self.store(stage, "karst_distScore", out.distance_score)?;
        }
        self.store(stage, "KarstScore", out.score)
    }

    fn position(&mut self) -> Result<()> {
        let flow = self.product("FlowScore")?;
        let karst = self.product("KarstScore")?;
        let score = model::position_score(&flow, &karst)?;
        self.store(Stage::Position, "PositionScore", score)
    }

    fn impact(&mut self) -> Result<()> {
        let sensitivity_name = format!("soilSens_Score_{}", self.cover_tag());
        let position = self.product("PositionScore")?;
        let sensitivity = self.product(&sensitivity_name)?;
        let score = model::impact_score(&position, &sensitivity)?;
        self.store(Stage::Impact, "ImpactScore", score)
    }

    fn priority(&mut self) -> Result<()> {
        let stage = Stage::Priority;
        let inputs = self.config.inputs().clone();
        let rescale = self.config.parameters().rescale()?;

        let impact = self.product("ImpactScore")?;

        let importance = match &inputs.importance {
            Some(layers) => {
                let mut loaded = Vec::with_capacity(layers.len());
                for layer in layers {
                    let name = layer.path.display().to_string();
                    loaded.push((name, read_features(&layer.path, &[])?, layer.weight));
                }
                let layers: Vec<ImportanceLayer> = loaded
                    .iter()
                    .map(|(name, features, weight)| ImportanceLayer {
                        name,
                        features,
                        weight: *weight,
                    })
                    .collect();
                let score = model::importance_score(&layers, &self.template)?;
                self.store(stage, "ImportanceScore", score.clone())?;
                Some(score)
            }
            None => None,
        };

        let conservation = self.load_mask(inputs.conservation_mask.as_ref())?;
        let restoration = self.load_mask(inputs.restoration_mask.as_ref())?;
        let management = self.load_mask(inputs.management_mask.as_ref())?;
        let masks = PriorityMasks {
            conservation: conservation.as_ref(),
            restoration: restoration.as_ref(),
            management: management.as_ref(),
        };

        let importance = match &importance {
            Some(raster) => Importance::Raster(raster),
            None => Importance::Constant,
        };

        let out = model::priority_scores(&impact, importance, masks, rescale)?;

        self.store(stage, "genPriority", out.general)?;
        if let (Some(raster), Some(suffix)) = (out.rescaled, rescale.suffix()) {
            self.store(stage, &format!("genPriority_{}", suffix), raster)?;
        }
        for (name, raster) in [
            ("consPriority", out.conservation),
            ("restPriority", out.restoration),
            ("mgmtPriority", out.management),
        ] {
            if let Some(raster) = raster {
                self.store(stage, name, raster)?;
            }
        }
        Ok(())
    }
}
