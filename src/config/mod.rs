use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::bbox::Bbox;
use crate::model::slope::SlopeInput;
use crate::model::{FlowParams, HeadwaterFields, KarstParams, Rescale};

pub mod error;
pub use error::ConfigError;

pub mod stage;
pub use stage::Stage;

/// Soil attribute source: a raster (file, directory or glob pattern) or a
/// list of gSSURGO map unit layers
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SoilInput {
    Raster(String),
    Soils(Vec<PathBuf>),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PrecipitationInput {
    Raster(PathBuf),
    /// Point samples (e.g. PMP tool output) interpolated onto the grid
    Points { path: PathBuf, field: String },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum HeadwatersInput {
    /// Prepared 0/1 indicator raster
    Raster(PathBuf),
    Vector {
        flowlines: PathBuf,
        catchments: PathBuf,
        boundary: PathBuf,
    },
}

/// A layer given either as a raster (valid cells are "inside") or polygons
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayerSource {
    Raster(PathBuf),
    Vector(PathBuf),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SinkholeInput {
    pub path: PathBuf,
    pub area_field: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ImportanceInput {
    pub path: PathBuf,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// File format of the written products
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    #[serde(rename = "tif")]
    GeoTiff,
    #[serde(rename = "asc")]
    AsciiGrid,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::GeoTiff => "tif",
            OutputFormat::AsciiGrid => "asc",
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Inputs {
    /// Digital elevation model; also fixes the processing grid
    pub elevation: PathBuf,
    pub r_factor: Option<PathBuf>,
    pub k_factor: Option<SoilInput>,
    pub hydro_group: Option<SoilInput>,
    pub precipitation: Option<PrecipitationInput>,
    /// Classified NLCD raster; without it `land_cover_code` applies everywhere
    pub land_cover: Option<PathBuf>,
    /// Processing area for the soil sensitivity and headwaters steps
    pub process_mask: Option<PathBuf>,
    pub clip_mask: Option<PathBuf>,
    pub flow_length: Option<PathBuf>,
    pub headwaters: Option<HeadwatersInput>,
    pub karst: Option<LayerSource>,
    pub sinkholes: Option<SinkholeInput>,
    pub importance: Option<Vec<ImportanceInput>>,
    pub conservation_mask: Option<PathBuf>,
    pub restoration_mask: Option<PathBuf>,
    pub management_mask: Option<PathBuf>,
}

impl Inputs {
    pub fn new<P: AsRef<Path>>(elevation: P) -> Self {
        Self {
            elevation: elevation.as_ref().to_path_buf(),
            r_factor: None,
            k_factor: None,
            hydro_group: None,
            precipitation: None,
            land_cover: None,
            process_mask: None,
            clip_mask: None,
            flow_length: None,
            headwaters: None,
            karst: None,
            sinkholes: None,
            importance: None,
            conservation_mask: None,
            restoration_mask: None,
            management_mask: None,
        }
    }

    /// Inputs a stage cannot run without
    fn check_required(&self, stage: Stage) -> Result<(), ConfigError> {
        let missing = |input: &'static str| ConfigError::MissingInput {
            stage: stage.name(),
            input,
        };
        match stage {
            Stage::SoilLoss => {
                if self.r_factor.is_none() {
                    return Err(missing("r_factor"));
                }
                if self.k_factor.is_none() {
                    return Err(missing("k_factor"));
                }
            }
            Stage::Runoff => {
                if self.hydro_group.is_none() {
                    return Err(missing("hydro_group"));
                }
                if self.precipitation.is_none() {
                    return Err(missing("precipitation"));
                }
            }
            Stage::Flow => {
                if self.flow_length.is_none() {
                    return Err(missing("flow_length"));
                }
            }
            Stage::Karst => {
                if self.karst.is_none() {
                    return Err(missing("karst"));
                }
            }
            Stage::SoilSensitivity | Stage::Position | Stage::Impact | Stage::Priority => {}
        }
        Ok(())
    }

    /// Every concrete file path named by the inputs
    fn paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = vec![self.elevation.as_path()];
        let optional = [
            &self.r_factor,
            &self.land_cover,
            &self.process_mask,
            &self.clip_mask,
            &self.flow_length,
            &self.conservation_mask,
            &self.restoration_mask,
            &self.management_mask,
        ];
        paths.extend(optional.into_iter().flatten().map(PathBuf::as_path));

        for soil in [&self.k_factor, &self.hydro_group].into_iter().flatten() {
            match soil {
                // Patterns are expanded at run time
                SoilInput::Raster(p) if is_pattern(p) => {}
                SoilInput::Raster(p) => paths.push(Path::new(p)),
                SoilInput::Soils(list) => paths.extend(list.iter().map(PathBuf::as_path)),
            }
        }

        match &self.precipitation {
            Some(PrecipitationInput::Raster(p)) | Some(PrecipitationInput::Points { path: p, .. }) => {
                paths.push(p.as_path())
            }
            None => {}
        }

        match &self.headwaters {
            Some(HeadwatersInput::Raster(p)) => paths.push(p.as_path()),
            Some(HeadwatersInput::Vector {
                flowlines,
                catchments,
                boundary,
            }) => paths.extend([flowlines.as_path(), catchments.as_path(), boundary.as_path()]),
            None => {}
        }

        if let Some(LayerSource::Raster(p) | LayerSource::Vector(p)) = &self.karst {
            paths.push(p.as_path());
        }
        if let Some(sinks) = &self.sinkholes {
            paths.push(sinks.path.as_path());
        }
        if let Some(layers) = &self.importance {
            paths.extend(layers.iter().map(|l| l.path.as_path()));
        }

        paths
    }
}

fn is_pattern(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    pub slope_input: SlopeInput,
    /// Elevation unit to ground unit factor (0.01 for a DEM in centimetres)
    pub z_factor: f64,
    pub c_factor: f64,
    pub land_cover_code: u16,
    pub num_sd: f64,
    /// Multiplier converting precipitation to inches
    pub precip_conversion: f64,
    pub runoff_volume: bool,
    pub idw_power: f64,
    pub idw_radius: Option<f64>,
    pub flow_min_dist: f64,
    pub flow_max_dist: f64,
    pub discount: f64,
    pub search_radius: f64,
    pub karst_min_dist: f64,
    pub karst_max_dist: f64,
    pub rescale: String,
    pub slice: usize,
    pub headwater_id_field: String,
    pub headwater_flag_field: String,
}

impl Default for Parameters {
    fn default() -> Self {
        let flow = FlowParams::default();
        let karst = KarstParams::default();
        let fields = HeadwaterFields::default();
        Self {
            slope_input: SlopeInput::Elevation,
            z_factor: 1.0,
            c_factor: crate::model::soil_loss::BARE_SOIL_C_FACTOR,
            land_cover_code: crate::model::BARE_SOIL,
            num_sd: crate::model::rescale::DEFAULT_NUM_SD,
            precip_conversion: 1.0,
            runoff_volume: false,
            idw_power: crate::model::interpolate::DEFAULT_POWER,
            idw_radius: None,
            flow_min_dist: flow.min_dist,
            flow_max_dist: flow.max_dist,
            discount: flow.discount,
            search_radius: crate::model::karst::DEFAULT_SEARCH_RADIUS,
            karst_min_dist: karst.min_dist,
            karst_max_dist: karst.max_dist,
            rescale: "SLICE".to_string(),
            slice: 10,
            headwater_id_field: fields.id,
            headwater_flag_field: fields.flag,
        }
    }
}

impl Parameters {
    pub fn flow_params(&self) -> FlowParams {
        FlowParams {
            min_dist: self.flow_min_dist,
            max_dist: self.flow_max_dist,
            discount: self.discount,
        }
    }

    pub fn karst_params(&self) -> KarstParams {
        KarstParams {
            min_dist: self.karst_min_dist,
            max_dist: self.karst_max_dist,
        }
    }

    pub fn headwater_fields(&self) -> HeadwaterFields {
        HeadwaterFields {
            id: self.headwater_id_field.clone(),
            flag: self.headwater_flag_field.clone(),
        }
    }

    pub fn rescale(&self) -> Result<Rescale, ConfigError> {
        Rescale::from_keyword(&self.rescale, self.slice).map_err(|e| ConfigError::InvalidParameter(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidParameter(msg));

        if self.flow_min_dist >= self.flow_max_dist {
            return invalid(format!(
                "flow_min_dist ({}) must be below flow_max_dist ({})",
                self.flow_min_dist, self.flow_max_dist
            ));
        }
        if self.karst_min_dist >= self.karst_max_dist {
            return invalid(format!(
                "karst_min_dist ({}) must be below karst_max_dist ({})",
                self.karst_min_dist, self.karst_max_dist
            ));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return invalid(format!("discount ({}) must be within [0, 1]", self.discount));
        }
        if self.search_radius <= 0.0 || !self.search_radius.is_finite() {
            return invalid(format!("search_radius ({}) must be positive", self.search_radius));
        }
        if let Some(r) = self.idw_radius
            && r <= 0.0
        {
            return invalid(format!("idw_radius ({}) must be positive", r));
        }
        if self.num_sd <= 0.0 {
            return invalid(format!("num_sd ({}) must be positive", self.num_sd));
        }
        if self.precip_conversion <= 0.0 {
            return invalid(format!("precip_conversion ({}) must be positive", self.precip_conversion));
        }
        if self.slice == 0 {
            return invalid("slice must be at least 1".to_string());
        }
        if crate::model::curve_number::lookup(self.land_cover_code, 1).is_none() {
            return invalid(format!("land_cover_code {} has no curve numbers", self.land_cover_code));
        }
        self.rescale()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    output_directory: PathBuf,
    output_format: OutputFormat,
    bbox: Option<Bbox>,
    stages: Vec<Stage>,
    inputs: Inputs,
    parameters: Parameters,
}

// Deserializes a Config, checking parameter ranges, the inputs each selected
// stage needs, and that every named input file exists.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ConfigHelper {
            output_directory: PathBuf,
            #[serde(default)]
            output_format: OutputFormat,
            bbox: Option<BboxHelper>,
            stages: Option<Vec<Stage>>,
            inputs: Inputs,
            #[serde(default)]
            parameters: Parameters,
        }

        #[derive(Deserialize)]
        struct BboxHelper {
            xmin: f64,
            xmax: f64,
            ymin: f64,
            ymax: f64,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let bbox = if let Some(bbox_helper) = helper.bbox {
            Some(
                Bbox::new(bbox_helper.xmin, bbox_helper.xmax, bbox_helper.ymin, bbox_helper.ymax)
                    .map_err(|e| D::Error::custom(format!("Invalid bbox: {}", e)))?,
            )
        } else {
            None
        };

        helper.parameters.validate().map_err(D::Error::custom)?;

        let mut config = Config {
            output_directory: helper.output_directory,
            output_format: helper.output_format,
            bbox,
            stages: Vec::new(),
            inputs: helper.inputs,
            parameters: helper.parameters,
        };
        config
            .set_stages(helper.stages.unwrap_or_else(|| Stage::ALL.to_vec()))
            .map_err(D::Error::custom)?;

        for path in config.inputs.paths() {
            if !path.exists() {
                return Err(D::Error::custom(ConfigError::MissingFile(path.to_path_buf())));
            }
        }

        Ok(config)
    }
}

impl Config {
    pub fn new<P: AsRef<Path>>(output_directory: P, inputs: Inputs) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
            output_format: OutputFormat::default(),
            bbox: None,
            stages: Stage::ALL.to_vec(),
            inputs,
            parameters: Parameters::default(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Select the stages to run. They always run in workflow order.
    pub fn set_stages(&mut self, mut stages: Vec<Stage>) -> Result<(), ConfigError> {
        stages.sort();
        stages.dedup();
        for stage in &stages {
            self.inputs.check_required(*stage)?;
        }
        self.stages = stages;
        Ok(())
    }

    pub fn set_parameters(&mut self, parameters: Parameters) -> Result<(), ConfigError> {
        parameters.validate()?;
        self.parameters = parameters;
        Ok(())
    }

    pub fn set_output_directory<P: AsRef<Path>>(&mut self, dir: P) {
        self.output_directory = dir.as_ref().to_path_buf();
    }

    pub fn set_bbox(&mut self, bbox: Option<Bbox>) {
        self.bbox = bbox;
    }

    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.output_format = format;
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn bbox(&self) -> Option<&Bbox> {
        self.bbox.as_ref()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let file_path = dir.join("config.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file_path
    }

    fn touch(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        File::create(&path).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let dem = touch(dir.path(), "elev_cm.asc");
        let flow = touch(dir.path(), "flow_length.asc");

        let config_data = format!(
            r#"
    {{
        "output_directory": "{}",
        "stages": ["flow", "soil_sensitivity", "flow"],
        "inputs": {{
            "elevation": "{}",
            "flow_length": "{}"
        }},
        "parameters": {{
            "z_factor": 0.01,
            "discount": 0.8
        }}
    }}
    "#,
            dir.path().join("out").display(),
            dem,
            flow
        );

        let config = Config::from_file(write_config(dir.path(), &config_data)).unwrap();

        assert_eq!(config.stages(), &[Stage::SoilSensitivity, Stage::Flow]);
        assert_eq!(config.parameters().z_factor, 0.01);
        assert_eq!(config.parameters().flow_params().discount, 0.8);
        assert_eq!(config.parameters().flow_params().max_dist, 500.0);
        assert_eq!(config.parameters().rescale().unwrap(), Rescale::Slice(10));
        assert_eq!(config.output_format(), OutputFormat::GeoTiff);
        assert!(config.bbox().is_none());
    }

    #[test]
    fn test_default_stages_need_inputs() {
        let dir = tempdir().unwrap();
        let dem = touch(dir.path(), "elev.asc");

        let config_data = format!(
            r#"{{ "output_directory": "out", "inputs": {{ "elevation": "{}" }} }}"#,
            dem
        );

        let err = Config::from_file(write_config(dir.path(), &config_data)).unwrap_err();
        assert!(err.to_string().contains("r_factor"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let dem = touch(dir.path(), "elev.asc");

        let config_data = format!(
            r#"{{
                "output_directory": "out",
                "stages": ["flow"],
                "inputs": {{ "elevation": "{}", "flow_length": "{}" }}
            }}"#,
            dem,
            dir.path().join("nope.asc").display()
        );

        let err = Config::from_file(write_config(dir.path(), &config_data)).unwrap_err();
        assert!(err.to_string().contains("input file not found"));
    }

    #[test]
    fn test_invalid_parameters() {
        let dir = tempdir().unwrap();
        let dem = touch(dir.path(), "elev.asc");

        for params in [
            r#"{ "flow_min_dist": 600 }"#,
            r#"{ "discount": 1.2 }"#,
            r#"{ "search_radius": 0 }"#,
            r#"{ "rescale": "LOG" }"#,
            r#"{ "slope_input": "RADIANS" }"#,
        ] {
            let config_data = format!(
                r#"{{ "output_directory": "out", "stages": [], "inputs": {{ "elevation": "{}" }}, "parameters": {} }}"#,
                dem, params
            );
            assert!(
                Config::from_file(write_config(dir.path(), &config_data)).is_err(),
                "{} should be rejected",
                params
            );
        }
    }

    #[test]
    fn test_soil_inputs_and_bbox() {
        let dir = tempdir().unwrap();
        let dem = touch(dir.path(), "elev.asc");
        let va = touch(dir.path(), "gSSURGO_VA.gpkg");
        let r = touch(dir.path(), "rfactor.asc");

        let config_data = format!(
            r#"{{
                "output_directory": "out",
                "stages": ["soil_loss"],
                "bbox": {{ "xmin": 0, "xmax": 100, "ymin": 0, "ymax": 50 }},
                "inputs": {{
                    "elevation": "{}",
                    "r_factor": "{}",
                    "k_factor": {{ "soils": ["{}"] }},
                    "hydro_group": {{ "raster": "{}/hydro_*.tif" }}
                }}
            }}"#,
            dem,
            r,
            va,
            dir.path().display()
        );

        let config = Config::from_file(write_config(dir.path(), &config_data)).unwrap();
        assert_eq!(config.bbox().unwrap().width(), 100.0);
        assert!(matches!(config.inputs().k_factor, Some(SoilInput::Soils(ref l)) if l.len() == 1));
        assert!(matches!(config.inputs().hydro_group, Some(SoilInput::Raster(_))));
    }

    #[test]
    fn test_set_stages_checks_inputs() {
        let mut config = Config::new("out", Inputs::new("elev.asc"));
        assert!(config.set_stages(vec![Stage::Position]).is_ok());
        assert!(matches!(
            config.set_stages(vec![Stage::Karst]),
            Err(ConfigError::MissingInput { stage: "karst", .. })
        ));
    }
}
