//! Sinkhole density and Karst Score.

use tracing::{info, warn};

use super::density::kernel_density;
use super::distance::euclidean_distance;
use super::rescale::{DEFAULT_NUM_SD, LinearTransform, trunc_vals};
use crate::error::{ModelError, Result};
use crate::raster::{CellStat, Raster, cell_statistics, mask_with, ops};
use crate::vector::{Feature, SamplePoint, centroids, rasterize};

pub const DEFAULT_SEARCH_RADIUS: f64 = 5000.0;

pub struct SinkScore {
    pub points: Vec<SamplePoint>,
    /// Sinkhole area per hectare
    pub density: Raster,
    pub score: Raster,
}

/// Score 1..100 from the kernel density of sinkhole centroids weighted by
/// `area_field`.
///
/// `proc_mask` fixes extent, cell size and processing area; the score is
/// clipped to `clip_mask`.
pub fn sink_score(
    sink_polys: &[Feature],
    area_field: &str,
    proc_mask: &Raster,
    clip_mask: &Raster,
    search_radius: f64,
) -> Result<SinkScore> {
    info!("Generating sinkhole centroids...");
    let points = centroids(sink_polys, area_field)?;

    info!("Calculating kernel density...");
    let density = mask_with(&kernel_density(&points, proc_mask, search_radius)?, proc_mask)?;

    info!("Calculating truncation values...");
    let positive = ops::map(&density, |v| if v > 0.0 { 1.0 } else { f64::NAN });
    let trunc_max = match trunc_vals(&density, Some(&positive), DEFAULT_NUM_SD) {
        Ok((_, max)) => max.trunc(),
        Err(_) => 0.0,
    };

    info!("Converting kernel density to scores...");
    let score = if trunc_max > 0.0 {
        info!("Truncation values set to 0, {}.", trunc_max);
        LinearTransform::new(0.0, trunc_max, 1.0, 100.0)?.rescale(&density)
    } else {
        warn!("Sinkhole density is too low to rescale; scoring all cells 1");
        ops::map(&density, |_| 1.0)
    };
    let score = mask_with(&score, clip_mask)?;

    Ok(SinkScore { points, density, score })
}

#[derive(Debug, Clone, Copy)]
pub struct KarstParams {
    /// Distance to karst at or below which the score is 100
    pub min_dist: f64,
    /// Distance to karst at or above which the score is 1
    pub max_dist: f64,
}

impl Default for KarstParams {
    fn default() -> Self {
        Self {
            min_dist: 100.0,
            max_dist: 5000.0,
        }
    }
}

pub struct KarstScore {
    pub karst_raster: Raster,
    pub distance: Raster,
    /// Only distinct from `score` when a sinkhole score was combined in
    pub distance_score: Raster,
    pub score: Raster,
}

/// Karst Score from karst polygons, optionally averaged with a sinkhole score
pub fn karst_score(
    karst_polys: &[Feature],
    proc_mask: &Raster,
    clip_mask: &Raster,
    sink_score: Option<&Raster>,
    params: &KarstParams,
) -> Result<KarstScore> {
    info!("Converting karst polygons to raster...");
    let karst_raster = rasterize(karst_polys, None, proc_mask)?;
    karst_score_from_raster(&karst_raster, proc_mask, clip_mask, sink_score, params)
}

/// Karst Score from an already rasterized karst layer (valid cells are karst)
pub fn karst_score_from_raster(
    karst_raster: &Raster,
    proc_mask: &Raster,
    clip_mask: &Raster,
    sink_score: Option<&Raster>,
    params: &KarstParams,
) -> Result<KarstScore> {
    if params.min_dist >= params.max_dist {
        return Err(ModelError::invalid(
            "karst min_dist",
            params.min_dist,
            format!("must be below max_dist {}", params.max_dist),
        ));
    }

    let karst_raster = mask_with(karst_raster, proc_mask)?;

    info!("Getting Euclidean distance to karst...");
    let distance = mask_with(&euclidean_distance(&karst_raster)?, proc_mask)?;

    info!("Converting distances to scores...");
    let distance_score = LinearTransform::proximity(params.min_dist, params.max_dist)?.rescale(&distance);
    let distance_score = mask_with(&distance_score, clip_mask)?;

    let score = match sink_score {
        Some(sink) => {
            info!("Calculating final Karst Score from distance and density scores...");
            cell_statistics(&[sink, &distance_score], CellStat::Mean)?
        }
        None => {
            info!("Karst score is based only on Euclidean distance");
            distance_score.clone()
        }
    };

    Ok(KarstScore {
        karst_raster,
        distance,
        distance_score,
        score,
    })
}
