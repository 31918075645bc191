//! Flow Distance Score from overland flow length to water.

use tracing::info;

use super::rescale::LinearTransform;
use crate::error::{ModelError, Result};
use crate::raster::{Raster, mask_with, ops};

#[derive(Debug, Clone, Copy)]
pub struct FlowParams {
    /// Flow distance at or below which the score is 100
    pub min_dist: f64,
    /// Flow distance at or above which the score is 1
    pub max_dist: f64,
    /// Multiplier for cells outside headwater catchments
    pub discount: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            min_dist: 50.0,
            max_dist: 500.0,
            discount: 0.9,
        }
    }
}

impl FlowParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(ModelError::invalid("discount", self.discount, "must be within [0, 1]"));
        }
        if self.min_dist >= self.max_dist {
            return Err(ModelError::invalid(
                "min_dist",
                self.min_dist,
                format!("must be below max_dist {}", self.max_dist),
            ));
        }
        Ok(())
    }
}

/// Convert flow lengths to scores, discounting non-headwater cells.
///
/// With a headwaters raster the output is limited to the cells it covers.
pub fn flow_score(flow_length: &Raster, headwaters: Option<&Raster>, params: &FlowParams) -> Result<Raster> {
    params.validate()?;

    info!("Rescaling flow lengths to scores...");
    let score = LinearTransform::proximity(params.min_dist, params.max_dist)?.rescale(flow_length);

    let Some(headwaters) = headwaters else {
        return Ok(score);
    };

    info!("Discounting non-headwater scores...");
    let discount = params.discount;
    let discounted = ops::zip_map(&score, headwaters, |s, h| if h == 0.0 { discount * s } else { s })?;

    // Headwaters are 0 or 1; only no-data cells fall outside
    let coverage = ops::map(headwaters, |_| 1.0);
    mask_with(&discounted, &coverage)
}
