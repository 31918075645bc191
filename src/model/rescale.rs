//! Truncation values and linear rescaling to scores.

use crate::error::{ModelError, Result};
use crate::raster::{Raster, mask_with, ops};

pub const DEFAULT_NUM_SD: f64 = 3.0;

/// Lower and upper cutoffs for rescaling, `numSD` standard deviations either
/// side of the mean but never beyond the observed range.
///
/// With a mask only cells where the mask is valid and non-zero count.
pub fn trunc_vals(raster: &Raster, mask: Option<&Raster>, num_sd: f64) -> Result<(f64, f64)> {
    let masked;
    let target = match mask {
        Some(m) => {
            masked = mask_with(raster, m)?;
            &masked
        }
        None => raster,
    };

    let stats = target.statistics();
    let (Some(min), Some(max), Some(mean), Some(sd)) = (stats.min, stats.max, stats.mean, stats.std_dev) else {
        return Err(ModelError::Algorithm(
            "cannot compute truncation values of a raster without valid cells".into(),
        ));
    };

    let trunc_min = min.max(mean - num_sd * sd);
    let trunc_max = max.min(mean + num_sd * sd);

    Ok((trunc_min, trunc_max))
}

/// Piecewise-linear transform from values to scores.
///
/// Values at or below `lower` score `score_at_lower`, values at or above
/// `upper` score `score_at_upper`, and values in between are interpolated.
/// The scores may run either way, so distance-like inputs can map near
/// values to high scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTransform {
    pub lower: f64,
    pub upper: f64,
    pub score_at_lower: f64,
    pub score_at_upper: f64,
}

impl LinearTransform {
    pub fn new(lower: f64, upper: f64, score_at_lower: f64, score_at_upper: f64) -> Result<Self> {
        if !(lower < upper) {
            return Err(ModelError::invalid(
                "lower",
                lower,
                format!("must be below upper threshold {}", upper),
            ));
        }
        Ok(Self {
            lower,
            upper,
            score_at_lower,
            score_at_upper,
        })
    }

    /// Increasing 1 to 100 score between two cutoffs
    pub fn score(lower: f64, upper: f64) -> Result<Self> {
        Self::new(lower, upper, 1.0, 100.0)
    }

    /// Decreasing 100 to 1 score between two distances
    pub fn proximity(near: f64, far: f64) -> Result<Self> {
        Self::new(near, far, 100.0, 1.0)
    }

    pub fn apply(&self, value: f64) -> f64 {
        if value.is_nan() {
            return value;
        }
        if value <= self.lower {
            return self.score_at_lower;
        }
        if value >= self.upper {
            return self.score_at_upper;
        }
        let t = (value - self.lower) / (self.upper - self.lower);
        self.score_at_lower + t * (self.score_at_upper - self.score_at_lower)
    }

    pub fn rescale(&self, raster: &Raster) -> Raster {
        ops::map(raster, |v| self.apply(v))
    }
}
