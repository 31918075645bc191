//! Priority scores for conservation, restoration and stormwater management.

use tracing::info;

use super::rescale::LinearTransform;
use crate::error::{ModelError, Result};
use crate::raster::{Raster, mask_with, ops};

#[derive(Debug, Clone, Copy)]
pub enum Importance<'a> {
    /// Same importance everywhere; the Impact Score is used as is
    Constant,
    /// Importance Score, 0..100
    Raster(&'a Raster),
}

/// Rescaling applied to the general priority score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rescale {
    /// Equal-area quantile classes 1..=n
    Slice(usize),
    /// Linear from the minimum (1) to the maximum (100)
    Standard,
    None,
}

impl Rescale {
    pub fn from_keyword(keyword: &str, slices: usize) -> Result<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "SLICE" => Ok(Rescale::Slice(slices)),
            "STANDARD" => Ok(Rescale::Standard),
            "NONE" => Ok(Rescale::None),
            _ => Err(ModelError::invalid("rescale", keyword, "expected SLICE, STANDARD or NONE")),
        }
    }

    /// Suffix of the rescaled product name
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Rescale::Slice(_) => Some("slice"),
            Rescale::Standard => Some("rscl"),
            Rescale::None => None,
        }
    }
}

/// Land each priority applies to
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityMasks<'a> {
    pub conservation: Option<&'a Raster>,
    pub restoration: Option<&'a Raster>,
    pub management: Option<&'a Raster>,
}

pub struct PriorityScores {
    pub general: Raster,
    /// `None` when no rescaling was requested
    pub rescaled: Option<Raster>,
    pub conservation: Option<Raster>,
    pub restoration: Option<Raster>,
    pub management: Option<Raster>,
}

/// Slice valid cells into `n` classes holding roughly equal numbers of
/// cells. Tied values always share a class.
pub fn slice_equal_area(raster: &Raster, n: usize) -> Result<Raster> {
    if n == 0 {
        return Err(ModelError::invalid("slice", n, "must be at least 1"));
    }

    let mut sorted: Vec<f64> = raster.valid_values().collect();
    sorted.sort_by(f64::total_cmp);
    let count = sorted.len();

    Ok(ops::map(raster, |v| {
        let rank = sorted.partition_point(|&s| s < v);
        (rank * n / count) as f64 + 1.0
    }))
}

fn rescale_standard(raster: &Raster) -> Result<Raster> {
    let stats = raster.statistics();
    let (Some(min), Some(max)) = (stats.min, stats.max) else {
        return Err(ModelError::Algorithm("cannot rescale a raster without valid cells".into()));
    };
    Ok(LinearTransform::score(min, max)?.rescale(raster))
}

pub fn priority_scores(
    impact: &Raster,
    importance: Importance,
    masks: PriorityMasks,
    rescale: Rescale,
) -> Result<PriorityScores> {
    info!("Calculating General Priority Score...");
    let general = match importance {
        Importance::Constant => impact.clone(),
        Importance::Raster(imp) => ops::zip_map(imp, impact, |i, s| i / 100.0 * s)?,
    };

    let rescaled = match rescale {
        Rescale::Slice(n) => {
            info!("Slicing priority scores into {} quantiles...", n);
            Some(slice_equal_area(&general, n)?)
        }
        Rescale::Standard => {
            info!("Rescaling priority scores...");
            Some(rescale_standard(&general)?)
        }
        Rescale::None => None,
    };
    let score = rescaled.as_ref().unwrap_or(&general);

    let apply = |mask: Option<&Raster>, label: &str| -> Result<Option<Raster>> {
        mask.map(|m| {
            info!("Creating {} priority raster...", label);
            mask_with(score, m)
        })
        .transpose()
    };

    let conservation = apply(masks.conservation, "conservation")?;
    let restoration = apply(masks.restoration, "restoration")?;
    let management = apply(masks.management, "stormwater management")?;

    Ok(PriorityScores {
        general,
        rescaled,
        conservation,
        restoration,
        management,
    })
}
