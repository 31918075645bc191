//! Soil Sensitivity Score: relative potential for impacts from soil loss and
//! runoff under worst-case land cover.

use tracing::info;

use super::rescale::{LinearTransform, trunc_vals};
use crate::error::Result;
use crate::raster::{Raster, mask_with, ops};

pub struct SoilSensitivity {
    pub soil_loss_score: Raster,
    pub runoff_score: Raster,
    pub sensitivity: Raster,
}

/// Rescale soil loss and runoff to 1..100 and average them.
///
/// With a mask, cells outside it are no-data in all three outputs and the
/// truncation values only consider cells inside.
pub fn soil_sensitivity_score(
    soil_loss: &Raster,
    runoff: &Raster,
    mask: Option<&Raster>,
    num_sd: f64,
) -> Result<SoilSensitivity> {
    info!("Calculating raster cutoff values...");
    let (sl_min, sl_max) = trunc_vals(soil_loss, mask, num_sd)?;
    let (ro_min, ro_max) = trunc_vals(runoff, mask, num_sd)?;

    info!("Rescaling soil loss potential...");
    let mut soil_loss_score = LinearTransform::score(sl_min, sl_max)?.rescale(soil_loss);

    info!("Rescaling runoff potential...");
    let mut runoff_score = LinearTransform::score(ro_min, ro_max)?.rescale(runoff);

    if let Some(mask) = mask {
        soil_loss_score = mask_with(&soil_loss_score, mask)?;
        runoff_score = mask_with(&runoff_score, mask)?;
    }

    info!("Calculating soil sensitivity score...");
    // Both inputs must be valid for an average
    let sensitivity = ops::zip_map(&soil_loss_score, &runoff_score, |a, b| (a + b) / 2.0)?;

    Ok(SoilSensitivity {
        soil_loss_score,
        runoff_score,
        sensitivity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_span_1_to_100() {
        let soil_loss = Raster::from_vec(vec![0.0, 5.0, 10.0, f64::NAN], 2, 2).unwrap();
        let runoff = Raster::from_vec(vec![2.0, 1.0, 0.0, 1.0], 2, 2).unwrap();

        let out = soil_sensitivity_score(&soil_loss, &runoff, None, 3.0).unwrap();

        assert_eq!(out.soil_loss_score.get(0, 0).unwrap(), 1.0);
        assert!((out.soil_loss_score.get(0, 1).unwrap() - 50.5).abs() < 1e-9);
        assert_eq!(out.soil_loss_score.get(1, 0).unwrap(), 100.0);

        assert_eq!(out.runoff_score.get(0, 0).unwrap(), 100.0);
        assert_eq!(out.runoff_score.get(1, 0).unwrap(), 1.0);

        assert!((out.sensitivity.get(0, 0).unwrap() - 50.5).abs() < 1e-9);
        assert!((out.sensitivity.get(1, 0).unwrap() - 50.5).abs() < 1e-9);
        assert!(out.sensitivity.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_mask_limits_processing_area() {
        let soil_loss = Raster::from_vec(vec![0.0, 10.0, 1000.0], 1, 3).unwrap();
        let runoff = Raster::from_vec(vec![0.0, 10.0, 1000.0], 1, 3).unwrap();
        let mask = Raster::from_vec(vec![1.0, 1.0, f64::NAN], 1, 3).unwrap();

        let out = soil_sensitivity_score(&soil_loss, &runoff, Some(&mask), 3.0).unwrap();

        // The outlier outside the mask does not stretch the cutoffs
        assert_eq!(out.sensitivity.get(0, 1).unwrap(), 100.0);
        assert!(out.sensitivity.get(0, 2).unwrap().is_nan());
        assert!(out.soil_loss_score.get(0, 2).unwrap().is_nan());
    }
}
