//! Inverse distance weighting of point samples onto a grid.

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{ModelError, Result};
use crate::raster::Raster;
use crate::vector::SamplePoint;

pub const DEFAULT_POWER: f64 = 2.0;

/// Interpolate `points` onto the grid of `template`.
///
/// Only points within `max_radius` (when given) contribute; a cell with none
/// in reach is NaN. A point on a cell centre gives its value directly.
pub fn idw(points: &[SamplePoint], template: &Raster, power: f64, max_radius: Option<f64>) -> Result<Raster> {
    if points.is_empty() {
        return Err(ModelError::Algorithm("no sample points to interpolate".into()));
    }
    if !power.is_finite() || power <= 0.0 {
        return Err(ModelError::invalid("power", power, "must be positive"));
    }
    if let Some(r) = max_radius
        && (!r.is_finite() || r <= 0.0)
    {
        return Err(ModelError::invalid("max_radius", r, "must be positive"));
    }

    let (rows, cols) = template.shape();
    let radius_sq = max_radius.map(|r| r * r);
    let half_power = power / 2.0;

    let output: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, cell) in row_data.iter_mut().enumerate() {
                let (x, y) = template.pixel_to_geo(col, row);
                let mut weighted = 0.0;
                let mut weights = 0.0;

                for p in points {
                    let d_sq = p.dist_sq(x, y);
                    if d_sq < 1e-20 {
                        weighted = p.value;
                        weights = 1.0;
                        break;
                    }
                    if radius_sq.is_some_and(|r| d_sq > r) {
                        continue;
                    }
                    let w = 1.0 / d_sq.powf(half_power);
                    weighted += w * p.value;
                    weights += w;
                }

                if weights > 0.0 {
                    *cell = weighted / weights;
                }
            }

            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), output)
        .map_err(|e| ModelError::Algorithm(e.to_string()))?;
    template.with_data(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    fn template() -> Raster {
        let mut r = Raster::new(1, 5);
        r.set_transform(GeoTransform::new(0.0, 10.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_idw_exact_and_midpoint() {
        let points = vec![SamplePoint::new(5.0, 5.0, 2.0), SamplePoint::new(45.0, 5.0, 6.0)];
        let out = idw(&points, &template(), DEFAULT_POWER, None).unwrap();

        assert_eq!(out.get(0, 0).unwrap(), 2.0);
        assert_eq!(out.get(0, 4).unwrap(), 6.0);
        assert!((out.get(0, 2).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_idw_radius_leaves_gaps() {
        let points = vec![SamplePoint::new(5.0, 5.0, 2.0)];
        let out = idw(&points, &template(), DEFAULT_POWER, Some(15.0)).unwrap();

        assert_eq!(out.get(0, 1).unwrap(), 2.0);
        assert!(out.get(0, 2).unwrap().is_nan());
    }

    #[test]
    fn test_idw_errors() {
        assert!(idw(&[], &template(), 2.0, None).is_err());
        let points = vec![SamplePoint::new(5.0, 5.0, 2.0)];
        assert!(idw(&points, &template(), 0.0, None).is_err());
    }
}
