//! Planar kernel density of weighted points.

use ndarray::Array2;
use rayon::prelude::*;
use std::f64::consts::PI;

use crate::error::{ModelError, Result};
use crate::raster::Raster;
use crate::vector::SamplePoint;

const SQ_METERS_PER_HECTARE: f64 = 10_000.0;

/// Quartic kernel density, in units per hectare, on the grid of `template`.
///
/// Each point spreads its `value` ("population") over a disc of `radius`
/// map units:
///
/// ```text
/// density = sum(3 / (pi * r^2) * pop * (1 - (d / r)^2)^2)   for d < r
/// ```
///
/// Map units are assumed to be metres.
pub fn kernel_density(points: &[SamplePoint], template: &Raster, radius: f64) -> Result<Raster> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(ModelError::invalid("search_radius", radius, "must be positive"));
    }

    let (rows, cols) = template.shape();
    let r_sq = radius * radius;
    let norm = 3.0 / (PI * r_sq) * SQ_METERS_PER_HECTARE;

    let output: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let (_, y) = template.pixel_to_geo(0, row);
            // Points out of reach of this row entirely
            let near: Vec<&SamplePoint> = points.iter().filter(|p| (p.y - y).abs() < radius).collect();

            let mut row_data = vec![0.0; cols];
            if near.is_empty() {
                return row_data;
            }

            for (col, cell) in row_data.iter_mut().enumerate() {
                let (x, y) = template.pixel_to_geo(col, row);
                *cell = near
                    .iter()
                    .map(|p| {
                        let d_sq = p.dist_sq(x, y);
                        if d_sq < r_sq {
                            let t = 1.0 - d_sq / r_sq;
                            p.value * t * t
                        } else {
                            0.0
                        }
                    })
                    .sum::<f64>()
                    * norm;
            }

            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), output)
        .map_err(|e| ModelError::Algorithm(e.to_string()))?;
    template.with_data(array)
}
