//! Slope and slope transformations (RUSLE S-factor and slope scores).

use ndarray::Array2;
use rayon::prelude::*;
use serde::Deserialize;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{ModelError, Result};
use crate::raster::{Raster, ops};

/// What the input raster holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SlopeInput {
    Degrees,
    Percent,
    Elevation,
}

/// Transformation applied to slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SlopeTransform {
    /// 0 at or below 1 degree, 100 above 30 degrees, linear in between
    TruncLin,
    /// 200 * sin(slope), truncated at 100 (reached at 30 degrees)
    TruncSin,
    /// RUSLE slope steepness factor S (handbook eq. 4-4 and 4-5)
    Rusle,
}

#[derive(Debug)]
pub struct SlopeParseError(String);

impl fmt::Display for SlopeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid slope keyword '{}'", self.0)
    }
}

impl std::error::Error for SlopeParseError {}

impl FromStr for SlopeInput {
    type Err = SlopeParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEG" | "DEGREES" => Ok(SlopeInput::Degrees),
            "PERC" | "PERCENT" => Ok(SlopeInput::Percent),
            "ELEV" | "ELEVATION" => Ok(SlopeInput::Elevation),
            _ => Err(SlopeParseError(s.to_string())),
        }
    }
}

impl FromStr for SlopeTransform {
    type Err = SlopeParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRUNCLIN" => Ok(SlopeTransform::TruncLin),
            "TRUNCSIN" => Ok(SlopeTransform::TruncSin),
            "RUSLE" => Ok(SlopeTransform::Rusle),
            _ => Err(SlopeParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for SlopeInput {
    type Error = SlopeParseError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for SlopeTransform {
    type Error = SlopeParseError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

pub struct SlopeOutput {
    pub transformed: Raster,
    /// Percent slope derived from elevation; `None` when the input was a slope
    pub percent_slope: Option<Raster>,
}

/// Percent rise from a DEM using Horn's 3x3 method.
///
/// `z_factor` converts elevation units to ground units (0.01 for a DEM in
/// centimetres over a metre grid). Edge cells and cells with a no-data
/// neighbour are NaN.
pub fn percent_slope(dem: &Raster, z_factor: f64) -> Result<Raster> {
    let (rows, cols) = dem.shape();
    let cell = dem.cell_size();
    if cell <= 0.0 {
        return Err(ModelError::invalid("cell_size", cell, "must be positive"));
    }
    let eight_cell_size = 8.0 * cell;
    let data = dem.data();

    let output: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            if row == 0 || row + 1 >= rows {
                return row_data;
            }

            for col in 1..cols.saturating_sub(1) {
                let a = data[(row - 1, col - 1)];
                let b = data[(row - 1, col)];
                let c = data[(row - 1, col + 1)];
                let d = data[(row, col - 1)];
                let e = data[(row, col)];
                let f = data[(row, col + 1)];
                let g = data[(row + 1, col - 1)];
                let h = data[(row + 1, col)];
                let i = data[(row + 1, col + 1)];

                if [a, b, c, d, e, f, g, h, i].iter().any(|v| v.is_nan()) {
                    continue;
                }

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) * z_factor / eight_cell_size;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) * z_factor / eight_cell_size;

                row_data[col] = 100.0 * (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();
            }

            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), output)
        .map_err(|e| ModelError::Algorithm(e.to_string()))?;
    dem.with_data(array)
}

fn percent_to_radians(percent: f64) -> f64 {
    (percent / 100.0).atan()
}

fn degrees_to_percent(degrees: f64) -> f64 {
    100.0 * (degrees * PI / 180.0).tan()
}

/// Transform a slope (or elevation) raster.
pub fn slope_transform(
    raster: &Raster,
    input: SlopeInput,
    transform: SlopeTransform,
    z_factor: f64,
) -> Result<SlopeOutput> {
    info!("Slope input: {:?}, transformation: {:?}", input, transform);

    let (slope, in_percent, percent_slope_out) = match input {
        SlopeInput::Elevation => {
            info!("Calculating slope from elevation...");
            let s = percent_slope(raster, z_factor)?;
            (s.clone(), true, Some(s))
        }
        SlopeInput::Percent => (raster.clone(), true, None),
        SlopeInput::Degrees => (raster.clone(), false, None),
    };

    let transformed = match transform {
        SlopeTransform::TruncLin => {
            let (min_slope, max_slope) = if in_percent {
                (degrees_to_percent(1.0), degrees_to_percent(30.0))
            } else {
                (1.0, 30.0)
            };
            ops::map(&slope, |s| {
                if s <= min_slope {
                    0.0
                } else if s > max_slope {
                    100.0
                } else {
                    100.0 * (s - min_slope) / (max_slope - min_slope)
                }
            })
        }
        SlopeTransform::TruncSin => ops::map(&slope, |s| {
            let theta = if in_percent {
                percent_to_radians(s)
            } else {
                s.to_radians()
            };
            (0.5 + 200.0 * theta.sin()).floor().min(100.0)
        }),
        SlopeTransform::Rusle => {
            // Inflection at 9 percent grade
            let inflect = if in_percent {
                9.0
            } else {
                percent_to_radians(9.0).to_degrees()
            };
            ops::map(&slope, |s| {
                let sin_theta = if in_percent {
                    percent_to_radians(s).sin()
                } else {
                    s.to_radians().sin()
                };
                if s < inflect {
                    10.8 * sin_theta + 0.03
                } else {
                    16.8 * sin_theta - 0.50
                }
            })
        }
    };

    Ok(SlopeOutput {
        transformed,
        percent_slope: percent_slope_out,
    })
}
