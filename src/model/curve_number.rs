//! SCS runoff curve numbers from land cover and hydrologic soil group.
//!
//! Values follow Table 1 of the OpenNSPECT Technical Guide, keyed by NLCD
//! code (with CCAP code 32 for unconsolidated shore).

use tracing::info;

use crate::error::{ModelError, Result};
use crate::raster::{Raster, ops};

/// NLCD code for bare land, the "worst case" land cover
pub const BARE_SOIL: u16 = 31;

/// (code, [A, B, C, D])
const CURVE_NUMBERS: [(u16, [u8; 4]); 16] = [
    (11, [0, 0, 0, 0]),
    (21, [49, 69, 79, 84]),
    (22, [61, 75, 83, 87]),
    (23, [77, 85, 90, 92]),
    (24, [89, 92, 94, 95]),
    (31, [77, 86, 91, 94]),
    (32, [0, 0, 0, 0]),
    (41, [30, 55, 70, 77]),
    (42, [30, 55, 70, 77]),
    (43, [30, 55, 70, 77]),
    (52, [30, 48, 65, 73]),
    (71, [30, 58, 71, 78]),
    (81, [39, 61, 74, 80]),
    (82, [67, 78, 85, 89]),
    (90, [0, 0, 0, 0]),
    (95, [0, 0, 0, 0]),
];

/// Curve number for a land cover code and hydrologic group (1 = A .. 4 = D).
///
/// Returns `None` for an unknown code or a group outside 1..=4.
pub fn lookup(code: u16, group: u8) -> Option<u8> {
    if !(1..=4).contains(&group) {
        return None;
    }
    CURVE_NUMBERS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, row)| row[usize::from(group - 1)])
}

#[derive(Debug, Clone, Copy)]
pub enum LandCover<'a> {
    /// A single land cover class applied everywhere
    Constant(u16),
    /// Classified NLCD raster
    Raster(&'a Raster),
}

fn as_group(value: f64) -> Option<u8> {
    let rounded = value.round();
    if (1.0..=4.0).contains(&rounded) && (value - rounded).abs() < 1e-9 {
        Some(rounded as u8)
    } else {
        None
    }
}

/// Curve number raster on the grid of `hydro_group`.
///
/// Cells whose group is not 1..=4 are no-data. With a land cover raster,
/// codes missing from the table get 0; an unknown constant code is an
/// error.
pub fn curve_number(land_cover: LandCover, hydro_group: &Raster) -> Result<Raster> {
    match land_cover {
        LandCover::Constant(code) => {
            if lookup(code, 1).is_none() {
                return Err(ModelError::invalid(
                    "land_cover_code",
                    code,
                    "not an NLCD class with a curve number",
                ));
            }
            info!("Assigning curve numbers for land cover class {}...", code);
            Ok(ops::map(hydro_group, |g| match as_group(g) {
                Some(group) => lookup(code, group).map_or(f64::NAN, f64::from),
                None => f64::NAN,
            }))
        }
        LandCover::Raster(lc) => {
            info!("Creating curve number raster from land cover...");
            ops::zip_map(lc, hydro_group, |code, g| {
                let Some(group) = as_group(g) else {
                    return f64::NAN;
                };
                if code < 0.0 || code > f64::from(u16::MAX) {
                    return 0.0;
                }
                lookup(code.round() as u16, group).map_or(0.0, f64::from)
            })
        }
    }
}
