//! Relative soil loss propensity from RUSLE factors.

use tracing::info;

use crate::error::Result;
use crate::raster::{Raster, ops};

/// C-factor for "worst case" bare land
pub const BARE_SOIL_C_FACTOR: f64 = 0.7;

/// Cover-management factor, either uniform or from a land-cover derived raster
#[derive(Debug, Clone, Copy)]
pub enum CFactor<'a> {
    Constant(f64),
    Raster(&'a Raster),
}

impl Default for CFactor<'_> {
    fn default() -> Self {
        CFactor::Constant(BARE_SOIL_C_FACTOR)
    }
}

/// Product R * K * S * C.
///
/// Slope length (L) and support practice (P) are left out; the result is a
/// relative measure only. All rasters must share one grid.
pub fn soil_loss_rksc(r: &Raster, k: &Raster, s: &Raster, c: CFactor) -> Result<Raster> {
    info!("Calculating propensity for soil loss...");

    let rk = ops::zip_map(r, k, |r, k| r * k)?;
    let rks = ops::zip_map(&rk, s, |rk, s| rk * s)?;

    match c {
        CFactor::Constant(value) => Ok(ops::map(&rks, |v| v * value)),
        CFactor::Raster(c) => ops::zip_map(&rks, c, |v, c| v * c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rksc_constant_c() {
        let r = Raster::from_vec(vec![100.0, 200.0, f64::NAN, 50.0], 2, 2).unwrap();
        let k = Raster::from_vec(vec![0.3, 0.2, 0.3, 0.4], 2, 2).unwrap();
        let s = Raster::from_vec(vec![1.0, 2.0, 1.0, 0.5], 2, 2).unwrap();

        let out = soil_loss_rksc(&r, &k, &s, CFactor::default()).unwrap();

        assert!((out.get(0, 0).unwrap() - 21.0).abs() < 1e-9);
        assert!((out.get(0, 1).unwrap() - 56.0).abs() < 1e-9);
        assert!(out.get(1, 0).unwrap().is_nan());
        assert!((out.get(1, 1).unwrap() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_rksc_raster_c() {
        let one = Raster::filled(1, 2, 1.0);
        let c = Raster::from_vec(vec![0.1, 0.5], 1, 2).unwrap();
        let out = soil_loss_rksc(&one, &one, &one, CFactor::Raster(&c)).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 0.1);
        assert_eq!(out.get(0, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_rksc_misaligned() {
        let a = Raster::filled(2, 2, 1.0);
        let b = Raster::filled(3, 2, 1.0);
        assert!(soil_loss_rksc(&a, &b, &a, CFactor::default()).is_err());
    }
}
