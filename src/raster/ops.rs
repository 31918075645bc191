//! Cell-wise raster algebra.
//!
//! Everything here works on aligned grids: same shape, same transform. The
//! model never reprojects; inputs are snapped to a common template first
//! (see [`crate::raster::resample`]).

use ndarray::{Array2, Zip};

use crate::error::{ModelError, Result};
use crate::raster::Raster;

const ALIGN_TOLERANCE: f64 = 1e-6;

/// Statistic used to combine several rasters cell by cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStat {
    Maximum,
    Minimum,
    Mean,
    Sum,
}

pub fn check_aligned(a: &Raster, b: &Raster) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(ModelError::NotAligned(format!(
            "shape {:?} vs {:?}",
            a.shape(),
            b.shape()
        )));
    }
    if !a.transform().approx_eq(b.transform(), ALIGN_TOLERANCE) {
        return Err(ModelError::NotAligned(format!(
            "transform {:?} vs {:?}",
            a.transform().to_gdal(),
            b.transform().to_gdal()
        )));
    }
    Ok(())
}

/// Apply `f` to every cell. NaN cells are passed through untouched.
pub fn map<F>(raster: &Raster, f: F) -> Raster
where
    F: Fn(f64) -> f64,
{
    let data = raster.data().mapv(|v| if v.is_nan() { v } else { f(v) });
    // Shapes match by construction
    let mut out = raster.like(f64::NAN);
    *out.data_mut() = data;
    out
}

/// Combine two aligned rasters. The result is NaN where either input is NaN.
pub fn zip_map<F>(a: &Raster, b: &Raster, f: F) -> Result<Raster>
where
    F: Fn(f64, f64) -> f64,
{
    check_aligned(a, b)?;

    let mut data = Array2::from_elem(a.shape(), f64::NAN);
    Zip::from(&mut data)
        .and(a.data())
        .and(b.data())
        .for_each(|out, &x, &y| {
            if !x.is_nan() && !y.is_nan() {
                *out = f(x, y);
            }
        });

    a.with_data(data)
}

/// Keep cells of `raster` where `mask` is valid and non-zero, NaN elsewhere
pub fn mask_with(raster: &Raster, mask: &Raster) -> Result<Raster> {
    check_aligned(raster, mask)?;

    let mut data = raster.data().clone();
    Zip::from(&mut data).and(mask.data()).for_each(|v, &m| {
        if m.is_nan() || m == 0.0 {
            *v = f64::NAN;
        }
    });

    raster.with_data(data)
}

/// Combine rasters cell by cell, ignoring NaN inputs.
///
/// A cell is NaN only when every input is NaN there.
pub fn cell_statistics(rasters: &[&Raster], stat: CellStat) -> Result<Raster> {
    let first = rasters
        .first()
        .ok_or_else(|| ModelError::Algorithm("cell statistics need at least one raster".into()))?;

    for other in &rasters[1..] {
        check_aligned(first, other)?;
    }

    let (rows, cols) = first.shape();
    let mut data = Array2::from_elem((rows, cols), f64::NAN);

    for ((row, col), out) in data.indexed_iter_mut() {
        let mut acc: Option<f64> = None;
        let mut count = 0usize;

        for raster in rasters {
            let v = raster.data()[(row, col)];
            if v.is_nan() {
                continue;
            }
            count += 1;
            acc = Some(match (acc, stat) {
                (None, _) => v,
                (Some(a), CellStat::Maximum) => a.max(v),
                (Some(a), CellStat::Minimum) => a.min(v),
                (Some(a), CellStat::Mean | CellStat::Sum) => a + v,
            });
        }

        if let Some(a) = acc {
            *out = match stat {
                CellStat::Mean => a / count as f64,
                _ => a,
            };
        }
    }

    first.with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    fn grid(values: &[f64]) -> Raster {
        Raster::from_vec(values.to_vec(), 2, 2).unwrap()
    }

    #[test]
    fn test_zip_map_propagates_nodata() {
        let a = grid(&[1.0, 2.0, f64::NAN, 4.0]);
        let b = grid(&[10.0, 20.0, 30.0, f64::NAN]);

        let out = zip_map(&a, &b, |x, y| x * y).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 10.0);
        assert_eq!(out.get(0, 1).unwrap(), 40.0);
        assert!(out.get(1, 0).unwrap().is_nan());
        assert!(out.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_misaligned_rasters_rejected() {
        let a = grid(&[1.0; 4]);
        let mut b = grid(&[1.0; 4]);
        b.set_transform(GeoTransform::new(5.0, 0.0, 1.0, -1.0));
        assert!(zip_map(&a, &b, |x, _| x).is_err());

        let c = Raster::new(3, 2);
        assert!(check_aligned(&a, &c).is_err());
    }

    #[test]
    fn test_mask_with_zero_and_nodata() {
        let r = grid(&[1.0, 2.0, 3.0, 4.0]);
        let mask = grid(&[1.0, 0.0, f64::NAN, 7.0]);

        let out = mask_with(&r, &mask).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        assert!(out.get(0, 1).unwrap().is_nan());
        assert!(out.get(1, 0).unwrap().is_nan());
        assert_eq!(out.get(1, 1).unwrap(), 4.0);
    }

    #[test]
    fn test_cell_statistics_ignore_nodata() {
        let a = grid(&[1.0, f64::NAN, 5.0, f64::NAN]);
        let b = grid(&[3.0, 8.0, 1.0, f64::NAN]);

        let max = cell_statistics(&[&a, &b], CellStat::Maximum).unwrap();
        assert_eq!(max.get(0, 0).unwrap(), 3.0);
        assert_eq!(max.get(0, 1).unwrap(), 8.0);
        assert_eq!(max.get(1, 0).unwrap(), 5.0);
        assert!(max.get(1, 1).unwrap().is_nan());

        let mean = cell_statistics(&[&a, &b], CellStat::Mean).unwrap();
        assert_eq!(mean.get(0, 0).unwrap(), 2.0);
        assert_eq!(mean.get(0, 1).unwrap(), 8.0);

        let sum = cell_statistics(&[&a, &b], CellStat::Sum).unwrap();
        assert_eq!(sum.get(1, 0).unwrap(), 6.0);
    }

    #[test]
    fn test_cell_statistics_empty_input() {
        assert!(cell_statistics(&[], CellStat::Mean).is_err());
    }
}
