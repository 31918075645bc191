//! Exact Euclidean distance transform.

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::Result;
use crate::raster::Raster;

/// Stand-in for infinity that keeps the parabola arithmetic finite
const FAR: f64 = 1e20;

/// Squared distance transform of a sampled function (Felzenszwalb & Huttenlocher)
fn edt_1d(f: &[f64]) -> Vec<f64> {
    let n = f.len();
    let mut d = vec![0.0; n];
    if n == 0 {
        return d;
    }

    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let qf = q as f64;
        let mut s;
        loop {
            let p = v[k] as f64;
            s = ((f[q] + qf * qf) - (f[v[k]] + p * p)) / (2.0 * qf - 2.0 * p);
            if s <= z[k] && k > 0 {
                k -= 1;
            } else {
                break;
            }
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        let qf = q as f64;
        while z[k + 1] < qf {
            k += 1;
        }
        let p = v[k] as f64;
        *out = (qf - p) * (qf - p) + f[v[k]];
    }
    d
}

/// Distance in map units from each cell centre to the nearest valid cell of
/// `sources`. Source cells are 0; with no source at all every cell is NaN.
pub fn euclidean_distance(sources: &Raster) -> Result<Raster> {
    let (rows, cols) = sources.shape();
    let data = sources.data();

    if !data.iter().any(|v| !v.is_nan()) {
        return Ok(sources.like(f64::NAN));
    }

    let by_row: Vec<Vec<f64>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let f: Vec<f64> = (0..cols)
                .map(|col| if data[(row, col)].is_nan() { FAR } else { 0.0 })
                .collect();
            edt_1d(&f)
        })
        .collect();

    let by_col: Vec<Vec<f64>> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let f: Vec<f64> = (0..rows).map(|row| by_row[row][col]).collect();
            edt_1d(&f)
        })
        .collect();

    let cell = sources.cell_size();
    let array = Array2::from_shape_fn((rows, cols), |(row, col)| by_col[col][row].sqrt() * cell);
    sources.with_data(array)
}
