use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{ModelError, Result};
use crate::raster::Raster;

/// Resample `source` onto the grid of `template` with bilinear interpolation.
///
/// Used to downscale coarse inputs (R-factor, precipitation) to the
/// processing resolution. Cells whose centre falls outside the source grid,
/// or whose four neighbours include no-data, are NaN.
pub fn bilinear(source: &Raster, template: &Raster) -> Result<Raster> {
    let (rows, cols) = template.shape();
    let (src_rows, src_cols) = source.shape();

    if src_rows == 0 || src_cols == 0 {
        return Err(ModelError::InvalidDimensions {
            rows: src_rows,
            cols: src_cols,
        });
    }

    let src = source.data();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, cell) in row_data.iter_mut().enumerate() {
                let (x, y) = template.pixel_to_geo(col, row);
                let (fc, fr) = source.geo_to_pixel(x, y);

                // Shift to cell-centre space
                let sc = fc - 0.5;
                let sr = fr - 0.5;

                if sc < -0.5 || sr < -0.5 || sc > src_cols as f64 - 0.5 || sr > src_rows as f64 - 0.5 {
                    continue;
                }

                let c0 = sc.floor().clamp(0.0, (src_cols - 1) as f64) as usize;
                let r0 = sr.floor().clamp(0.0, (src_rows - 1) as f64) as usize;
                let c1 = (c0 + 1).min(src_cols - 1);
                let r1 = (r0 + 1).min(src_rows - 1);

                let tx = (sc - c0 as f64).clamp(0.0, 1.0);
                let ty = (sr - r0 as f64).clamp(0.0, 1.0);

                let q00 = src[(r0, c0)];
                let q01 = src[(r0, c1)];
                let q10 = src[(r1, c0)];
                let q11 = src[(r1, c1)];

                if [q00, q01, q10, q11].iter().any(|v| v.is_nan()) {
                    continue;
                }

                let top = q00 * (1.0 - tx) + q01 * tx;
                let bottom = q10 * (1.0 - tx) + q11 * tx;
                *cell = top * (1.0 - ty) + bottom * ty;
            }

            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| ModelError::Algorithm(e.to_string()))?;

    template.with_data(array)
}
