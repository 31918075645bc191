use ndarray::{Array2, s};

use crate::bbox::Bbox;
use crate::error::{ModelError, Result};
use crate::raster::GeoTransform;

/// A georeferenced grid of `f64` cells.
///
/// No-data is held as NaN in memory; readers map the file's no-data value to
/// NaN and writers map it back to a sentinel.
#[derive(Debug, Clone)]
pub struct Raster {
    data: Array2<f64>,
    transform: GeoTransform,
    crs: Option<String>,
}

impl Raster {
    /// A raster of zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ModelError::InvalidDimensions { rows, cols });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| ModelError::Algorithm(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    pub fn from_array(data: Array2<f64>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    /// Same grid and georeferencing, every cell set to `fill_value`
    pub fn like(&self, fill_value: f64) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
        }
    }

    /// Same grid and georeferencing, new cell values
    pub fn with_data(&self, data: Array2<f64>) -> Result<Self> {
        if data.dim() != self.data.dim() {
            let (rows, cols) = data.dim();
            return Err(ModelError::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
        })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(ModelError::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(ModelError::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            }),
        }
    }

    pub fn is_valid_at(&self, row: usize, col: usize) -> bool {
        self.data.get((row, col)).is_some_and(|v| !v.is_nan())
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    pub fn into_array(self) -> Array2<f64> {
        self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// CRS as WKT, when known
    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn set_crs(&mut self, crs: Option<String>) {
        self.crs = crs;
    }

    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Area of one cell in squared map units
    pub fn cell_area(&self) -> f64 {
        (self.transform.pixel_width * self.transform.pixel_height).abs()
    }

    /// (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied().filter(|v| !v.is_nan())
    }

    /// Min, max, mean and population standard deviation of the valid cells
    pub fn statistics(&self) -> RasterStatistics {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for value in self.valid_values() {
            min = min.min(value);
            max = max.max(value);
            sum += value;
            count += 1;
        }

        if count == 0 {
            return RasterStatistics {
                min: None,
                max: None,
                mean: None,
                std_dev: None,
                valid_count: 0,
                nodata_count: self.len(),
            };
        }

        let mean = sum / count as f64;
        let variance = self
            .valid_values()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / count as f64;

        RasterStatistics {
            min: Some(min),
            max: Some(max),
            mean: Some(mean),
            std_dev: Some(variance.sqrt()),
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }

    /// Window of this raster covering a bounding box in map units
    pub fn crop(&self, bbox: &Bbox) -> Result<Raster> {
        let gt = &self.transform;

        let (col_a, row_a) = gt.geo_to_pixel(bbox.xmin, bbox.ymax);
        let (col_b, row_b) = gt.geo_to_pixel(bbox.xmax, bbox.ymin);

        let pixel_min_x = col_a.min(col_b).floor() as i64;
        let pixel_max_x = col_a.max(col_b).ceil() as i64;
        let pixel_min_y = row_a.min(row_b).floor() as i64;
        let pixel_max_y = row_a.max(row_b).ceil() as i64;

        // Clamp to the grid and handle boxes hanging off either side
        let start_x = pixel_min_x.max(0).min(self.cols() as i64) as usize;
        let end_x = pixel_max_x.max(0).min(self.cols() as i64) as usize;
        let start_y = pixel_min_y.max(0).min(self.rows() as i64) as usize;
        let end_y = pixel_max_y.max(0).min(self.rows() as i64) as usize;

        if end_x <= start_x || end_y <= start_y {
            return Err(ModelError::invalid(
                "bbox",
                format!("{:?}", bbox),
                "does not intersect the raster extent",
            ));
        }

        let window = self.data.slice(s![start_y..end_y, start_x..end_x]).to_owned();

        Ok(Raster {
            data: window,
            transform: gt.offset(start_x, start_y),
            crs: self.crs.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
