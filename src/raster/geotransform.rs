use serde::{Deserialize, Serialize};

/// Affine georeferencing of a grid, in GDAL coefficient order.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Usually negative for north-up grids
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// geotransform: [top_left_x, pixel_width, row_rot, top_left_y, col_rot, pixel_height]
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Map coordinates of the centre of a cell
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let col_f = col as f64 + 0.5;
        let row_f = row as f64 + 0.5;

        let x = self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation;
        let y = self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height;

        (x, y)
    }

    /// Fractional (col, row) of a map coordinate; floor it to get the cell index
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-12 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }

    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// (min_x, min_y, max_x, max_y) of a grid with the given size
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let x0 = self.origin_x;
        let y0 = self.origin_y;
        let x1 = self.origin_x + cols as f64 * self.pixel_width + rows as f64 * self.row_rotation;
        let y1 = self.origin_y + cols as f64 * self.col_rotation + rows as f64 * self.pixel_height;

        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Transform of a window starting at (col, row) of this grid
    pub fn offset(&self, col: usize, row: usize) -> Self {
        let col_f = col as f64;
        let row_f = row as f64;
        Self {
            origin_x: self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation,
            origin_y: self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height,
            ..*self
        }
    }

    pub fn approx_eq(&self, other: &GeoTransform, tolerance: f64) -> bool {
        self.to_gdal()
            .iter()
            .zip(other.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_geo_roundtrip() {
        let gt = GeoTransform::new(1000.0, 5000.0, 10.0, -10.0);
        let (x, y) = gt.pixel_to_geo(3, 7);
        assert_eq!((x, y), (1035.0, 4925.0));

        let (col, row) = gt.geo_to_pixel(x, y);
        assert_eq!(col.floor() as usize, 3);
        assert_eq!(row.floor() as usize, 7);
    }

    #[test]
    fn test_bounds_and_offset() {
        let gt = GeoTransform::new(0.0, 100.0, 10.0, -10.0);
        assert_eq!(gt.bounds(5, 4), (0.0, 60.0, 50.0, 100.0));

        let window = gt.offset(2, 1);
        assert_eq!(window.origin_x, 20.0);
        assert_eq!(window.origin_y, 90.0);
        assert_eq!(window.pixel_width, 10.0);
    }
}
