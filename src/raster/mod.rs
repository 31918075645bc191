mod geotransform;
mod grid;
pub mod ops;
pub mod resample;

pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use ops::{CellStat, cell_statistics, check_aligned, mask_with};
