pub mod ascii;
pub mod geotiff;

use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::raster::Raster;
use crate::readers::{FileType, reader_from_filetype};

/// Sentinel written to files for NaN cells
pub const NODATA_VALUE: f64 = -9999.0;

/// Write a raster, choosing the format from the file extension
pub fn write_raster<P: AsRef<Path>>(raster: &Raster, path: P) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing raster {}", path.display());

    match reader_from_filetype(path)? {
        FileType::GeoTiff => geotiff::write_geotiff(raster, path),
        FileType::AsciiGrid => ascii::write_ascii_grid(raster, path),
    }
}
