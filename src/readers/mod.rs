pub mod ascii;
pub mod geotiff;
pub mod types;
pub mod utils;
pub mod vector;

use std::path::Path;
use tracing::debug;

pub use ascii::AsciiGridReader;
pub use geotiff::GeoTiffReader;
pub use types::{FileError, FileType, RasterReader, ReadError};
pub use utils::reader_from_filetype;
pub use vector::read_features;

use crate::error::Result;
use crate::raster::Raster;

pub fn create_reader<P: AsRef<Path>>(file_name: P) -> std::result::Result<Box<dyn RasterReader>, FileError> {
    let file_name = file_name.as_ref().to_path_buf();
    match reader_from_filetype(&file_name) {
        Ok(FileType::GeoTiff) => Ok(Box::new(GeoTiffReader { file_name })),
        Ok(FileType::AsciiGrid) => Ok(Box::new(AsciiGridReader { file_name })),
        Err(e) => Err(e),
    }
}

pub fn read_raster<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let path = path.as_ref();
    debug!("Reading raster {}", path.display());
    let raster = create_reader(path)?.read_raster()?;
    Ok(raster)
}
