use std::fmt;

use crate::raster::Raster;

pub trait RasterReader {
    fn read_raster(&self) -> Result<Raster, ReadError>;
}

#[derive(Debug)]
pub enum ReadError {
    GeoTiff(String),
    AsciiGrid(String),
    Vector(String),
}

#[derive(Debug)]
pub enum FileError {
    UnknownFileType(String),
    NoMatches(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    GeoTiff,
    AsciiGrid,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::GeoTiff(e) => write!(f, "GeoTIFF: {}", e),
            ReadError::AsciiGrid(e) => write!(f, "ASCII grid: {}", e),
            ReadError::Vector(e) => write!(f, "vector layer: {}", e),
        }
    }
}

impl std::error::Error for ReadError {}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::UnknownFileType(path) => write!(f, "unsupported file type: {}", path),
            FileError::NoMatches(pattern) => write!(f, "no files match '{}'", pattern),
        }
    }
}

impl std::error::Error for FileError {}
