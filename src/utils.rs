use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::Result;
use crate::raster::Raster;
use crate::readers::{FileError, reader_from_filetype};

pub fn is_supported_file_type<P: AsRef<Path>>(path: P) -> bool {
    reader_from_filetype(path.as_ref()).is_ok()
}

/// Supported raster files below `dir`, searched recursively, in sorted order
pub fn discover_rasters<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported_file_type(e.path()))
        .map(|e| e.into_path())
        .collect();

    if files.is_empty() {
        return Err(FileError::NoMatches(dir.display().to_string()).into());
    }

    files.sort();
    debug!("Found {} rasters in {}", files.len(), dir.display());
    Ok(files)
}

/// Expand a glob pattern. Matching nothing is an error.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| FileError::NoMatches(format!("{} ({})", pattern, e)))?;

    let mut files: Vec<PathBuf> = paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect();
    if files.is_empty() {
        return Err(FileError::NoMatches(pattern.to_string()).into());
    }

    files.sort();
    Ok(files)
}

/// Raster files named by `source`: a single file, a directory, or a glob pattern
pub fn resolve_raster_files(source: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(source);
    if path.is_dir() {
        discover_rasters(path)
    } else if path.is_file() {
        Ok(vec![path.to_path_buf()])
    } else {
        expand_pattern(source)
    }
}

pub fn log_raster_summary(name: &str, raster: &Raster) {
    let stats = raster.statistics();
    let (rows, cols) = raster.shape();
    let total = stats.valid_count + stats.nodata_count;

    info!(
        "{}: {}x{} cells, valid {} / {} ({:.1}%)",
        name,
        cols,
        rows,
        stats.valid_count,
        total,
        if total == 0 {
            0.0
        } else {
            100.0 * stats.valid_count as f64 / total as f64
        }
    );

    if let (Some(min), Some(max), Some(mean), Some(sd)) = (stats.min, stats.max, stats.mean, stats.std_dev) {
        debug!("  Min: {:.4}, Max: {:.4}, Mean: {:.4}, SD: {:.4}", min, max, mean, sd);
    }
}
