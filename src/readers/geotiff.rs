use gdal::Dataset;
use std::path::PathBuf;

use super::{ReadError, RasterReader};
use crate::raster::{GeoTransform, Raster};

pub struct GeoTiffReader {
    pub file_name: PathBuf,
}

impl RasterReader for GeoTiffReader {
    fn read_raster(&self) -> Result<Raster, ReadError> {
        let dataset = Dataset::open(&self.file_name)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to open file: {}", e)))?;

        let band = dataset
            .rasterband(1)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to get band 1: {}", e)))?;

        let (cols, rows) = dataset.raster_size();

        let buffer = band
            .read_as::<f64>((0, 0), (cols, rows), (cols, rows), None)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to read band: {}", e)))?;

        let scale = band.scale().unwrap_or(1.0);
        let offset = band.offset().unwrap_or(0.0);
        let missing_value = band.no_data_value();

        let values: Vec<f64> = buffer
            .data()
            .iter()
            .map(|&raw| {
                if raw.is_nan() || missing_value.is_some_and(|mv| raw == mv) {
                    f64::NAN
                } else {
                    raw * scale + offset
                }
            })
            .collect();

        let mut raster = Raster::from_vec(values, rows, cols)
            .map_err(|e| ReadError::GeoTiff(e.to_string()))?;

        if let Ok(gt) = dataset.geo_transform() {
            raster.set_transform(GeoTransform::from_gdal(gt));
        }

        if let Ok(srs) = dataset.spatial_ref()
            && let Ok(wkt) = srs.to_wkt()
        {
            raster.set_crs(Some(wkt));
        }

        Ok(raster)
    }
}
