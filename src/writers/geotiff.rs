use gdal::cpl::CslStringList;
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use std::path::Path;

use super::NODATA_VALUE;
use crate::error::Result;
use crate::raster::Raster;

/// Write a single-band Float64 GeoTIFF with DEFLATE compression.
///
/// The grid is built in GDAL's in-memory driver and then copied to disk, so
/// the creation options only apply to the final file.
pub fn write_geotiff(raster: &Raster, path: &Path) -> Result<()> {
    let (rows, cols) = raster.shape();

    let mem_driver = DriverManager::get_driver_by_name("MEM")?;
    let mut dataset = mem_driver.create_with_band_type::<f64, _>("", cols, rows, 1)?;

    dataset.set_geo_transform(&raster.transform().to_gdal())?;

    if let Some(wkt) = raster.crs() {
        let srs = SpatialRef::from_wkt(wkt)?;
        dataset.set_spatial_ref(&srs)?;
    }

    {
        let mut band = dataset.rasterband(1)?;
        band.set_no_data_value(Some(NODATA_VALUE))?;

        let data: Vec<f64> = raster
            .data()
            .iter()
            .map(|&v| if v.is_nan() { NODATA_VALUE } else { v })
            .collect();
        let mut buffer = Buffer::new((cols, rows), data);
        band.write((0, 0), (cols, rows), &mut buffer)?;
    }

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut options = CslStringList::new();
    options.set_name_value("COMPRESS", "DEFLATE")?;
    options.set_name_value("TILED", "YES")?;

    let _saved_dataset = dataset.create_copy(&driver, path, &options)?;

    Ok(())
}
