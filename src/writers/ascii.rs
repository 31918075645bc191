use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::NODATA_VALUE;
use crate::error::{ModelError, Result};
use crate::raster::Raster;

/// Write an ESRI ASCII grid. Rotated transforms cannot be expressed.
pub fn write_ascii_grid(raster: &Raster, path: &Path) -> Result<()> {
    let gt = raster.transform();
    if gt.row_rotation != 0.0 || gt.col_rotation != 0.0 {
        return Err(ModelError::invalid(
            "transform",
            format!("{:?}", gt.to_gdal()),
            "ASCII grids cannot store rotation",
        ));
    }
    if (gt.pixel_width.abs() - gt.pixel_height.abs()).abs() > 1e-9 {
        return Err(ModelError::invalid(
            "transform",
            format!("{:?}", gt.to_gdal()),
            "ASCII grids need square cells",
        ));
    }

    let (rows, cols) = raster.shape();
    let (xmin, ymin, _, _) = raster.bounds();

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "ncols {}", cols)?;
    writeln!(writer, "nrows {}", rows)?;
    writeln!(writer, "xllcorner {}", xmin)?;
    writeln!(writer, "yllcorner {}", ymin)?;
    writeln!(writer, "cellsize {}", gt.cell_size())?;
    writeln!(writer, "NODATA_value {}", NODATA_VALUE)?;

    for row in raster.data().rows() {
        let line: Vec<String> = row
            .iter()
            .map(|&v| if v.is_nan() { NODATA_VALUE.to_string() } else { v.to_string() })
            .collect();
        writeln!(writer, "{}", line.join(" "))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use crate::readers::read_raster;
    use tempfile::tempdir;

    #[test]
    fn test_written_grid_reads_back() {
        let mut raster = Raster::from_vec(vec![1.5, f64::NAN, 3.0, 4.25], 2, 2).unwrap();
        raster.set_transform(GeoTransform::new(500.0, 900.0, 30.0, -30.0));

        let dir = tempdir().unwrap();
        let path = dir.path().join("score.asc");
        write_ascii_grid(&raster, &path).unwrap();

        let loaded = read_raster(&path).unwrap();
        assert_eq!(loaded.shape(), (2, 2));
        assert_eq!(loaded.get(0, 0).unwrap(), 1.5);
        assert!(loaded.get(0, 1).unwrap().is_nan());
        assert_eq!(loaded.get(1, 1).unwrap(), 4.25);
        assert!(loaded.transform().approx_eq(raster.transform(), 1e-9));
    }

    #[test]
    fn test_rotated_grid_rejected() {
        let mut raster = Raster::new(2, 2);
        let mut gt = GeoTransform::default();
        gt.row_rotation = 0.5;
        raster.set_transform(gt);

        let dir = tempdir().unwrap();
        assert!(write_ascii_grid(&raster, &dir.path().join("r.asc")).is_err());
    }
}
