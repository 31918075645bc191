use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use super::{RasterReader, ReadError};
use crate::raster::{GeoTransform, Raster};

/// Reader for ESRI ASCII grids (`.asc`)
pub struct AsciiGridReader {
    pub file_name: PathBuf,
}

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<f64>,
    yll: Option<f64>,
    centered: bool,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ReadError> {
    value
        .parse::<T>()
        .map_err(|_| ReadError::AsciiGrid(format!("invalid value '{}' for {}", value, key)))
}

impl RasterReader for AsciiGridReader {
    fn read_raster(&self) -> Result<Raster, ReadError> {
        let file = File::open(&self.file_name)
            .map_err(|e| ReadError::AsciiGrid(format!("Failed to open file: {}", e)))?;
        let reader = BufReader::new(file);

        let mut header = Header::default();
        let mut values: Vec<f64> = Vec::new();

        for line in reader.lines() {
            let line = line.map_err(|e| ReadError::AsciiGrid(e.to_string()))?;
            let mut tokens = line.split_whitespace().peekable();

            let Some(first) = tokens.peek() else {
                continue;
            };

            // Header lines start with a keyword, data lines with a number
            if first.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) && values.is_empty() {
                let key = first.to_ascii_lowercase();
                tokens.next();
                let value = tokens
                    .next()
                    .ok_or_else(|| ReadError::AsciiGrid(format!("missing value for {}", key)))?;

                match key.as_str() {
                    "ncols" => header.ncols = Some(parse_number(&key, value)?),
                    "nrows" => header.nrows = Some(parse_number(&key, value)?),
                    "xllcorner" => header.xll = Some(parse_number(&key, value)?),
                    "yllcorner" => header.yll = Some(parse_number(&key, value)?),
                    "xllcenter" => {
                        header.xll = Some(parse_number(&key, value)?);
                        header.centered = true;
                    }
                    "yllcenter" => {
                        header.yll = Some(parse_number(&key, value)?);
                        header.centered = true;
                    }
                    "cellsize" => header.cellsize = Some(parse_number(&key, value)?),
                    "nodata_value" => header.nodata = Some(parse_number(&key, value)?),
                    _ => {
                        return Err(ReadError::AsciiGrid(format!("unknown header key '{}'", key)));
                    }
                }
                continue;
            }

            for token in tokens {
                values.push(parse_number("cell", token)?);
            }
        }

        let missing = |name: &str| ReadError::AsciiGrid(format!("header is missing {}", name));
        let ncols = header.ncols.ok_or_else(|| missing("ncols"))?;
        let nrows = header.nrows.ok_or_else(|| missing("nrows"))?;
        let mut xll = header.xll.ok_or_else(|| missing("xllcorner"))?;
        let mut yll = header.yll.ok_or_else(|| missing("yllcorner"))?;
        let cellsize = header.cellsize.ok_or_else(|| missing("cellsize"))?;

        if header.centered {
            xll -= cellsize / 2.0;
            yll -= cellsize / 2.0;
        }

        if values.len() != ncols * nrows {
            return Err(ReadError::AsciiGrid(format!(
                "expected {} cells, found {}",
                ncols * nrows,
                values.len()
            )));
        }

        if let Some(nodata) = header.nodata {
            for v in values.iter_mut() {
                if *v == nodata {
                    *v = f64::NAN;
                }
            }
        }

        let mut raster = Raster::from_vec(values, nrows, ncols)
            .map_err(|e| ReadError::AsciiGrid(e.to_string()))?;
        raster.set_transform(GeoTransform::new(
            xll,
            yll + nrows as f64 * cellsize,
            cellsize,
            -cellsize,
        ));

        Ok(raster)
    }
}
