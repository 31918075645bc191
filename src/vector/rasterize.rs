use geo::{BoundingRect, Centroid, Contains, Coord, Geometry, Intersects, Polygon};
use tracing::debug;

use super::{Feature, SamplePoint};
use crate::error::{ModelError, Result};
use crate::raster::Raster;

fn polygon_parts(geometry: &Geometry<f64>) -> Vec<&Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0.iter().collect(),
        Geometry::GeometryCollection(gc) => gc.0.iter().flat_map(polygon_parts).collect(),
        _ => Vec::new(),
    }
}

/// Cells of `template` whose centre falls inside `polygon`
fn covered_cells(polygon: &Polygon<f64>, template: &Raster) -> Vec<(usize, usize)> {
    let Some(rect) = polygon.bounding_rect() else {
        return Vec::new();
    };

    let (rows, cols) = template.shape();
    let (ca, ra) = template.geo_to_pixel(rect.min().x, rect.max().y);
    let (cb, rb) = template.geo_to_pixel(rect.max().x, rect.min().y);

    let clamp = |v: f64, upper: usize| v.max(0.0).min(upper as f64) as usize;
    let col_start = clamp(ca.min(cb).floor(), cols);
    let col_end = clamp(ca.max(cb).ceil(), cols);
    let row_start = clamp(ra.min(rb).floor(), rows);
    let row_end = clamp(ra.max(rb).ceil(), rows);

    let mut cells = Vec::new();
    for row in row_start..row_end {
        for col in col_start..col_end {
            let (x, y) = template.pixel_to_geo(col, row);
            if polygon.contains(&Coord { x, y }) {
                cells.push((row, col));
            }
        }
    }
    cells
}

fn feature_value(feature: &Feature, field: &str, index: usize) -> Result<Option<f64>> {
    let value = feature
        .get_property(field)
        .ok_or_else(|| ModelError::MissingAttribute {
            field: field.to_string(),
            index,
        })?;
    Ok(value.as_f64())
}

/// Burn polygon attribute values into the grid of `template`.
///
/// A cell takes the value of the last polygon covering its centre. With
/// `field = None` every polygon burns 1. Features with a null value are
/// skipped; cells no polygon covers are NaN.
pub fn rasterize(features: &[Feature], field: Option<&str>, template: &Raster) -> Result<Raster> {
    let mut out = template.like(f64::NAN);
    let mut skipped = 0usize;

    for (index, feature) in features.iter().enumerate() {
        let value = match field {
            None => 1.0,
            Some(name) => match feature_value(feature, name, index)? {
                Some(v) => v,
                None => {
                    skipped += 1;
                    continue;
                }
            },
        };

        for polygon in polygon_parts(&feature.geometry) {
            for (row, col) in covered_cells(polygon, template) {
                out.data_mut()[(row, col)] = value;
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} features with null values", skipped);
    }

    Ok(out)
}

/// Number of features covering each cell centre. Uncovered cells are NaN.
pub fn count_overlaps(features: &[Feature], template: &Raster) -> Raster {
    let mut counts = template.like(0.0);

    for feature in features {
        let mut cells: Vec<(usize, usize)> = polygon_parts(&feature.geometry)
            .into_iter()
            .flat_map(|polygon| covered_cells(polygon, template))
            .collect();
        // Parts of one multipolygon count once
        cells.sort_unstable();
        cells.dedup();

        for (row, col) in cells {
            counts.data_mut()[(row, col)] += 1.0;
        }
    }

    counts.data_mut().mapv_inplace(|v| if v == 0.0 { f64::NAN } else { v });
    counts
}

/// Centroid of each feature, valued by `field`. Null values are skipped.
pub fn centroids(features: &[Feature], field: &str) -> Result<Vec<SamplePoint>> {
    let mut points = Vec::with_capacity(features.len());

    for (index, feature) in features.iter().enumerate() {
        let Some(value) = feature_value(feature, field, index)? else {
            debug!("Feature {} has no '{}' value, skipping", index, field);
            continue;
        };
        let Some(centroid) = feature.geometry.centroid() else {
            continue;
        };
        points.push(SamplePoint::new(centroid.x(), centroid.y(), value));
    }

    Ok(points)
}

/// Features that intersect at least one boundary feature
pub fn select_intersecting(features: &[Feature], boundary: &[Feature]) -> Vec<Feature> {
    features
        .iter()
        .filter(|f| boundary.iter().any(|b| f.geometry.intersects(&b.geometry)))
        .cloned()
        .collect()
}
