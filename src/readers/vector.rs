use gdal::Dataset;
use gdal::vector::{FieldValue, LayerAccess};
use std::path::Path;
use tracing::debug;

use super::ReadError;
use crate::vector::{AttributeValue, Feature};

/// Read the first layer of an OGR data source into features.
///
/// Only the attributes named in `fields` are kept; a field missing from the
/// layer is an error so that a typo in the configuration does not silently
/// produce an empty raster.
pub fn read_features<P: AsRef<Path>>(path: P, fields: &[&str]) -> Result<Vec<Feature>, ReadError> {
    let path = path.as_ref();
    let dataset = Dataset::open(path)
        .map_err(|e| ReadError::Vector(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut layer = dataset
        .layer(0)
        .map_err(|e| ReadError::Vector(format!("Failed to open layer: {}", e)))?;

    let defn_names: Vec<String> = layer.defn().fields().map(|f| f.name()).collect();
    for field in fields {
        if !defn_names.iter().any(|n| n == field) {
            return Err(ReadError::Vector(format!(
                "field '{}' not found in {} (available: {:?})",
                field,
                path.display(),
                defn_names
            )));
        }
    }

    let mut features = Vec::new();
    for (index, ogr_feature) in layer.features().enumerate() {
        let Some(geometry) = ogr_feature.geometry() else {
            debug!("Skipping feature {} without geometry", index);
            continue;
        };

        let geometry = geometry
            .to_geo()
            .map_err(|e| ReadError::Vector(format!("feature {}: {}", index, e)))?;

        let mut feature = Feature::new(geometry);
        for field in fields {
            let value = ogr_feature
                .field_index(field)
                .and_then(|idx| ogr_feature.field(idx))
                .map_err(|e| ReadError::Vector(format!("feature {}: {}", index, e)))?;
            feature.set_property(*field, attribute_from_ogr(value));
        }
        features.push(feature);
    }

    debug!("Read {} features from {}", features.len(), path.display());
    Ok(features)
}

fn attribute_from_ogr(value: Option<FieldValue>) -> AttributeValue {
    match value {
        Some(FieldValue::IntegerValue(v)) => AttributeValue::Int(v as i64),
        Some(FieldValue::Integer64Value(v)) => AttributeValue::Int(v),
        Some(FieldValue::RealValue(v)) => AttributeValue::Float(v),
        Some(FieldValue::StringValue(s)) => AttributeValue::Text(s),
        Some(_) | None => AttributeValue::Null,
    }
}
