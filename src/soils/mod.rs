//! gSSURGO soil map unit attributes: hydrologic soil group and K-factor.
//!
//! Map unit polygons are expected to carry the dominant-condition tables
//! produced by the Soil Data Development Toolbox, joined on `MUKEY`:
//! `HYDROLGRP_DCD` for the hydrologic group and `KFACTWS_DCD` for the
//! K-factor (0 to 10 cm, whole soil). Both arrive as text.

use tracing::{info, warn};

use crate::error::{ModelError, Result};
use crate::raster::{CellStat, Raster, cell_statistics};
use crate::vector::{AttributeValue, Feature, rasterize};

/// K-factor assumed for map units without one
pub const DEFAULT_K_FACTOR: f64 = 0.30;

/// Numeric hydrologic group: A = 1, B = 2, C = 3, D = 4.
///
/// Compound groups such as `A/D` take the last group; a missing group is
/// assumed to be D.
pub fn hydro_group_number(group: Option<&str>) -> Result<u8> {
    let Some(group) = group.map(str::trim).filter(|g| !g.is_empty()) else {
        return Ok(4);
    };

    match group.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('A') => Ok(1),
        Some('B') => Ok(2),
        Some('C') => Ok(3),
        Some('D') => Ok(4),
        _ => Err(ModelError::invalid("hydrologic group", group, "expected A, B, C or D")),
    }
}

pub fn k_factor_value(k_factor: Option<&str>) -> Result<f64> {
    let Some(k) = k_factor.map(str::trim).filter(|k| !k.is_empty()) else {
        return Ok(DEFAULT_K_FACTOR);
    };
    k.parse::<f64>()
        .map_err(|_| ModelError::invalid("K-factor", k, "not a number"))
}

/// Soil attribute to rasterize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoilAttribute {
    HydroGroup,
    KFactor,
}

impl SoilAttribute {
    /// Text field holding the dominant-condition value
    pub fn source_field(&self) -> &'static str {
        match self {
            SoilAttribute::HydroGroup => "HYDROLGRP_DCD",
            SoilAttribute::KFactor => "KFACTWS_DCD",
        }
    }

    /// Numeric field added for rasterization
    pub fn numeric_field(&self) -> &'static str {
        match self {
            SoilAttribute::HydroGroup => "HydroGrpNum",
            SoilAttribute::KFactor => "kFactor",
        }
    }

    fn convert(&self, value: Option<&AttributeValue>) -> Result<f64> {
        // Values may already be numeric when the table was exported differently
        let text = match value {
            None | Some(AttributeValue::Null) => None,
            Some(AttributeValue::Text(s)) => Some(s.clone()),
            Some(v) => v.as_f64().map(|n| n.to_string()),
        };
        match self {
            SoilAttribute::HydroGroup => {
                if let Some(AttributeValue::Int(n)) = value
                    && (1..=4).contains(n)
                {
                    return Ok(*n as f64);
                }
                hydro_group_number(text.as_deref()).map(f64::from)
            }
            SoilAttribute::KFactor => k_factor_value(text.as_deref()),
        }
    }
}

/// Map units from one soil survey area
pub struct SoilMapUnits {
    pub name: String,
    pub features: Vec<Feature>,
}

/// Add the numeric field for `attribute` to every map unit.
pub fn prepare_map_units(features: &mut [Feature], attribute: SoilAttribute) -> Result<()> {
    let source = attribute.source_field();
    for feature in features.iter_mut() {
        let value = attribute.convert(feature.get_property(source))?;
        feature.set_property(attribute.numeric_field(), AttributeValue::Float(value));
    }
    Ok(())
}

/// Rasterize one soil attribute from several survey areas and merge them
/// with the cell maximum.
///
/// A survey area that fails is logged and left out; it is an error only if
/// every one fails.
pub fn soil_attribute_raster(sources: &mut [SoilMapUnits], attribute: SoilAttribute, template: &Raster) -> Result<Raster> {
    let mut rasters = Vec::with_capacity(sources.len());

    for source in sources.iter_mut() {
        info!("Working on {}", source.name);
        let result = prepare_map_units(&mut source.features, attribute)
            .and_then(|_| rasterize(&source.features, Some(attribute.numeric_field()), template));
        match result {
            Ok(raster) => rasters.push(raster),
            Err(e) => warn!("Failed to rasterize {}: {}", source.name, e),
        }
    }

    if rasters.is_empty() {
        return Err(ModelError::Algorithm(format!(
            "no soils source could be rasterized for {}",
            attribute.numeric_field()
        )));
    }

    info!("Finalizing {} raster...", attribute.numeric_field());
    let refs: Vec<&Raster> = rasters.iter().collect();
    cell_statistics(&refs, CellStat::Maximum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use geo::{Geometry, polygon};

    fn unit(x0: f64, x1: f64, field: &str, value: AttributeValue) -> Feature {
        Feature::new(Geometry::Polygon(polygon![
            (x: x0, y: 0.0),
            (x: x1, y: 0.0),
            (x: x1, y: 10.0),
            (x: x0, y: 10.0),
            (x: x0, y: 0.0),
        ]))
        .with_property(field, value)
    }

    #[test]
    fn test_hydro_group_number() {
        assert_eq!(hydro_group_number(Some("A")).unwrap(), 1);
        assert_eq!(hydro_group_number(Some("B")).unwrap(), 2);
        assert_eq!(hydro_group_number(Some("C/D")).unwrap(), 4);
        assert_eq!(hydro_group_number(Some("A/D")).unwrap(), 4);
        assert_eq!(hydro_group_number(Some("B/C")).unwrap(), 3);
        assert_eq!(hydro_group_number(None).unwrap(), 4);
        assert_eq!(hydro_group_number(Some("  ")).unwrap(), 4);
        assert!(hydro_group_number(Some("E")).is_err());
    }

    #[test]
    fn test_k_factor_value() {
        assert_eq!(k_factor_value(Some(".37")).unwrap(), 0.37);
        assert_eq!(k_factor_value(None).unwrap(), 0.30);
        assert_eq!(k_factor_value(Some("")).unwrap(), 0.30);
        assert!(k_factor_value(Some("high")).is_err());
    }

    #[test]
    fn test_soil_attribute_raster_merges_with_maximum() {
        let mut template = Raster::new(1, 3);
        template.set_transform(GeoTransform::new(0.0, 10.0, 10.0, -10.0));

        let field = SoilAttribute::HydroGroup.source_field();
        let mut sources = vec![
            SoilMapUnits {
                name: "gSSURGO_VA".into(),
                features: vec![
                    unit(0.0, 10.0, field, AttributeValue::Text("A".into())),
                    unit(10.0, 20.0, field, AttributeValue::Text("B".into())),
                ],
            },
            SoilMapUnits {
                name: "gSSURGO_WV".into(),
                features: vec![unit(10.0, 20.0, field, AttributeValue::Null)],
            },
            // Bad group letter: skipped
            SoilMapUnits {
                name: "gSSURGO_XX".into(),
                features: vec![unit(20.0, 30.0, field, AttributeValue::Text("Z".into()))],
            },
        ];

        let out = soil_attribute_raster(&mut sources, SoilAttribute::HydroGroup, &template).unwrap();

        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        // B from VA, null (D) from WV
        assert_eq!(out.get(0, 1).unwrap(), 4.0);
        assert!(out.get(0, 2).unwrap().is_nan());
    }

    #[test]
    fn test_all_sources_failing_is_error() {
        let template = Raster::new(1, 1);
        let mut sources = vec![SoilMapUnits {
            name: "bad".into(),
            features: vec![unit(0.0, 1.0, "KFACTWS_DCD", AttributeValue::Text("n/a".into()))],
        }];
        assert!(soil_attribute_raster(&mut sources, SoilAttribute::KFactor, &template).is_err());
    }
}
