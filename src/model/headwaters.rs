//! Headwaters indicator from NHDPlus-HR flowlines and catchments.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::raster::{Raster, mask_with};
use crate::vector::{AttributeValue, Feature, rasterize, select_intersecting};

/// Attribute names linking flowlines to catchments
#[derive(Debug, Clone)]
pub struct HeadwaterFields {
    pub id: String,
    pub flag: String,
}

impl Default for HeadwaterFields {
    fn default() -> Self {
        Self {
            id: "NHDPlusID".to_string(),
            flag: "StartFlag".to_string(),
        }
    }
}

/// Raster of 1 (headwater catchment) or 0 (not), on the grid of `mask` and
/// limited to its valid non-zero cells.
///
/// Only catchments intersecting `boundary` are used. A catchment takes the
/// flag of the flowline sharing its ID, or 0 without one.
pub fn headwaters_indicator(
    flowlines: &[Feature],
    catchments: &[Feature],
    boundary: &[Feature],
    mask: &Raster,
    fields: &HeadwaterFields,
) -> Result<Raster> {
    info!("Selecting catchments within area of interest...");
    let mut selected = select_intersecting(catchments, boundary);
    debug!("{} of {} catchments selected", selected.len(), catchments.len());

    info!("Joining headwaters indicator field to catchments...");
    let flags: HashMap<String, f64> = flowlines
        .iter()
        .filter_map(|f| {
            let id = f.get_property(&fields.id)?.join_key()?;
            let flag = f.get_property(&fields.flag)?.as_f64()?;
            Some((id, flag))
        })
        .collect();

    for catchment in selected.iter_mut() {
        let flag = catchment
            .get_property(&fields.id)
            .and_then(AttributeValue::join_key)
            .and_then(|id| flags.get(&id).copied())
            .unwrap_or(0.0);
        catchment.set_property(fields.flag.clone(), AttributeValue::Float(flag));
    }

    info!("Rasterizing...");
    let raster = rasterize(&selected, Some(&fields.flag), mask)?;
    mask_with(&raster, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use geo::{Geometry, LineString, polygon};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
            (x: x0, y: y0),
        ])
    }

    #[test]
    fn test_headwaters_join() {
        let mut mask = Raster::filled(2, 4, 1.0);
        mask.set_transform(GeoTransform::new(0.0, 20.0, 10.0, -10.0));

        let catchments = vec![
            Feature::new(square(0.0, 0.0, 20.0, 20.0)).with_property("NHDPlusID", AttributeValue::Float(10.0)),
            Feature::new(square(20.0, 0.0, 30.0, 20.0)).with_property("NHDPlusID", AttributeValue::Int(11)),
            Feature::new(square(30.0, 0.0, 40.0, 20.0)).with_property("NHDPlusID", AttributeValue::Int(12)),
            // Outside the boundary
            Feature::new(square(500.0, 500.0, 510.0, 510.0)).with_property("NHDPlusID", AttributeValue::Int(13)),
        ];
        let flowlines = vec![
            Feature::new(Geometry::LineString(LineString::from(vec![(5.0, 5.0), (15.0, 15.0)])))
                .with_property("NHDPlusID", AttributeValue::Int(10))
                .with_property("StartFlag", AttributeValue::Int(1)),
            Feature::new(Geometry::LineString(LineString::from(vec![(25.0, 5.0), (25.0, 15.0)])))
                .with_property("NHDPlusID", AttributeValue::Text("11".into()))
                .with_property("StartFlag", AttributeValue::Int(0)),
        ];
        let boundary = vec![Feature::new(square(0.0, 0.0, 40.0, 20.0))];

        let out = headwaters_indicator(&flowlines, &catchments, &boundary, &mask, &HeadwaterFields::default()).unwrap();

        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_eq!(out.get(1, 1).unwrap(), 1.0);
        assert_eq!(out.get(0, 2).unwrap(), 0.0);
        // No matching flowline
        assert_eq!(out.get(1, 3).unwrap(), 0.0);
    }
}
