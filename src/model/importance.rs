//! Importance Score from overlapping resource areas.

use tracing::info;

use crate::error::{ModelError, Result};
use crate::raster::{CellStat, Raster, cell_statistics, ops};
use crate::vector::{Feature, count_overlaps};

/// Polygons delimiting areas that affect a resource of interest, and the
/// weight of that resource type
pub struct ImportanceLayer<'a> {
    pub name: &'a str,
    pub features: &'a [Feature],
    pub weight: f64,
}

/// `100 * weighted overlap count / maximum`.
///
/// Cells outside every polygon are no-data. To score the whole study area,
/// add a layer covering it with a weight of 1.
pub fn importance_score(layers: &[ImportanceLayer], template: &Raster) -> Result<Raster> {
    if layers.is_empty() {
        return Err(ModelError::Algorithm("importance score needs at least one layer".into()));
    }

    let mut weighted = Vec::with_capacity(layers.len());
    for layer in layers {
        info!("Working on {}...", layer.name);
        let counts = count_overlaps(layer.features, template);
        let weight = layer.weight;
        weighted.push(if weight != 1.0 {
            ops::map(&counts, |c| c * weight)
        } else {
            counts
        });
    }

    info!("Calculating weighted sum of resources...");
    let refs: Vec<&Raster> = weighted.iter().collect();
    let sum = cell_statistics(&refs, CellStat::Sum)?;

    let max = sum.statistics().max.unwrap_or(0.0);
    if max <= 0.0 {
        return Err(ModelError::Algorithm(format!(
            "weighted resource sum has maximum {}, cannot rescale",
            max
        )));
    }

    info!("Rescaling to scores...");
    Ok(ops::map(&sum, |v| 100.0 * v / max))
}
