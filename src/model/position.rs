//! Landscape Position Score and Impact Score.

use tracing::info;

use crate::error::Result;
use crate::raster::{CellStat, Raster, cell_statistics};

/// Maximum of the Flow Distance Score and the Karst Score
pub fn position_score(flow_score: &Raster, karst_score: &Raster) -> Result<Raster> {
    info!("Calculating Landscape Position Score...");
    cell_statistics(&[flow_score, karst_score], CellStat::Maximum)
}

/// Mean of the Landscape Position Score and the Soil Sensitivity Score
pub fn impact_score(position_score: &Raster, soil_sensitivity: &Raster) -> Result<Raster> {
    info!("Calculating Impact Score...");
    cell_statistics(&[position_score, soil_sensitivity], CellStat::Mean)
}
