//! Event-based runoff depth (SCS curve number method).

use tracing::info;

use crate::error::{ModelError, Result};
use crate::raster::{Raster, ops};

/// What the first input raster holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunoffInput {
    CurveNumber,
    /// Maximum retention S, inches
    Retention,
}

#[derive(Debug, Clone, Copy)]
pub enum Rainfall<'a> {
    Constant(f64),
    Raster(&'a Raster),
}

#[derive(Debug, Clone, Copy)]
pub struct RunoffParams {
    /// Multiplier converting rainfall depth to inches
    pub conv_fact: f64,
    /// Produce a runoff volume raster
    pub volume: bool,
    /// Cell area in cm²; defaults to the grid's own cell area
    pub cell_area_cm2: Option<f64>,
}

impl Default for RunoffParams {
    fn default() -> Self {
        Self {
            conv_fact: 1.0,
            volume: false,
            cell_area_cm2: None,
        }
    }
}

pub struct RunoffOutput {
    /// Only produced from curve numbers
    pub retention: Option<Raster>,
    /// Runoff depth, inches
    pub depth: Raster,
    /// Runoff volume, litres
    pub volume: Option<Raster>,
}

/// Maximum retention S = 1000 / CN - 10, with S = 1000 where CN is 0
pub fn retention(curve_numbers: &Raster) -> Raster {
    ops::map(curve_numbers, |cn| if cn == 0.0 { 1000.0 } else { 1000.0 / cn - 10.0 })
}

fn depth(rain: f64, s: f64) -> f64 {
    let excess = rain - 0.2 * s;
    if excess > 0.0 {
        excess * excess / (rain + 0.8 * s)
    } else {
        0.0
    }
}

pub fn event_runoff(input_raster: &Raster, input: RunoffInput, rain: Rainfall, params: RunoffParams) -> Result<RunoffOutput> {
    if !params.conv_fact.is_finite() || params.conv_fact <= 0.0 {
        return Err(ModelError::invalid("conv_fact", params.conv_fact, "must be positive"));
    }

    let (retention_raster, s) = match input {
        RunoffInput::CurveNumber => {
            info!("Calculating maximum retention...");
            let s = retention(input_raster);
            (Some(s.clone()), s)
        }
        RunoffInput::Retention => (None, input_raster.clone()),
    };

    info!("Calculating runoff depth (inches)...");
    let conv = params.conv_fact;
    let mut runoff = match rain {
        Rainfall::Constant(p) => {
            let p = p * conv;
            ops::map(&s, |s| depth(p, s))
        }
        Rainfall::Raster(r) => ops::zip_map(r, &s, |p, s| depth(p * conv, s))?,
    };

    // No runoff where the land cover has no curve number (water, wetlands)
    if input == RunoffInput::CurveNumber {
        runoff = ops::zip_map(&runoff, input_raster, |q, cn| if cn == 0.0 { 0.0 } else { q })?;
    }

    let volume = if params.volume {
        info!("Calculating runoff volume (liters)...");
        let area = params.cell_area_cm2.unwrap_or(runoff.cell_area() * 10_000.0);
        // 2.54 cm per inch, 0.001 litres per cm³
        let factor = 0.00254 * area;
        Some(ops::map(&runoff, |q| factor * q))
    } else {
        None
    };

    Ok(RunoffOutput {
        retention: retention_raster,
        depth: runoff,
        volume,
    })
}
