//! Watershed Impact Model scoring steps.
//!
//! Each submodule is one step of the model. They take aligned rasters (and
//! features where the step starts from vector data) and return new rasters;
//! none of them touch the filesystem.

pub mod curve_number;
pub mod density;
pub mod distance;
pub mod flow;
pub mod headwaters;
pub mod importance;
pub mod interpolate;
pub mod karst;
pub mod position;
pub mod priority;
pub mod rescale;
pub mod runoff;
pub mod scenario;
pub mod slope;
pub mod soil_loss;
pub mod soil_sensitivity;

pub use curve_number::{BARE_SOIL, LandCover, curve_number};
pub use flow::{FlowParams, flow_score};
pub use headwaters::{HeadwaterFields, headwaters_indicator};
pub use importance::{ImportanceLayer, importance_score};
pub use karst::{KarstParams, KarstScore, SinkScore, karst_score, karst_score_from_raster, sink_score};
pub use position::{impact_score, position_score};
pub use priority::{Importance, PriorityMasks, PriorityScores, Rescale, priority_scores};
pub use rescale::{LinearTransform, trunc_vals};
pub use runoff::{Rainfall, RunoffInput, RunoffOutput, RunoffParams, event_runoff};
pub use scenario::{PriorityType, scenario_score};
pub use slope::{SlopeInput, SlopeOutput, SlopeTransform, slope_transform};
pub use soil_loss::{CFactor, soil_loss_rksc};
pub use soil_sensitivity::{SoilSensitivity, soil_sensitivity_score};
