pub mod bbox;
pub mod config;
pub mod error;
pub mod model;
pub mod raster;
pub mod readers;
pub mod soils;
pub mod utils;
pub mod vector;
pub mod workflow;
pub mod writers;

pub use config::{Config, Stage};
pub use error::{ModelError, Result};
pub use raster::Raster;
pub use workflow::{RunManifest, WorkflowRunner};
