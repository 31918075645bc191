//! Stage orchestration and the record of a run.

pub mod manifest;
pub mod runner;

pub use manifest::{ProductRecord, RunManifest};
pub use runner::WorkflowRunner;
