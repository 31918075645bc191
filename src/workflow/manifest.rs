use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::config::Stage;
use crate::error::{ModelError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub stage: Stage,
    pub path: PathBuf,
    pub valid_cells: usize,
}

/// Record of one workflow run, saved next to the products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    pub output_directory: PathBuf,
    pub stages: Vec<Stage>,
    pub products: Vec<ProductRecord>,
}

impl RunManifest {
    pub const FILE_NAME: &'static str = "manifest.json";

    pub fn new(output_directory: &Path) -> Self {
        Self {
            started: Utc::now(),
            finished: None,
            output_directory: output_directory.to_path_buf(),
            stages: Vec::new(),
            products: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, name: &str, path: &Path, valid_cells: usize) {
        // A product written twice keeps only its latest entry
        self.products.retain(|p| p.name != name);
        self.products.push(ProductRecord {
            name: name.to_string(),
            stage,
            path: path.to_path_buf(),
            valid_cells,
        });
    }

    pub fn product(&self, name: &str) -> Option<&ProductRecord> {
        self.products.iter().find(|p| p.name == name)
    }

    pub fn finish(&mut self) {
        self.finished = Some(Utc::now());
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = self.output_directory.join(Self::FILE_NAME);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| ModelError::Workflow(format!("failed to write manifest: {}", e)))?;
        Ok(path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader)
            .map_err(|e| ModelError::Workflow(format!("failed to read manifest: {}", e)))
    }
}
