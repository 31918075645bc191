use crate::config::stage::StageParseError;

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    Stage(StageParseError),
    Io(std::io::Error),
    Json(serde_json::Error),
    MissingInput { stage: &'static str, input: &'static str },
    MissingFile(PathBuf),
    InvalidParameter(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Stage(e) => write!(f, "{}", e),
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to parse JSON: {}", e),
            ConfigError::MissingInput { stage, input } => {
                write!(f, "stage '{}' requires input '{}'", stage, input)
            }
            ConfigError::MissingFile(path) => write!(f, "input file not found: {}", path.display()),
            ConfigError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> ConfigError {
        ConfigError::Io(err)
    }
}

impl From<StageParseError> for ConfigError {
    fn from(err: StageParseError) -> ConfigError {
        ConfigError::Stage(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> ConfigError {
        ConfigError::Json(err)
    }
}
