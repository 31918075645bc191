use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow stages, in execution order
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    #[serde(rename = "soil_loss")]
    SoilLoss,
    #[serde(rename = "runoff")]
    Runoff,
    #[serde(rename = "soil_sensitivity")]
    SoilSensitivity,
    #[serde(rename = "flow")]
    Flow,
    #[serde(rename = "karst")]
    Karst,
    #[serde(rename = "position")]
    Position,
    #[serde(rename = "impact")]
    Impact,
    #[serde(rename = "priority")]
    Priority,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::SoilLoss,
        Stage::Runoff,
        Stage::SoilSensitivity,
        Stage::Flow,
        Stage::Karst,
        Stage::Position,
        Stage::Impact,
        Stage::Priority,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::SoilLoss => "soil_loss",
            Stage::Runoff => "runoff",
            Stage::SoilSensitivity => "soil_sensitivity",
            Stage::Flow => "flow",
            Stage::Karst => "karst",
            Stage::Position => "position",
            Stage::Impact => "impact",
            Stage::Priority => "priority",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug)]
pub struct StageParseError(String);

impl fmt::Display for StageParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid stage '{}'", self.0)
    }
}

impl std::error::Error for StageParseError {}

impl FromStr for Stage {
    type Err = StageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| StageParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stage() {
        assert_eq!("soil_loss".parse::<Stage>().unwrap(), Stage::SoilLoss);
        assert_eq!("KARST".parse::<Stage>().unwrap(), Stage::Karst);
        assert!("hydrology".parse::<Stage>().is_err());
    }

    #[test]
    fn test_stage_order() {
        let mut stages = vec![Stage::Priority, Stage::Flow, Stage::SoilLoss];
        stages.sort();
        assert_eq!(stages, vec![Stage::SoilLoss, Stage::Flow, Stage::Priority]);
    }

    #[test]
    fn test_deserialize_stage() {
        let stage: Stage = serde_json::from_str("\"soil_sensitivity\"").unwrap();
        assert_eq!(stage, Stage::SoilSensitivity);
    }
}
