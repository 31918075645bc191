//! Scenario scores relative to best- and worst-case rasters.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::Result;
use crate::raster::{Raster, mask_with, ops};

/// Perspective from which a scenario is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PriorityType {
    Conservation,
    /// Restoration or stormwater management
    Restoration,
}

#[derive(Debug)]
pub struct PriorityTypeParseError(String);

impl fmt::Display for PriorityTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid priority type '{}', expected CONS or REST", self.0)
    }
}

impl std::error::Error for PriorityTypeParseError {}

impl FromStr for PriorityType {
    type Err = PriorityTypeParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CONS" | "CONSERVATION" => Ok(PriorityType::Conservation),
            "REST" | "RESTORATION" => Ok(PriorityType::Restoration),
            _ => Err(PriorityTypeParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for PriorityType {
    type Error = PriorityTypeParseError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Score 0..100 placing `case` between a best- and a worst-case scenario
/// of the same variable. Cells where both scenarios agree are no-data.
pub fn scenario_score(
    case: &Raster,
    worst: &Raster,
    best: &Raster,
    priority: PriorityType,
    mask: Option<&Raster>,
) -> Result<Raster> {
    let range = ops::zip_map(worst, best, |w, b| if w == b { f64::NAN } else { w - b })?;

    let score = match priority {
        PriorityType::Conservation => {
            info!("Calculating scenario score for conservation...");
            let gain = ops::zip_map(worst, case, |w, c| w - c)?;
            ops::zip_map(&gain, &range, |g, r| 100.0 * g / r)?
        }
        PriorityType::Restoration => {
            info!("Calculating scenario score for restoration or management...");
            let excess = ops::zip_map(case, best, |c, b| c - b)?;
            ops::zip_map(&excess, &range, |e, r| 100.0 * e / r)?
        }
    };

    let score = ops::map(&score, |s| s.clamp(0.0, 100.0));
    match mask {
        Some(m) => mask_with(&score, m),
        None => Ok(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_priority_type() {
        assert_eq!("CONS".parse::<PriorityType>().unwrap(), PriorityType::Conservation);
        assert_eq!("rest".parse::<PriorityType>().unwrap(), PriorityType::Restoration);
        assert!("MGMT".parse::<PriorityType>().is_err());
    }

    #[test]
    fn test_scenario_scores() {
        let case = Raster::from_vec(vec![2.0, 12.0, 5.0], 1, 3).unwrap();
        let worst = Raster::from_vec(vec![10.0, 10.0, 5.0], 1, 3).unwrap();
        let best = Raster::from_vec(vec![0.0, 0.0, 5.0], 1, 3).unwrap();

        let cons = scenario_score(&case, &worst, &best, PriorityType::Conservation, None).unwrap();
        assert_eq!(cons.get(0, 0).unwrap(), 80.0);
        assert_eq!(cons.get(0, 1).unwrap(), 0.0);
        assert!(cons.get(0, 2).unwrap().is_nan());

        let rest = scenario_score(&case, &worst, &best, PriorityType::Restoration, None).unwrap();
        assert_eq!(rest.get(0, 0).unwrap(), 20.0);
        assert_eq!(rest.get(0, 1).unwrap(), 100.0);
    }

    #[test]
    fn test_scenario_mask() {
        let case = Raster::filled(1, 2, 5.0);
        let worst = Raster::filled(1, 2, 10.0);
        let best = Raster::filled(1, 2, 0.0);
        let mask = Raster::from_vec(vec![1.0, 0.0], 1, 2).unwrap();

        let score = scenario_score(&case, &worst, &best, PriorityType::Conservation, Some(&mask)).unwrap();
        assert_eq!(score.get(0, 0).unwrap(), 50.0);
        assert!(score.get(0, 1).unwrap().is_nan());
    }
}
