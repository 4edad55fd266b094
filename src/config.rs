use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detector::DetectorKind;
use crate::error::{Error, Result};
use crate::scoring::{strategy_for, ScoringStrategy};

/// Decimal places used when presenting a score.
pub const DEFAULT_PRECISION: usize = 2;

/// Session settings, usually read from a JSON file.
///
/// Every field is optional in the file:
///
/// ```json
/// { "strategy": "bounding_box", "precision": 3 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Expected detector kind. When set, it must match the detector the
    /// session is built with, since each strategy only scores its own kind
    /// of observation.
    pub strategy: Option<DetectorKind>,

    /// Decimal places for presenting scores.
    pub precision: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strategy: None,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The strategy to score output of a `detector` kind detector with.
    ///
    /// Fails with [`Error::StrategyMismatch`] if the configured strategy
    /// cannot score what that detector produces.
    pub fn strategy_for(&self, detector: DetectorKind) -> Result<Box<dyn ScoringStrategy>> {
        let strategy = strategy_for(self.strategy.unwrap_or(detector));
        if strategy.accepts() != detector {
            return Err(Error::StrategyMismatch {
                strategy: strategy.name(),
                found: detector,
            });
        }
        Ok(strategy)
    }
}
