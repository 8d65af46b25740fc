use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_ALIVE_EFFICIENCY: f64 = 0.9;
pub const DEFAULT_COUPLED_EFFICIENCY: f64 = 0.5;
pub const DEFAULT_UNCOUPLED_EFFICIENCY: f64 = 0.3;

/// Efficiency cut values of the cross-talk classification, constant for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Self-injection efficiency below which a pixel is dead.
    pub alive_efficiency: f64,
    /// Coupled-injection efficiency a disconnected pixel stays below.
    pub coupled_efficiency: f64,
    /// Uncoupled-injection efficiency a disconnected pixel stays below.
    pub uncoupled_efficiency: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            alive_efficiency: DEFAULT_ALIVE_EFFICIENCY,
            coupled_efficiency: DEFAULT_COUPLED_EFFICIENCY,
            uncoupled_efficiency: DEFAULT_UNCOUPLED_EFFICIENCY,
        }
    }
}

impl Thresholds {
    pub fn new(alive_efficiency: f64, coupled_efficiency: f64, uncoupled_efficiency: f64) -> Self {
        Self {
            alive_efficiency,
            coupled_efficiency,
            uncoupled_efficiency,
        }
    }

    /// Every threshold must be finite and inside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("alive_efficiency", self.alive_efficiency),
            ("coupled_efficiency", self.coupled_efficiency),
            ("uncoupled_efficiency", self.uncoupled_efficiency),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::ThresholdOutOfRange { name, value });
            }
        }
        Ok(())
    }
}
