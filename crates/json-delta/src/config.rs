//! Tunable settings for identity-key detection and comparison.
//!
//! Everything derives `serde` with `#[serde(default)]`, so a partial
//! document (`{"detector": {"min_overlap_ratio": 0.3}}`) fills the rest
//! from the defaults.

use serde::{Deserialize, Serialize};

use json_delta_path::IdentityPath;

use crate::differ::IdentityKeyInfo;
use crate::error::{DeltaError, DeltaResult};

/// Share of an array's elements that must be objects before identity
/// detection is attempted.
pub const DEFAULT_MIN_OBJECT_RATIO: f64 = 0.8;

/// Share of the smaller side's distinct identity values that must also
/// appear on the other side.
pub const DEFAULT_MIN_OVERLAP_RATIO: f64 = 0.5;

/// Largest number of properties combined into one composite key.
pub const DEFAULT_MAX_COMPOSITE_ARITY: usize = 3;

/// Number of top-ranked candidate properties combined into composite keys.
/// Single keys are tried over every candidate.
pub const DEFAULT_MAX_COMPOSITE_CANDIDATES: usize = 16;

/// Property names tried first, in this order.
pub const DEFAULT_PREFERRED_KEYS: [&str; 5] = ["id", "key", "uuid", "name", "_id"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub min_object_ratio: f64,
    pub min_overlap_ratio: f64,
    /// 1 disables composite keys.
    pub max_composite_arity: usize,
    pub max_composite_candidates: usize,
    pub preferred_keys: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_object_ratio: DEFAULT_MIN_OBJECT_RATIO,
            min_overlap_ratio: DEFAULT_MIN_OVERLAP_RATIO,
            max_composite_arity: DEFAULT_MAX_COMPOSITE_ARITY,
            max_composite_candidates: DEFAULT_MAX_COMPOSITE_CANDIDATES,
            preferred_keys: DEFAULT_PREFERRED_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl DetectorConfig {
    /// Check that ratios are within `0.0..=1.0` and arity is 1 to 3.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> DeltaResult<()> {
        for (name, ratio) in [
            ("min_object_ratio", self.min_object_ratio),
            ("min_overlap_ratio", self.min_overlap_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(DeltaError::InvalidConfig(format!(
                    "{name} must be within 0.0..=1.0, got {ratio}"
                )));
            }
        }
        if !(1..=3).contains(&self.max_composite_arity) {
            return Err(DeltaError::InvalidConfig(format!(
                "max_composite_arity must be 1, 2 or 3, got {}",
                self.max_composite_arity
            )));
        }
        Ok(())
    }

    /// Rank of a property name: preferred keys first in their listed order,
    /// everything else after.
    pub(crate) fn preference_rank(&self, name: &str) -> usize {
        self.preferred_keys
            .iter()
            .position(|k| k == name)
            .unwrap_or(self.preferred_keys.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    pub detector: DetectorConfig,
    /// Prefix every emitted path starts from.
    pub root: IdentityPath,
    /// Keys discovered by an earlier comparison. A matching entry is tried
    /// before running detection for that array shape.
    pub known_keys: Vec<IdentityKeyInfo>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            root: IdentityPath::root(),
            known_keys: Vec::new(),
        }
    }
}
