//! Engine configuration.
//!
//! ```yaml
//! background: [1.0, 1.0, 1.0]
//! keep_alpha_on_flatten: false
//! selection_threshold: 0.0
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocError, DocResult};

/// Tunables of projection and merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Color that seeds flatten targets and indexed merge targets.
    pub background: [f32; 3],
    /// Flatten into a transparent, alpha-bearing target and keep its alpha.
    pub keep_alpha_on_flatten: bool,
    /// Selection values at or below this count as unselected.
    pub selection_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            background: [1.0, 1.0, 1.0],
            keep_alpha_on_flatten: false,
            selection_threshold: 0.0,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from YAML.
    pub fn from_yaml_str(yaml: &str) -> DocResult<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()
    }

    /// Loads a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> DocResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub(crate) fn validate(self) -> DocResult<Self> {
        if self.background.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(DocError::Scene(format!(
                "background {:?} outside [0, 1]",
                self.background
            )));
        }
        if !(0.0..1.0).contains(&self.selection_threshold) {
            return Err(DocError::Scene(format!(
                "selection_threshold {} outside [0, 1)",
                self.selection_threshold
            )));
        }
        Ok(self)
    }
}
