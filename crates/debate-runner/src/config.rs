//! Runner configuration
//!
//! Layers, lowest to highest precedence: built-in defaults, an optional TOML
//! file, `CONSENSUS_*` environment variables, command-line overrides.
//!
//! ```toml
//! [engine]
//! consensus_threshold = 0.9
//! max_consensus_rounds = 3
//! seed = 42
//!
//! [engine.management]
//! counsellors = 2
//!
//! [run]
//! complexity = 0.7
//! context = ["previous answer was too vague"]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use consensus_engine::EngineConfig;
use serde::Deserialize;

/// Per-run defaults that are not engine settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    /// Problem complexity (0.0 - 1.0)
    pub complexity: f64,
    /// Context lines prepended to any given on the command line
    pub context: Vec<String>,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            complexity: 0.5,
            context: Vec::new(),
        }
    }
}

/// Full runner configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub engine: EngineConfig,
    pub run: RunDefaults,
}

/// Command-line overrides, applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub seed: Option<u64>,
    pub threshold: Option<f64>,
    pub max_rounds: Option<u32>,
    pub deadline_ms: Option<u64>,
    pub complexity: Option<f64>,
}

impl RunnerConfig {
    /// Load the configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        let config: RunnerConfig =
            toml::from_str(&content).context("Failed to parse runner config TOML")?;
        Ok(config)
    }

    /// File (if any), then environment, then `overrides`; validated.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.engine.apply_env();
        config.apply_overrides(overrides);
        config
            .engine
            .validate()
            .context("Invalid engine configuration")?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(seed) = overrides.seed {
            self.engine.seed = Some(seed);
        }
        if let Some(threshold) = overrides.threshold {
            self.engine.consensus_threshold = threshold;
        }
        if let Some(max_rounds) = overrides.max_rounds {
            self.engine.max_consensus_rounds = max_rounds;
        }
        if let Some(deadline_ms) = overrides.deadline_ms {
            self.engine.deadline_ms = deadline_ms;
        }
        if let Some(complexity) = overrides.complexity {
            self.run.complexity = complexity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config: RunnerConfig = toml::from_str("").unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_overrides_win() {
        let mut config: RunnerConfig = toml::from_str(
            r#"
            [engine]
            consensus_threshold = 0.9
            seed = 1
            "#,
        )
        .unwrap();
        config.apply_overrides(&Overrides {
            seed: Some(7),
            max_rounds: Some(2),
            ..Overrides::default()
        });
        assert_eq!(config.engine.seed, Some(7));
        assert_eq!(config.engine.max_consensus_rounds, 2);
        assert_eq!(config.engine.consensus_threshold, 0.9);
    }
}
