//! Engine configuration
//!
//! Every constant of the protocol is overridable. Values come from
//! `Default`, then optionally a TOML document, then `CONSENSUS_*`
//! environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::registry::ManagementRoster;

/// Largest agent population (debate teams plus management) the engine builds
pub const MAX_AGENTS: u64 = 10_000;

/// Performance deltas applied by the statistics sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Bump for every debate winner
    pub debate_win_bump: f64,
    /// Bump for every agent when consensus was achieved
    pub consensus_bump: f64,
    /// Whether losers of unanimous debates receive a sanction
    pub sanction_unanimous_losers: bool,
    /// Performance lost per sanction
    pub sanction_penalty: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            debate_win_bump: 0.02,
            consensus_bump: 0.01,
            sanction_unanimous_losers: true,
            sanction_penalty: 0.01,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Agreement fraction a candidate needs to be accepted
    pub consensus_threshold: f64,
    /// Maximum voting rounds per consensus attempt
    pub max_consensus_rounds: u32,
    /// Number of debate teams
    pub team_count: u32,
    /// Agents per debate team
    pub agents_per_team: u32,
    /// Management team head counts
    pub management: ManagementRoster,
    /// Seed for reproducible runs (None = fresh entropy per invocation)
    pub seed: Option<u64>,
    /// Wall-clock budget per invocation in milliseconds (0 = unlimited)
    pub deadline_ms: u64,
    pub statistics: StatisticsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            consensus_threshold: 0.85,
            max_consensus_rounds: 5,
            team_count: 3,
            agents_per_team: 4,
            management: ManagementRoster::default(),
            seed: None,
            deadline_ms: 0,
            statistics: StatisticsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `CONSENSUS_*` environment variables onto this config.
    ///
    /// Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("CONSENSUS_THRESHOLD") {
            if let Ok(n) = val.parse() {
                self.consensus_threshold = n;
            }
        }
        if let Ok(val) = std::env::var("CONSENSUS_MAX_ROUNDS") {
            if let Ok(n) = val.parse() {
                self.max_consensus_rounds = n;
            }
        }
        if let Ok(val) = std::env::var("CONSENSUS_TEAM_COUNT") {
            if let Ok(n) = val.parse() {
                self.team_count = n;
            }
        }
        if let Ok(val) = std::env::var("CONSENSUS_AGENTS_PER_TEAM") {
            if let Ok(n) = val.parse() {
                self.agents_per_team = n;
            }
        }
        if let Ok(val) = std::env::var("CONSENSUS_SEED") {
            if let Ok(n) = val.parse() {
                self.seed = Some(n);
            }
        }
        if let Ok(val) = std::env::var("CONSENSUS_DEADLINE_MS") {
            if let Ok(n) = val.parse() {
                self.deadline_ms = n;
            }
        }
    }

    /// Per-invocation wall-clock budget, if any
    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_ms > 0).then(|| Duration::from_millis(self.deadline_ms))
    }

    /// Reject configurations the protocol cannot run with
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.consensus_threshold > 0.0 && self.consensus_threshold <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "consensus_threshold must be in (0, 1], got {}",
                self.consensus_threshold
            )));
        }
        if self.max_consensus_rounds == 0 {
            return Err(EngineError::InvalidConfig(
                "max_consensus_rounds must be at least 1".to_string(),
            ));
        }
        if self.team_count == 0 || self.agents_per_team == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "need at least one non-empty team, got {} x {}",
                self.team_count, self.agents_per_team
            )));
        }
        let population = u64::from(self.team_count) * u64::from(self.agents_per_team)
            + u64::from(self.management.total());
        if population > MAX_AGENTS {
            return Err(EngineError::InvalidConfig(format!(
                "population of {} agents exceeds the limit of {}",
                population, MAX_AGENTS
            )));
        }
        let stats = &self.statistics;
        for (name, value) in [
            ("debate_win_bump", stats.debate_win_bump),
            ("consensus_bump", stats.consensus_bump),
            ("sanction_penalty", stats.sanction_penalty),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidConfig(format!(
                    "statistics.{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
