//! Statistics sink: the only writer of agent state
//!
//! Applied once per completed invocation, after debates, consensus and
//! verification have all finished. Cancelled invocations leave the registry
//! untouched.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::StatisticsConfig;
use crate::consensus::ConsensusResult;
use crate::error::EngineResult;
use crate::registry::{AgentId, AgentRegistry};

/// Summary of what one application changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsUpdate {
    pub debate_wins: usize,
    pub consensus_votes: usize,
    pub sanctions: usize,
    pub consensus_bonus_applied: bool,
}

/// Writes invocation outcomes back into the registry
#[derive(Debug, Clone, Default)]
pub struct StatisticsSink {
    config: StatisticsConfig,
}

impl StatisticsSink {
    pub fn new(config: StatisticsConfig) -> Self {
        Self { config }
    }

    /// Record wins, votes and bonuses for `result`.
    ///
    /// `voters` is every agent that cast a consensus vote in the invocation;
    /// each is counted once regardless of how many rounds it voted in.
    pub fn apply(
        &self,
        registry: &mut AgentRegistry,
        result: &ConsensusResult,
        voters: &BTreeSet<AgentId>,
    ) -> EngineResult<StatisticsUpdate> {
        let mut update = StatisticsUpdate::default();
        if result.is_cancelled() {
            debug!(invocation_id = %result.invocation_id, "Statistics skipped for cancelled run");
            return Ok(update);
        }

        // all-or-nothing: reject unknown ids before the first write
        let referenced = result
            .debate_rounds
            .iter()
            .flat_map(|r| [r.debater_a, r.debater_b, r.winner])
            .chain(voters.iter().copied());
        for id in referenced {
            registry.get(id)?;
        }

        for round in &result.debate_rounds {
            registry.record_debate_win(round.winner)?;
            registry.adjust_performance(round.winner, self.config.debate_win_bump)?;
            update.debate_wins += 1;

            if self.config.sanction_unanimous_losers && round.is_unanimous() {
                registry.record_sanction(round.loser(), self.config.sanction_penalty)?;
                update.sanctions += 1;
            }
        }

        for &voter in voters {
            registry.record_consensus_vote(voter)?;
            update.consensus_votes += 1;
        }

        if result.achieved {
            for id in registry.ids() {
                registry.adjust_performance(id, self.config.consensus_bump)?;
            }
            update.consensus_bonus_applied = true;
        }

        info!(
            invocation_id = %result.invocation_id,
            debate_wins = update.debate_wins,
            consensus_votes = update.consensus_votes,
            sanctions = update.sanctions,
            consensus_bonus = update.consensus_bonus_applied,
            "Agent statistics updated"
        );
        Ok(update)
    }
}
