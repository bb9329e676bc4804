//! Event types published by the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consensus::Termination;
use crate::registry::AgentId;

/// All engine lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// An invocation passed validation and is about to debate
    InvocationStarted {
        invocation_id: Uuid,
        debaters: usize,
        seed: u64,
        timestamp: DateTime<Utc>,
    },

    /// One pairwise debate finished
    DebateCompleted {
        invocation_id: Uuid,
        round: u32,
        winner: AgentId,
        confidence: f64,
        tie_broken: bool,
        timestamp: DateTime<Utc>,
    },

    /// One consensus voting round was tallied
    ConsensusRoundCompleted {
        invocation_id: Uuid,
        /// 1 for the first consensus attempt, 2 for the post-verification pass
        attempt: u32,
        round: u32,
        agreement: f64,
        leader: AgentId,
        timestamp: DateTime<Utc>,
    },

    /// The verification pass finished
    VerificationCompleted {
        invocation_id: Uuid,
        passed: bool,
        corrections: usize,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// The invocation returned a result
    InvocationFinished {
        invocation_id: Uuid,
        achieved: bool,
        termination: Termination,
        rounds_used: u32,
        timestamp: DateTime<Utc>,
    },
}

impl DebateEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            DebateEvent::InvocationStarted { .. } => "invocation_started",
            DebateEvent::DebateCompleted { .. } => "debate_completed",
            DebateEvent::ConsensusRoundCompleted { .. } => "consensus_round_completed",
            DebateEvent::VerificationCompleted { .. } => "verification_completed",
            DebateEvent::InvocationFinished { .. } => "invocation_finished",
        }
    }

    /// Get the invocation this event belongs to
    pub fn invocation_id(&self) -> Uuid {
        match self {
            DebateEvent::InvocationStarted { invocation_id, .. }
            | DebateEvent::DebateCompleted { invocation_id, .. }
            | DebateEvent::ConsensusRoundCompleted { invocation_id, .. }
            | DebateEvent::VerificationCompleted { invocation_id, .. }
            | DebateEvent::InvocationFinished { invocation_id, .. } => *invocation_id,
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DebateEvent::InvocationStarted { timestamp, .. }
            | DebateEvent::DebateCompleted { timestamp, .. }
            | DebateEvent::ConsensusRoundCompleted { timestamp, .. }
            | DebateEvent::VerificationCompleted { timestamp, .. }
            | DebateEvent::InvocationFinished { timestamp, .. } => *timestamp,
        }
    }
}
