//! Consensus Loop
//!
//! Turns debate winners into candidate solutions and drives bounded voting
//! rounds over them:
//!
//! ```text
//! handlers ── Synthesizer ──► candidates
//!                                │
//!   round 1..=max: every agent votes (one task per voter, joined)
//!                                │
//!        agreement ≥ threshold ──┴── else refine with common concern
//! ```

pub mod attempt;
pub mod synthesizer;

pub use attempt::{ConsensusAttempt, ConsensusLoop};
pub use synthesizer::{Synthesizer, TemplateSynthesizer};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::debate::DebateRound;
use crate::registry::AgentId;
use crate::verifier::VerificationOutcome;

/// A handler's proposed solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSolution {
    /// Handler that synthesized the candidate
    pub producer: AgentId,
    pub text: String,
    /// Confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// How an invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Agreement reached the threshold
    ConsensusReached,
    /// The round budget ran out below the threshold
    RoundsExhausted,
    /// The caller cancelled or the deadline passed
    Cancelled,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConsensusReached => write!(f, "consensus_reached"),
            Self::RoundsExhausted => write!(f, "rounds_exhausted"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one engine invocation
///
/// `achieved` is always `agreement_percentage >= consensus_threshold`, and
/// `rounds_used` never exceeds the configured round budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub invocation_id: Uuid,
    pub achieved: bool,
    /// Largest vote share in the last tallied round (0.0 - 1.0)
    pub agreement_percentage: f64,
    pub rounds_used: u32,
    /// Winning candidate; its text is the verified, corrected text
    pub final_solution: Option<CandidateSolution>,
    /// Reasoning of voters outside the majority in the last tallied round
    pub dissenter_feedback: Vec<String>,
    pub verification_passed: bool,
    pub verification: Option<VerificationOutcome>,
    pub debate_rounds: Vec<DebateRound>,
    pub termination: Termination,
    /// Refinement passes applied across all consensus attempts
    pub refinement_passes: u32,
}

impl ConsensusResult {
    pub fn is_cancelled(&self) -> bool {
        self.termination == Termination::Cancelled
    }

    /// Text of the final solution, if any
    pub fn solution_text(&self) -> Option<&str> {
        self.final_solution.as_ref().map(|s| s.text.as_str())
    }
}
