//! Vote aggregation: candidate scoring and ballot casting
//!
//! [`VoteAggregator::score`] is the fairness core of the protocol: a pure
//! function of the voter, the candidate's owner and the candidate text. Both
//! the debate orchestrator and the consensus loop cast ballots through
//! [`VoteAggregator::cast`].

use serde::{Deserialize, Serialize};

use crate::registry::{Agent, AgentId, AgentRole};

const BASE_SCORE: f64 = 0.5;
const SAME_ROLE_BONUS: f64 = 0.2;
const OVERLAP_BONUS: f64 = 0.1;
const PERFORMANCE_WEIGHT: f64 = 0.2;
const LENGTH_BONUS: f64 = 0.05;
const KEYWORD_BONUS: f64 = 0.02;

/// Candidate texts at least this long earn the length bonus
pub const LENGTH_THRESHOLD: usize = 100;

/// Keywords a well-argued candidate is expected to use
const EXPECTED_KEYWORDS: &[&str] = &["because", "evidence", "risk", "solution", "analysis"];

/// Scores closer than this are treated as tied
const TIE_EPSILON: f64 = 1e-9;

/// One ballot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: AgentId,
    /// Agent whose argument or solution received the vote
    pub choice: AgentId,
    /// Score the voter gave the chosen candidate
    pub score: f64,
    pub reasoning: String,
}

impl Vote {
    /// The voter's concern, without the trailing ballot details
    pub fn concern(&self) -> &str {
        concern_of(&self.reasoning)
    }
}

/// Concern part of a reasoning string (everything before the ballot suffix)
pub fn concern_of(reasoning: &str) -> &str {
    reasoning
        .split_once(" (")
        .map(|(concern, _)| concern)
        .unwrap_or(reasoning)
}

/// A candidate offered to a voter: the owning agent and its text
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub owner: &'a Agent,
    pub text: &'a str,
}

/// Stateless scorer and ballot caster
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteAggregator;

impl VoteAggregator {
    /// Score `candidate_text` owned by `candidate_owner` from `voter`'s
    /// perspective. Always in [0, 1].
    pub fn score(voter: &Agent, candidate_owner: &Agent, candidate_text: &str) -> f64 {
        let mut score = BASE_SCORE;

        if voter.role == candidate_owner.role {
            score += SAME_ROLE_BONUS;
        }
        score += voter.specialization_overlap(candidate_owner) as f64 * OVERLAP_BONUS;
        score += candidate_owner.performance.clamp(0.0, 1.0) * PERFORMANCE_WEIGHT;

        if candidate_text.chars().count() >= LENGTH_THRESHOLD {
            score += LENGTH_BONUS;
        }
        let lower = candidate_text.to_lowercase();
        let keyword_hits = EXPECTED_KEYWORDS
            .iter()
            .filter(|kw| lower.contains(*kw))
            .count();
        score += keyword_hits as f64 * KEYWORD_BONUS;

        score.clamp(0.0, 1.0)
    }

    /// Cast `voter`'s ballot among `candidates` in the given round.
    ///
    /// The highest score wins. Tied candidates carry no preference, so ties
    /// are spread across them by `(voter id + round) mod tied count`.
    /// Returns the index of the chosen candidate with the ballot, or `None`
    /// when there are no candidates.
    pub fn cast(voter: &Agent, candidates: &[Candidate<'_>], round: u32) -> Option<(usize, Vote)> {
        let scores: Vec<f64> = candidates
            .iter()
            .map(|c| Self::score(voter, c.owner, c.text))
            .collect();

        let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<usize> = scores
            .iter()
            .enumerate()
            .filter(|(_, s)| (best - **s).abs() < TIE_EPSILON)
            .map(|(i, _)| i)
            .collect();
        if tied.is_empty() {
            return None;
        }

        let index = tied[(voter.id as usize + round as usize) % tied.len()];
        let chosen = candidates[index].owner;
        let reasoning = format!(
            "{} (voted {}, score {:.2}, {} tied)",
            role_concern(voter.role),
            chosen.label(),
            scores[index],
            tied.len()
        );

        Some((
            index,
            Vote {
                voter: voter.id,
                choice: chosen.id,
                score: scores[index],
                reasoning,
            },
        ))
    }
}

/// The concern an agent of this role raises about any candidate
pub fn role_concern(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Proposer => "Needs a clearer framing of the core proposal",
        AgentRole::Solver => "Implementation steps are not concrete enough",
        AgentRole::Adversary => "Risks and failure modes are underexplored",
        AgentRole::Handler => "Integration of opposing views is incomplete",
        AgentRole::Manager => "Ownership and coordination are unclear",
        AgentRole::Counsellor => "Emotional needs of the person are not addressed",
        AgentRole::Security => "Safety and compliance implications are missing",
        AgentRole::Boss => "Strategic priorities are not reflected",
        AgentRole::PuppetMaster => "Long-term consequences are not considered",
    }
}
