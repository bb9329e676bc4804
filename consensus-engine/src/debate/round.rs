//! Debate round records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::AgentId;
use crate::voting::Vote;

/// How a tied vote count was resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieBreak {
    /// Designated proposer that broke the tie, if the registry has one
    pub breaker: Option<AgentId>,
    /// Breaker's score for each argument (0.0 when there is no breaker)
    pub score_a: f64,
    pub score_b: f64,
    /// Human-readable rule that decided the winner
    pub rule: String,
}

/// Immutable record of one pairwise contest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRound {
    /// Round number (1-indexed)
    pub round: u32,
    pub debater_a: AgentId,
    pub debater_b: AgentId,
    pub topic: String,
    pub argument_a: String,
    pub argument_b: String,
    /// Always one of the two debaters
    pub winner: AgentId,
    /// One vote per agent outside the pair, ascending by voter id
    pub votes: Vec<Vote>,
    /// Winning votes / total votes (0.0 without voters)
    pub confidence: f64,
    /// Present iff the vote count was tied
    pub tie_break: Option<TieBreak>,
    pub created_at: DateTime<Utc>,
}

impl DebateRound {
    /// Votes for debater a and debater b
    pub fn vote_counts(&self) -> (usize, usize) {
        let a = self.votes.iter().filter(|v| v.choice == self.debater_a).count();
        let b = self.votes.iter().filter(|v| v.choice == self.debater_b).count();
        (a, b)
    }

    pub fn loser(&self) -> AgentId {
        if self.winner == self.debater_a {
            self.debater_b
        } else {
            self.debater_a
        }
    }

    pub fn winning_argument(&self) -> &str {
        if self.winner == self.debater_a {
            &self.argument_a
        } else {
            &self.argument_b
        }
    }

    /// Whether every voter chose the winner
    pub fn is_unanimous(&self) -> bool {
        !self.votes.is_empty() && self.votes.iter().all(|v| v.choice == self.winner)
    }

    pub fn involves(&self, agent: AgentId) -> bool {
        self.debater_a == agent || self.debater_b == agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(voter: AgentId, choice: AgentId) -> Vote {
        Vote {
            voter,
            choice,
            score: 0.7,
            reasoning: "Risks and failure modes are underexplored (voted x)".to_string(),
        }
    }

    fn round(votes: Vec<Vote>, winner: AgentId) -> DebateRound {
        DebateRound {
            round: 1,
            debater_a: 1,
            debater_b: 2,
            topic: "topic".to_string(),
            argument_a: "argument a".to_string(),
            argument_b: "argument b".to_string(),
            winner,
            votes,
            confidence: 1.0,
            tie_break: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_round_accessors() {
        let r = round(vec![vote(3, 2), vote(4, 2), vote(5, 1)], 2);
        assert_eq!(r.vote_counts(), (1, 2));
        assert_eq!(r.loser(), 1);
        assert_eq!(r.winning_argument(), "argument b");
        assert!(!r.is_unanimous());
        assert!(r.involves(1));
        assert!(!r.involves(3));
    }

    #[test]
    fn test_unanimous() {
        assert!(round(vec![vote(3, 1), vote(4, 1)], 1).is_unanimous());
        assert!(!round(vec![], 1).is_unanimous());
    }
}
