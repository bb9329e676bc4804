//! One bounded consensus attempt

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::synthesizer::Synthesizer;
use super::{CandidateSolution, Termination};
use crate::context::RunContext;
use crate::debate::DebateRound;
use crate::emotion::EmotionalContext;
use crate::error::{EngineError, EngineResult};
use crate::events::DebateEvent;
use crate::registry::{AgentId, AgentRegistry, AgentRole};
use crate::voting::{concern_of, Candidate, Vote, VoteAggregator};

/// Concerns are compared on this many leading characters
pub const CONCERN_PREFIX_LEN: usize = 40;

/// Minimum repetitions for a concern to count as common
const COMMON_CONCERN_MIN: usize = 2;

/// Confidence added to every candidate per refinement pass
const REFINEMENT_BUMP: f64 = 0.02;

/// Confidence of fresh candidates when there were no debates
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Outcome of one pass through the consensus loop
#[derive(Debug, Clone)]
pub struct ConsensusAttempt {
    pub achieved: bool,
    pub agreement_percentage: f64,
    pub rounds_used: u32,
    pub final_solution: Option<CandidateSolution>,
    pub dissenter_feedback: Vec<String>,
    pub termination: Termination,
    pub refinement_passes: u32,
    /// Every agent that cast at least one vote
    pub voters: BTreeSet<AgentId>,
}

/// Tally of one voting round
#[derive(Debug)]
struct Tally {
    counts: Vec<usize>,
    leader: usize,
    agreement: f64,
}

/// Drives synthesis, voting and refinement over a fixed agent snapshot
pub struct ConsensusLoop {
    registry: Arc<AgentRegistry>,
    synthesizer: Arc<dyn Synthesizer>,
    threshold: f64,
    max_rounds: u32,
}

impl ConsensusLoop {
    pub fn new(
        registry: Arc<AgentRegistry>,
        synthesizer: Arc<dyn Synthesizer>,
        threshold: f64,
        max_rounds: u32,
    ) -> Self {
        Self {
            registry,
            synthesizer,
            threshold,
            max_rounds,
        }
    }

    /// Run one consensus attempt.
    ///
    /// `findings` are verification findings from an earlier attempt; they are
    /// handed to the synthesizer after the winning arguments.
    pub async fn attempt_consensus(
        &self,
        debate_rounds: &[DebateRound],
        topic: &str,
        emotional_context: &EmotionalContext,
        findings: &[String],
        ctx: &RunContext,
    ) -> EngineResult<ConsensusAttempt> {
        let mut candidates = self
            .synthesize_candidates(debate_rounds, emotional_context, findings)
            .await?;
        info!(
            attempt = ctx.attempt,
            candidates = candidates.len(),
            topic = %topic,
            "Consensus attempt started"
        );

        let mut voters = BTreeSet::new();
        let mut last: Option<(Tally, Vec<Vote>)> = None;
        let mut rounds_used = 0;
        let mut refinement_passes = 0;
        let mut termination = Termination::RoundsExhausted;

        for round in 1..=self.max_rounds {
            if ctx.should_stop() {
                warn!(
                    attempt = ctx.attempt,
                    round,
                    deadline = ctx.deadline_elapsed(),
                    "Consensus cancelled at round boundary"
                );
                termination = Termination::Cancelled;
                break;
            }

            let votes = self.collect_votes(&candidates, round).await?;
            voters.extend(votes.iter().map(|v| v.voter));
            let tally = tally(&candidates, &votes);
            rounds_used = round;

            debug!(
                attempt = ctx.attempt,
                round,
                agreement = tally.agreement,
                counts = ?tally.counts,
                leader = candidates[tally.leader].producer,
                "Consensus round tallied"
            );
            ctx.publish(DebateEvent::ConsensusRoundCompleted {
                invocation_id: ctx.invocation_id,
                attempt: ctx.attempt,
                round,
                agreement: tally.agreement,
                leader: candidates[tally.leader].producer,
                timestamp: Utc::now(),
            });

            if tally.agreement >= self.threshold {
                termination = Termination::ConsensusReached;
                last = Some((tally, votes));
                break;
            }

            if round < self.max_rounds {
                let leader = candidates[tally.leader].producer;
                if let Some(concern) = common_concern(&votes, leader) {
                    refine(&mut candidates, &concern);
                    refinement_passes += 1;
                    debug!(round, concern = %concern, "Candidates refined");
                }
            }
            last = Some((tally, votes));
        }

        let (agreement_percentage, final_solution, dissenter_feedback) = match &last {
            Some((tally, votes)) => {
                let leader = candidates[tally.leader].producer;
                let feedback = votes
                    .iter()
                    .filter(|v| v.choice != leader)
                    .map(|v| v.reasoning.clone())
                    .collect();
                (
                    tally.agreement,
                    Some(candidates[tally.leader].clone()),
                    feedback,
                )
            }
            None => (0.0, None, Vec::new()),
        };

        let achieved = termination == Termination::ConsensusReached;
        info!(
            attempt = ctx.attempt,
            achieved,
            agreement = agreement_percentage,
            rounds_used,
            termination = %termination,
            "Consensus attempt finished"
        );

        Ok(ConsensusAttempt {
            achieved,
            agreement_percentage,
            rounds_used,
            final_solution,
            dissenter_feedback,
            termination,
            refinement_passes,
            voters,
        })
    }

    /// One candidate per handler, in ascending handler id order
    async fn synthesize_candidates(
        &self,
        debate_rounds: &[DebateRound],
        emotional_context: &EmotionalContext,
        findings: &[String],
    ) -> EngineResult<Vec<CandidateSolution>> {
        let handlers = self.registry.all_by_role(AgentRole::Handler);
        if handlers.is_empty() {
            return Err(EngineError::NoHandlerAvailable);
        }

        let mut inputs: Vec<String> = debate_rounds
            .iter()
            .map(|r| r.winning_argument().to_string())
            .collect();
        inputs.extend(findings.iter().cloned());

        let confidence = if debate_rounds.is_empty() {
            DEFAULT_CONFIDENCE
        } else {
            debate_rounds.iter().map(|r| r.confidence).sum::<f64>() / debate_rounds.len() as f64
        };

        let mut candidates = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let mut text = self
                .synthesizer
                .synthesize(handler, &inputs, emotional_context)
                .await;
            if text.trim().is_empty() {
                warn!(handler = handler.id, "Synthesizer returned empty text");
                text = format!("{} has no synthesis to offer.", handler.label());
            }
            candidates.push(CandidateSolution {
                producer: handler.id,
                text,
                confidence,
            });
        }
        Ok(candidates)
    }

    /// Every registry agent votes once; all ballots are joined before return.
    async fn collect_votes(
        &self,
        candidates: &[CandidateSolution],
        round: u32,
    ) -> EngineResult<Vec<Vote>> {
        let candidates: Arc<Vec<CandidateSolution>> = Arc::new(candidates.to_vec());
        let mut join_set: JoinSet<EngineResult<Option<Vote>>> = JoinSet::new();

        for voter_id in self.registry.ids() {
            let registry = self.registry.clone();
            let candidates = candidates.clone();
            join_set.spawn(async move {
                let voter = registry.get(voter_id)?;
                let owned = candidates
                    .iter()
                    .map(|c| {
                        registry.get(c.producer).map(|owner| Candidate {
                            owner,
                            text: &c.text,
                        })
                    })
                    .collect::<EngineResult<Vec<_>>>()?;
                Ok(VoteAggregator::cast(voter, &owned, round).map(|(_, vote)| vote))
            });
        }

        let mut votes = Vec::new();
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok(vote) => votes.extend(vote?),
                Err(e) => {
                    warn!(error = %e, "Voter task panicked");
                    return Err(EngineError::TaskFailed(e.to_string()));
                }
            }
        }
        votes.sort_by_key(|v| v.voter);
        Ok(votes)
    }
}

/// Count votes per candidate and pick the leader: most votes, then higher
/// confidence, then lower index.
fn tally(candidates: &[CandidateSolution], votes: &[Vote]) -> Tally {
    let counts: Vec<usize> = candidates
        .iter()
        .map(|c| votes.iter().filter(|v| v.choice == c.producer).count())
        .collect();

    let mut leader = 0;
    for i in 1..candidates.len() {
        let better = counts[i] > counts[leader]
            || (counts[i] == counts[leader]
                && candidates[i].confidence > candidates[leader].confidence);
        if better {
            leader = i;
        }
    }

    let agreement = if votes.is_empty() {
        0.0
    } else {
        counts[leader] as f64 / votes.len() as f64
    };
    Tally {
        counts,
        leader,
        agreement,
    }
}

/// Most repeated dissenter concern prefix, if any recurs often enough.
///
/// Ties go to the concern that appears first in voter order.
pub fn common_concern(votes: &[Vote], leader: AgentId) -> Option<String> {
    let mut seen: Vec<(String, usize)> = Vec::new();
    for vote in votes.iter().filter(|v| v.choice != leader) {
        let prefix: String = concern_of(&vote.reasoning)
            .chars()
            .take(CONCERN_PREFIX_LEN)
            .collect();
        match seen.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, count)) => *count += 1,
            None => seen.push((prefix, 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (prefix, count) in seen {
        if count >= COMMON_CONCERN_MIN && best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((prefix, count));
        }
    }
    best.map(|(prefix, _)| prefix)
}

/// Acknowledge `concern` in every candidate and bump its confidence
fn refine(candidates: &mut [CandidateSolution], concern: &str) {
    let note = format!(" Acknowledged concern: {}.", concern);
    for candidate in candidates {
        if !candidate.text.contains(&note) {
            candidate.text.push_str(&note);
        }
        candidate.confidence = (candidate.confidence + REFINEMENT_BUMP).min(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::synthesizer::TemplateSynthesizer;
    use crate::events::EventBus;
    use crate::registry::{Agent, ManagementRoster};
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    /// Every handler proposes the same text
    struct UniformSynthesizer;

    #[async_trait]
    impl Synthesizer for UniformSynthesizer {
        async fn synthesize(&self, _: &Agent, _: &[String], _: &EmotionalContext) -> String {
            "Ship the smaller change first and measure.".to_string()
        }
    }

    fn ctx() -> (RunContext, CancellationToken) {
        let token = CancellationToken::new();
        let ctx = RunContext::new(Uuid::new_v4(), token.clone(), None, Arc::new(EventBus::new()));
        (ctx, token)
    }

    fn consensus(synthesizer: Arc<dyn Synthesizer>) -> ConsensusLoop {
        let registry = AgentRegistry::initialize(3, 4, &ManagementRoster::default());
        ConsensusLoop::new(Arc::new(registry), synthesizer, 0.85, 5)
    }

    fn vote(voter: AgentId, choice: AgentId, concern: &str) -> Vote {
        Vote {
            voter,
            choice,
            score: 0.6,
            reasoning: format!("{} (voted x, score 0.60, 1 tied)", concern),
        }
    }

    #[tokio::test]
    async fn test_uniform_candidates_exhaust_rounds() {
        let (ctx, _) = ctx();
        let attempt = consensus(Arc::new(UniformSynthesizer))
            .attempt_consensus(&[], "topic", &EmotionalContext::neutral(), &[], &ctx)
            .await
            .unwrap();

        assert!(!attempt.achieved);
        assert_eq!(attempt.termination, Termination::RoundsExhausted);
        assert_eq!(attempt.rounds_used, 5);
        assert!((attempt.agreement_percentage - 7.0 / 21.0).abs() < 1e-9);
        assert_eq!(attempt.voters.len(), 21);
        assert_eq!(attempt.dissenter_feedback.len(), 14);
        assert_eq!(attempt.refinement_passes, 4);

        let solution = attempt.final_solution.unwrap();
        assert!(solution.text.contains("Acknowledged concern"));
        assert!((solution.confidence - (0.5 + 4.0 * REFINEMENT_BUMP)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_template_candidates_reach_consensus() {
        let (ctx, _) = ctx();
        let attempt = consensus(Arc::new(TemplateSynthesizer))
            .attempt_consensus(&[], "topic", &EmotionalContext::neutral(), &[], &ctx)
            .await
            .unwrap();

        assert!(attempt.achieved);
        assert_eq!(attempt.termination, Termination::ConsensusReached);
        assert_eq!(attempt.rounds_used, 1);
        assert_eq!(attempt.agreement_percentage, 1.0);
        assert!(attempt.dissenter_feedback.is_empty());
        // team 1 handler
        assert_eq!(attempt.final_solution.unwrap().producer, 4);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_round() {
        let (ctx, token) = ctx();
        token.cancel();
        let attempt = consensus(Arc::new(UniformSynthesizer))
            .attempt_consensus(&[], "topic", &EmotionalContext::neutral(), &[], &ctx)
            .await
            .unwrap();

        assert_eq!(attempt.termination, Termination::Cancelled);
        assert_eq!(attempt.rounds_used, 0);
        assert!(!attempt.achieved);
        assert!(attempt.final_solution.is_none());
        assert!(attempt.voters.is_empty());
    }

    #[tokio::test]
    async fn test_no_handlers() {
        let registry = AgentRegistry::from_agents(vec![
            Agent::new(1, AgentRole::Proposer, 1),
            Agent::new(2, AgentRole::Solver, 1),
        ])
        .unwrap();
        let (ctx, _) = ctx();
        let err = ConsensusLoop::new(Arc::new(registry), Arc::new(UniformSynthesizer), 0.85, 5)
            .attempt_consensus(&[], "topic", &EmotionalContext::neutral(), &[], &ctx)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::NoHandlerAvailable);
    }

    #[test]
    fn test_common_concern_needs_repeats() {
        let votes = vec![
            vote(1, 9, "Risks are underexplored"),
            vote(2, 8, "Steps are vague"),
            vote(3, 8, "Risks are underexplored"),
            vote(4, 7, "Steps are vague"),
            vote(5, 7, "Steps are vague"),
        ];
        // leader 9: voter 1 is not a dissenter
        assert_eq!(common_concern(&votes, 9).as_deref(), Some("Steps are vague"));
        assert_eq!(common_concern(&votes[..2], 9), None);
    }

    #[test]
    fn test_common_concern_compares_prefix() {
        let long_a = format!("{}alpha", "x".repeat(CONCERN_PREFIX_LEN));
        let long_b = format!("{}beta", "x".repeat(CONCERN_PREFIX_LEN));
        let votes = vec![vote(1, 2, &long_a), vote(3, 2, &long_b)];
        assert_eq!(
            common_concern(&votes, 9),
            Some("x".repeat(CONCERN_PREFIX_LEN))
        );
    }

    #[test]
    fn test_refine_caps_confidence_and_does_not_repeat() {
        let mut candidates = vec![CandidateSolution {
            producer: 4,
            text: "Plan.".to_string(),
            confidence: 0.99,
        }];
        refine(&mut candidates, "Steps are vague");
        refine(&mut candidates, "Steps are vague");
        assert_eq!(candidates[0].confidence, 1.0);
        assert_eq!(candidates[0].text.matches("Acknowledged concern").count(), 1);
    }

    #[test]
    fn test_tally_prefers_confidence_on_equal_counts() {
        let candidates = vec![
            CandidateSolution {
                producer: 4,
                text: "a".to_string(),
                confidence: 0.5,
            },
            CandidateSolution {
                producer: 8,
                text: "b".to_string(),
                confidence: 0.7,
            },
        ];
        let votes = vec![vote(1, 4, "c"), vote(2, 8, "c")];
        let t = tally(&candidates, &votes);
        assert_eq!(t.counts, vec![1, 1]);
        assert_eq!(t.leader, 1);
        assert_eq!(t.agreement, 0.5);
    }
}
