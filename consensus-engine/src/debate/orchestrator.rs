//! Debate orchestrator: pairs debaters and runs one contest per pair.
//!
//! Pairs are independent, so each runs on its own task; all tasks are
//! joined before any round is returned. A tied vote count is resolved by
//! the registry's designated proposer and is always logged and recorded.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::generator::{ArgumentGenerator, ArgumentRequest};
use super::round::{DebateRound, TieBreak};
use crate::error::{EngineError, EngineResult};
use crate::registry::{Agent, AgentId, AgentRegistry, AgentRole};
use crate::seed::derive_seed;
use crate::voting::{Candidate, VoteAggregator};

/// A scheduled contest between two agents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub round: u32,
    pub debater_a: AgentId,
    pub debater_b: AgentId,
}

/// Drives the pairwise debate phase
pub struct DebateOrchestrator {
    registry: Arc<AgentRegistry>,
    generator: Arc<dyn ArgumentGenerator>,
}

impl DebateOrchestrator {
    pub fn new(registry: Arc<AgentRegistry>, generator: Arc<dyn ArgumentGenerator>) -> Self {
        Self {
            registry,
            generator,
        }
    }

    /// Pair debaters sequentially: (0,1), (2,3), …
    ///
    /// An odd last debater is paired with the first handler. Yields
    /// ⌈debaters / 2⌉ pairings.
    pub fn pairings(&self) -> EngineResult<Vec<Pairing>> {
        let debaters: Vec<AgentId> = self.registry.debaters().iter().map(|a| a.id).collect();
        if debaters.len() < 2 {
            return Err(EngineError::EmptyDebaterPool {
                available: debaters.len(),
            });
        }

        let mut pairings = Vec::with_capacity(debaters.len().div_ceil(2));
        for (i, chunk) in debaters.chunks(2).enumerate() {
            let round = i as u32 + 1;
            let debater_a = chunk[0];
            let debater_b = match chunk.get(1) {
                Some(&b) => b,
                None => {
                    let handler = self
                        .registry
                        .all_by_role(AgentRole::Handler)
                        .first()
                        .map(|h| h.id)
                        .ok_or(EngineError::NoHandlerAvailable)?;
                    debug!(debater = debater_a, handler, "Odd debater paired with handler");
                    handler
                }
            };
            pairings.push(Pairing {
                round,
                debater_a,
                debater_b,
            });
        }
        Ok(pairings)
    }

    /// Run every pairwise debate and return the rounds ordered by number.
    pub async fn run_debates(
        &self,
        request: Arc<ArgumentRequest>,
        seed: u64,
    ) -> EngineResult<Vec<DebateRound>> {
        let pairings = self.pairings()?;
        info!(
            pairs = pairings.len(),
            topic = %request.topic,
            "Starting debate batch"
        );

        let mut join_set: JoinSet<EngineResult<DebateRound>> = JoinSet::new();
        for pairing in pairings {
            let registry = self.registry.clone();
            let generator = self.generator.clone();
            let request = request.clone();

            join_set.spawn(async move {
                let a = registry.get(pairing.debater_a)?;
                let b = registry.get(pairing.debater_b)?;
                let stream = u64::from(pairing.round) * 2;
                let argument_a =
                    generate_argument(generator.as_ref(), a, &request, derive_seed(seed, stream))
                        .await;
                let argument_b = generate_argument(
                    generator.as_ref(),
                    b,
                    &request,
                    derive_seed(seed, stream + 1),
                )
                .await;
                judge(&registry, pairing, &request.topic, argument_a, argument_b)
            });
        }

        // Barrier: no winner is visible until every pair has finished.
        let mut rounds = Vec::new();
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok(round) => rounds.push(round?),
                Err(e) => {
                    warn!(error = %e, "Debate task panicked");
                    return Err(EngineError::TaskFailed(e.to_string()));
                }
            }
        }
        rounds.sort_by_key(|r| r.round);

        for round in &rounds {
            debug!(
                round = round.round,
                winner = round.winner,
                confidence = round.confidence,
                "Debate decided"
            );
        }
        Ok(rounds)
    }
}

/// Generate an argument, substituting a role line for empty output
async fn generate_argument(
    generator: &dyn ArgumentGenerator,
    agent: &Agent,
    request: &ArgumentRequest,
    seed: u64,
) -> String {
    let argument = generator.generate(agent, request, seed).await;
    if argument.trim().is_empty() {
        warn!(agent = agent.id, "Argument generator returned empty text");
        return format!(
            "{} offers no further argument on \"{}\".",
            agent.label(),
            request.topic
        );
    }
    argument
}

/// Collect votes from every agent outside the pair and decide the winner.
pub fn judge(
    registry: &AgentRegistry,
    pairing: Pairing,
    topic: &str,
    argument_a: String,
    argument_b: String,
) -> EngineResult<DebateRound> {
    let a = registry.get(pairing.debater_a)?;
    let b = registry.get(pairing.debater_b)?;
    let candidates = [
        Candidate {
            owner: a,
            text: &argument_a,
        },
        Candidate {
            owner: b,
            text: &argument_b,
        },
    ];

    let votes: Vec<_> = registry
        .agents()
        .filter(|voter| voter.id != a.id && voter.id != b.id)
        .filter_map(|voter| VoteAggregator::cast(voter, &candidates, pairing.round))
        .map(|(_, vote)| vote)
        .collect();

    let votes_a = votes.iter().filter(|v| v.choice == a.id).count();
    let votes_b = votes.len() - votes_a;

    let (winner, tie_break) = match votes_a.cmp(&votes_b) {
        std::cmp::Ordering::Greater => (a.id, None),
        std::cmp::Ordering::Less => (b.id, None),
        std::cmp::Ordering::Equal => {
            let (winner, tie_break) = break_tie(registry, a, b, &argument_a, &argument_b);
            warn!(
                round = pairing.round,
                votes = votes_a,
                winner,
                breaker = ?tie_break.breaker,
                rule = %tie_break.rule,
                "Debate vote tied, designated proposer breaks the tie"
            );
            (winner, Some(tie_break))
        }
    };

    let confidence = if votes.is_empty() {
        0.0
    } else {
        votes_a.max(votes_b) as f64 / votes.len() as f64
    };

    Ok(DebateRound {
        round: pairing.round,
        debater_a: a.id,
        debater_b: b.id,
        topic: topic.to_string(),
        argument_a,
        argument_b,
        winner,
        votes,
        confidence,
        tie_break,
        created_at: Utc::now(),
    })
}

/// Tie-break policy: the designated proposer scores both arguments and the
/// higher score wins; equal scores fall back to higher performance, then to
/// the lower id. The winner is always one of the two debaters.
fn break_tie(
    registry: &AgentRegistry,
    a: &Agent,
    b: &Agent,
    argument_a: &str,
    argument_b: &str,
) -> (AgentId, TieBreak) {
    let breaker = registry.designated_proposer();
    let (score_a, score_b) = breaker
        .map(|p| {
            (
                VoteAggregator::score(p, a, argument_a),
                VoteAggregator::score(p, b, argument_b),
            )
        })
        .unwrap_or((0.0, 0.0));

    let (winner, rule) = if score_a > score_b {
        (a.id, "proposer score")
    } else if score_b > score_a {
        (b.id, "proposer score")
    } else if a.performance > b.performance {
        (a.id, "higher performance")
    } else if b.performance > a.performance {
        (b.id, "higher performance")
    } else {
        (a.id.min(b.id), "lower id")
    };

    (
        winner,
        TieBreak {
            breaker: breaker.map(|p| p.id),
            score_a,
            score_b,
            rule: rule.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::generator::TemplateArgumentGenerator;
    use crate::emotion::EmotionalContext;
    use crate::registry::ManagementRoster;

    fn request() -> Arc<ArgumentRequest> {
        Arc::new(ArgumentRequest {
            topic: "Adopt a four-day week".to_string(),
            context: vec![],
            complexity: 0.5,
            emotional_context: EmotionalContext::neutral(),
        })
    }

    fn orchestrator(registry: AgentRegistry) -> DebateOrchestrator {
        DebateOrchestrator::new(Arc::new(registry), Arc::new(TemplateArgumentGenerator))
    }

    fn agents(roles: &[AgentRole]) -> AgentRegistry {
        let records = roles
            .iter()
            .enumerate()
            .map(|(i, role)| Agent::new(i as AgentId + 1, *role, 1))
            .collect();
        AgentRegistry::from_agents(records).unwrap()
    }

    #[test]
    fn test_pairings_even() {
        let orch = orchestrator(agents(&[
            AgentRole::Proposer,
            AgentRole::Solver,
            AgentRole::Adversary,
            AgentRole::Proposer,
        ]));
        let pairings = orch.pairings().unwrap();
        assert_eq!(pairings.len(), 2);
        assert_eq!((pairings[0].debater_a, pairings[0].debater_b), (1, 2));
        assert_eq!((pairings[1].debater_a, pairings[1].debater_b), (3, 4));
    }

    #[test]
    fn test_pairings_odd_uses_handler() {
        let orch = orchestrator(agents(&[
            AgentRole::Proposer,
            AgentRole::Solver,
            AgentRole::Adversary,
            AgentRole::Handler,
            AgentRole::Solver,
            AgentRole::Adversary,
        ]));
        let pairings = orch.pairings().unwrap();
        assert_eq!(pairings.len(), 3);
        assert_eq!((pairings[2].debater_a, pairings[2].debater_b), (6, 4));
    }

    #[test]
    fn test_pairings_odd_without_handler() {
        let orch = orchestrator(agents(&[
            AgentRole::Proposer,
            AgentRole::Solver,
            AgentRole::Adversary,
        ]));
        assert_eq!(orch.pairings().unwrap_err(), EngineError::NoHandlerAvailable);
    }

    #[test]
    fn test_empty_debater_pool() {
        let orch = orchestrator(agents(&[AgentRole::Proposer, AgentRole::Handler]));
        assert_eq!(
            orch.pairings().unwrap_err(),
            EngineError::EmptyDebaterPool { available: 1 }
        );
    }

    #[tokio::test]
    async fn test_run_debates_default_population() {
        let registry = AgentRegistry::initialize(3, 4, &ManagementRoster::default());
        let orch = orchestrator(registry);
        let rounds = orch.run_debates(request(), 42).await.unwrap();

        // 9 debaters -> 4 pairs + 1 paired with a handler
        assert_eq!(rounds.len(), 5);
        for (i, round) in rounds.iter().enumerate() {
            assert_eq!(round.round, i as u32 + 1);
            assert!(round.winner == round.debater_a || round.winner == round.debater_b);
            assert_eq!(round.votes.len(), 21 - 2);
            assert!(round.votes.iter().all(|v| !round.involves(v.voter)));
            assert!(round.confidence >= 0.5 && round.confidence <= 1.0);
            assert!(!round.argument_a.is_empty() && !round.argument_b.is_empty());
        }
    }

    #[tokio::test]
    async fn test_run_debates_is_reproducible() {
        let registry = AgentRegistry::initialize(2, 4, &ManagementRoster::default());
        let orch = orchestrator(registry);
        let first = orch.run_debates(request(), 7).await.unwrap();
        let second = orch.run_debates(request(), 7).await.unwrap();
        for (x, y) in first.iter().zip(second.iter()) {
            assert_eq!(x.argument_a, y.argument_a);
            assert_eq!(x.argument_b, y.argument_b);
            assert_eq!(x.winner, y.winner);
            assert_eq!(x.votes, y.votes);
        }
    }

    #[test]
    fn test_tie_is_broken_by_designated_proposer() {
        // Two debaters and two voters that split evenly
        let registry = agents(&[
            AgentRole::Solver,
            AgentRole::Adversary,
            AgentRole::Proposer,
            AgentRole::Proposer,
        ]);
        let pairing = Pairing {
            round: 1,
            debater_a: 1,
            debater_b: 2,
        };
        // Identical texts: solver and adversary differ only in role, and
        // neither matches the proposer voters' role, so scores tie for
        // each voter and the ballots are spread one each.
        let round = judge(&registry, pairing, "t", "same".to_string(), "same".to_string()).unwrap();

        assert_eq!(round.vote_counts(), (1, 1));
        let tie_break = round.tie_break.clone().expect("tie must be recorded");
        assert_eq!(tie_break.breaker, Some(3));
        assert!(round.winner == 1 || round.winner == 2);
        assert_eq!(round.confidence, 0.5);
    }

    #[test]
    fn test_no_voters_goes_through_tie_break() {
        let registry = agents(&[AgentRole::Proposer, AgentRole::Solver]);
        let pairing = Pairing {
            round: 1,
            debater_a: 1,
            debater_b: 2,
        };
        let round = judge(&registry, pairing, "t", "x".to_string(), "y".to_string()).unwrap();
        assert!(round.votes.is_empty());
        assert_eq!(round.confidence, 0.0);
        assert!(round.tie_break.is_some());
        assert!(round.involves(round.winner));
    }
}
