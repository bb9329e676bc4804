//! Consensus engine: the single entry point
//!
//! One invocation runs to completion before the next can start
//! (`run_consensus_debate` takes `&mut self`):
//!
//! ```text
//! input ─► emotion ─► debates ─► consensus ─► verification ─┬─► statistics ─► result
//!                                    ▲                      │
//!                                    └── one retry on fail ─┘
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::consensus::{
    CandidateSolution, ConsensusAttempt, ConsensusLoop, ConsensusResult, Synthesizer,
    TemplateSynthesizer, Termination,
};
use crate::context::RunContext;
use crate::debate::{
    ArgumentGenerator, ArgumentRequest, DebateOrchestrator, DebateRound, TemplateArgumentGenerator,
};
use crate::emotion::{EmotionalContext, EmotionalContextAnalyzer};
use crate::error::{EngineError, EngineResult};
use crate::events::{DebateEvent, EventBus, SharedEventSink};
use crate::feedback::StatisticsSink;
use crate::registry::{AgentId, AgentRegistry, AgentRole};
use crate::seed::invocation_seed;
use crate::verifier::{VerificationLoop, VerificationOutcome};

/// Complexity used when the caller passes a non-finite value
const DEFAULT_COMPLEXITY: f64 = 0.5;

/// Mandatory consensus debate engine
pub struct ConsensusEngine {
    config: EngineConfig,
    registry: AgentRegistry,
    generator: Arc<dyn ArgumentGenerator>,
    synthesizer: Arc<dyn Synthesizer>,
    events: SharedEventSink,
    cancel: CancellationToken,
}

impl ConsensusEngine {
    /// Build an engine with the configured population and the built-in
    /// generator and synthesizer.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let registry =
            AgentRegistry::initialize(config.team_count, config.agents_per_team, &config.management);
        info!(
            agents = registry.len(),
            debaters = registry.debaters().len(),
            threshold = config.consensus_threshold,
            max_rounds = config.max_consensus_rounds,
            "Consensus engine initialized"
        );
        Ok(Self {
            config,
            registry,
            generator: Arc::new(TemplateArgumentGenerator),
            synthesizer: Arc::new(TemplateSynthesizer),
            events: Arc::new(EventBus::new()),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_argument_generator(mut self, generator: Arc<dyn ArgumentGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_event_sink(mut self, events: SharedEventSink) -> Self {
        self.events = events;
        self
    }

    /// Replace the agent population
    pub fn with_registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Token that cancels the running invocation, or the next one when
    /// called between invocations.
    ///
    /// Once an invocation ends cancelled, the engine swaps in a fresh token,
    /// so handles taken earlier no longer affect later runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Run one full invocation: debates, consensus, verification, statistics.
    ///
    /// Structural problems (too few debaters, no handler) fail before any
    /// round runs. Missing consensus, failed verification and cancellation
    /// are reported on the returned [`ConsensusResult`].
    pub async fn run_consensus_debate(
        &mut self,
        input: &str,
        context: &[String],
        complexity: f64,
    ) -> EngineResult<ConsensusResult> {
        let cancel = self.cancel.clone();
        let result = self
            .run_consensus_debate_with_cancel(input, context, complexity, cancel.clone())
            .await;
        if cancel.is_cancelled() {
            debug!("Replacing the spent cancellation token");
            self.cancel = CancellationToken::new();
        }
        result
    }

    /// Like [`run_consensus_debate`](Self::run_consensus_debate), stopped by
    /// a caller-owned `cancel` instead of the engine's token.
    pub async fn run_consensus_debate_with_cancel(
        &mut self,
        input: &str,
        context: &[String],
        complexity: f64,
        cancel: CancellationToken,
    ) -> EngineResult<ConsensusResult> {
        let invocation_id = Uuid::new_v4();
        let seed = invocation_seed(self.config.seed);
        let ctx = RunContext::new(
            invocation_id,
            cancel,
            self.config.deadline(),
            self.events.clone(),
        );

        let snapshot = Arc::new(self.registry.clone());
        let orchestrator = DebateOrchestrator::new(snapshot.clone(), self.generator.clone());
        let pairings = orchestrator.pairings()?;
        if snapshot.all_by_role(AgentRole::Handler).is_empty() {
            return Err(EngineError::NoHandlerAvailable);
        }

        let emotional_context = EmotionalContextAnalyzer::analyze(input);
        info!(
            %invocation_id,
            seed,
            pairs = pairings.len(),
            sentiment = ?emotional_context.sentiment,
            urgency = ?emotional_context.urgency,
            style = %emotional_context.response_style,
            "Consensus debate started"
        );
        ctx.publish(DebateEvent::InvocationStarted {
            invocation_id,
            debaters: snapshot.debaters().len(),
            seed,
            timestamp: Utc::now(),
        });

        if ctx.should_stop() {
            warn!(%invocation_id, "Cancelled before the debate batch");
            let result = cancelled_result(invocation_id, Vec::new());
            self.finish(&ctx, &result);
            return Ok(result);
        }

        let request = Arc::new(ArgumentRequest {
            topic: input.to_string(),
            context: context.to_vec(),
            complexity: normalize_complexity(complexity),
            emotional_context: emotional_context.clone(),
        });
        let debate_rounds = orchestrator.run_debates(request, seed).await?;
        for round in &debate_rounds {
            ctx.publish(DebateEvent::DebateCompleted {
                invocation_id,
                round: round.round,
                winner: round.winner,
                confidence: round.confidence,
                tie_broken: round.tie_break.is_some(),
                timestamp: Utc::now(),
            });
        }

        let consensus = ConsensusLoop::new(
            snapshot,
            self.synthesizer.clone(),
            self.config.consensus_threshold,
            self.config.max_consensus_rounds,
        );
        let (result, voters) = self
            .consensus_and_verify(&consensus, &ctx, input, &emotional_context, debate_rounds)
            .await?;

        StatisticsSink::new(self.config.statistics).apply(&mut self.registry, &result, &voters)?;
        self.finish(&ctx, &result);
        Ok(result)
    }

    /// Blocking wrapper for synchronous callers.
    ///
    /// Drives the invocation on a fresh current-thread runtime, so it must
    /// not be called from inside an async context.
    pub fn run_blocking(
        &mut self,
        input: &str,
        context: &[String],
        complexity: f64,
    ) -> EngineResult<ConsensusResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EngineError::TaskFailed(format!("failed to start runtime: {}", e)))?;
        runtime.block_on(self.run_consensus_debate(input, context, complexity))
    }

    /// Consensus, verification and the single post-verification retry
    async fn consensus_and_verify(
        &self,
        consensus: &ConsensusLoop,
        ctx: &RunContext,
        input: &str,
        emotional_context: &EmotionalContext,
        debate_rounds: Vec<DebateRound>,
    ) -> EngineResult<(ConsensusResult, BTreeSet<AgentId>)> {
        let first = consensus
            .attempt_consensus(&debate_rounds, input, emotional_context, &[], ctx)
            .await?;
        let mut voters = first.voters.clone();
        let mut refinement_passes = first.refinement_passes;

        let candidate = match (first.termination, first.final_solution.clone()) {
            (termination, Some(candidate)) if termination != Termination::Cancelled => candidate,
            _ => {
                return Ok((
                    assemble(ctx.invocation_id, first, None, refinement_passes, debate_rounds),
                    voters,
                ))
            }
        };

        let outcome = self.verify(ctx, &candidate, input, emotional_context);
        if outcome.passed() {
            return Ok((
                assemble(
                    ctx.invocation_id,
                    first,
                    Some(outcome),
                    refinement_passes,
                    debate_rounds,
                ),
                voters,
            ));
        }

        info!(
            invocation_id = %ctx.invocation_id,
            confidence = outcome.confidence,
            "Verification did not pass, re-entering consensus once"
        );
        let retry_ctx = ctx.next_attempt();
        let second = consensus
            .attempt_consensus(
                &debate_rounds,
                input,
                emotional_context,
                &outcome.findings(),
                &retry_ctx,
            )
            .await?;
        voters.extend(second.voters.iter().copied());
        refinement_passes += second.refinement_passes;

        let verification = match &second.final_solution {
            Some(candidate) if second.termination != Termination::Cancelled => {
                Some(self.verify(&retry_ctx, candidate, input, emotional_context))
            }
            _ => Some(outcome),
        };
        Ok((
            assemble(
                ctx.invocation_id,
                second,
                verification,
                refinement_passes,
                debate_rounds,
            ),
            voters,
        ))
    }

    fn verify(
        &self,
        ctx: &RunContext,
        candidate: &CandidateSolution,
        input: &str,
        emotional_context: &EmotionalContext,
    ) -> VerificationOutcome {
        let outcome = VerificationLoop::verify(&candidate.text, input, emotional_context);
        ctx.publish(DebateEvent::VerificationCompleted {
            invocation_id: ctx.invocation_id,
            passed: outcome.passed(),
            corrections: outcome.applied_corrections.len(),
            confidence: outcome.confidence,
            timestamp: Utc::now(),
        });
        outcome
    }

    fn finish(&self, ctx: &RunContext, result: &ConsensusResult) {
        info!(
            invocation_id = %result.invocation_id,
            achieved = result.achieved,
            agreement = result.agreement_percentage,
            rounds_used = result.rounds_used,
            termination = %result.termination,
            verification_passed = result.verification_passed,
            "Consensus debate finished"
        );
        ctx.publish(DebateEvent::InvocationFinished {
            invocation_id: result.invocation_id,
            achieved: result.achieved,
            termination: result.termination,
            rounds_used: result.rounds_used,
            timestamp: Utc::now(),
        });
    }
}

/// Build the caller-facing result from a consensus attempt.
///
/// A cancelled attempt carries no verification. Otherwise the final
/// solution text is replaced by the verified, corrected text.
fn assemble(
    invocation_id: Uuid,
    attempt: ConsensusAttempt,
    verification: Option<VerificationOutcome>,
    refinement_passes: u32,
    debate_rounds: Vec<DebateRound>,
) -> ConsensusResult {
    let cancelled = attempt.termination == Termination::Cancelled;
    let verification = if cancelled { None } else { verification };
    let final_solution = match (attempt.final_solution, &verification) {
        (Some(solution), Some(outcome)) => Some(CandidateSolution {
            text: outcome.corrected_text.clone(),
            ..solution
        }),
        (solution, _) => solution,
    };

    ConsensusResult {
        invocation_id,
        achieved: attempt.achieved,
        agreement_percentage: attempt.agreement_percentage,
        rounds_used: attempt.rounds_used,
        final_solution,
        dissenter_feedback: attempt.dissenter_feedback,
        verification_passed: verification.as_ref().is_some_and(|v| v.passed()),
        verification,
        debate_rounds,
        termination: attempt.termination,
        refinement_passes,
    }
}

fn cancelled_result(invocation_id: Uuid, debate_rounds: Vec<DebateRound>) -> ConsensusResult {
    ConsensusResult {
        invocation_id,
        achieved: false,
        agreement_percentage: 0.0,
        rounds_used: 0,
        final_solution: None,
        dissenter_feedback: Vec::new(),
        verification_passed: false,
        verification: None,
        debate_rounds,
        termination: Termination::Cancelled,
        refinement_passes: 0,
    }
}

fn normalize_complexity(complexity: f64) -> f64 {
    if complexity.is_finite() {
        complexity.clamp(0.0, 1.0)
    } else {
        DEFAULT_COMPLEXITY
    }
}
