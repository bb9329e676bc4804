//! Mandatory Consensus Debate Engine
//!
//! Drives a fixed population of reasoning agents through pairwise debates,
//! aggregates their votes into a synthesized solution, and iterates until an
//! agreement threshold is reached or the round budget runs out. A
//! post-consensus verification pass corrects the winning text and may send
//! the loop around exactly once more.
//!
//! # Components
//!
//! - [`registry`]: the agent population and its statistics
//! - [`emotion`]: keyword-based emotional context of the input
//! - [`debate`]: pairwise debates with an explicit tie-break
//! - [`voting`]: stateless candidate scoring and ballot casting
//! - [`consensus`]: candidate synthesis and bounded voting rounds
//! - [`verifier`]: ordered correction checks on the winning text
//! - [`feedback`]: the statistics sink, the only writer of agent state
//! - [`engine`]: [`ConsensusEngine::run_consensus_debate`], the entry point
//!
//! # Usage
//!
//! ```no_run
//! use consensus_engine::{ConsensusEngine, EngineConfig};
//!
//! # async fn run() -> Result<(), consensus_engine::EngineError> {
//! let mut engine = ConsensusEngine::new(EngineConfig::from_env())?;
//! let result = engine
//!     .run_consensus_debate("Should we adopt a four-day week?", &[], 0.5)
//!     .await?;
//! println!("achieved: {} ({:.0}%)", result.achieved, result.agreement_percentage * 100.0);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod consensus;
pub mod context;
pub mod debate;
pub mod emotion;
pub mod engine;
pub mod error;
pub mod events;
pub mod feedback;
pub mod registry;
pub mod seed;
pub mod verifier;
pub mod voting;

pub use config::{EngineConfig, StatisticsConfig};
pub use consensus::{CandidateSolution, ConsensusResult, Synthesizer, Termination};
pub use debate::{ArgumentGenerator, ArgumentRequest, DebateRound};
pub use emotion::{EmotionalContext, EmotionalContextAnalyzer};
pub use engine::ConsensusEngine;
pub use error::{EngineError, EngineResult};
pub use events::{DebateEvent, EventBus, EventSink};
pub use registry::{Agent, AgentId, AgentRegistry, AgentRole, ManagementRoster};
pub use verifier::VerificationOutcome;
