//! Pairwise debates
//!
//! Debate-capable agents argue in pairs, every other agent votes, and each
//! pair yields one immutable [`DebateRound`].

pub mod generator;
pub mod orchestrator;
pub mod round;

pub use generator::{ArgumentGenerator, ArgumentRequest, TemplateArgumentGenerator};
pub use orchestrator::{DebateOrchestrator, Pairing};
pub use round::{DebateRound, TieBreak};
