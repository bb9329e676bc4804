//! Command-line driver for the consensus debate engine
//!
//! Loads layered configuration, runs one invocation and renders the result.

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod report;

pub use config::{Overrides, RunnerConfig};
