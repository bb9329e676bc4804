//! Engine error types
//!
//! Only structural failures are errors. Protocol outcomes such as a missed
//! agreement threshold, a failed verification pass or a cancelled run are
//! reported as data on [`crate::ConsensusResult`].

use thiserror::Error;

use crate::registry::AgentId;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort an engine invocation before or during a run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Not enough debaters: need at least 2, found {available}")]
    EmptyDebaterPool { available: usize },

    #[error("No handler available to synthesize solutions or pair an odd debater")]
    NoHandlerAvailable,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker task failed: {0}")]
    TaskFailed(String),
}

impl EngineError {
    /// Structural errors are configuration or programmer mistakes and are
    /// raised before any round runs.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::AgentNotFound(_)
                | Self::EmptyDebaterPool { .. }
                | Self::NoHandlerAvailable
                | Self::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::AgentNotFound(42);
        assert_eq!(err.to_string(), "Agent not found: 42");

        let err = EngineError::EmptyDebaterPool { available: 1 };
        assert!(err.to_string().contains("found 1"));

        let err = EngineError::InvalidConfig("threshold".to_string());
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn test_structural_classification() {
        assert!(EngineError::NoHandlerAvailable.is_structural());
        assert!(EngineError::EmptyDebaterPool { available: 0 }.is_structural());
        assert!(!EngineError::TaskFailed("panic".to_string()).is_structural());
    }
}
