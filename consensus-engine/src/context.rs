//! Per-invocation execution context
//!
//! Carries the invocation id, the stop signal (cancellation token plus an
//! optional deadline) and the event sink. Components check
//! [`RunContext::should_stop`] at every round boundary.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::events::{DebateEvent, SharedEventSink};

/// Shared execution context for one engine invocation
#[derive(Clone)]
pub struct RunContext {
    pub invocation_id: Uuid,
    /// Consensus attempt number (1, or 2 after a failed verification)
    pub attempt: u32,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    events: SharedEventSink,
}

impl RunContext {
    pub fn new(
        invocation_id: Uuid,
        cancel: CancellationToken,
        deadline: Option<Duration>,
        events: SharedEventSink,
    ) -> Self {
        Self {
            invocation_id,
            attempt: 1,
            cancel,
            deadline: deadline.map(|d| Instant::now() + d),
            events,
        }
    }

    /// Same context for the next consensus attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }

    /// Returns `true` if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns `true` once the deadline has passed.
    pub fn deadline_elapsed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Whether work should stop at the current boundary
    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.deadline_elapsed()
    }

    pub fn publish(&self, event: DebateEvent) {
        self.events.publish(event);
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("invocation_id", &self.invocation_id)
            .field("attempt", &self.attempt)
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use std::sync::Arc;

    fn ctx(deadline: Option<Duration>) -> (RunContext, CancellationToken) {
        let token = CancellationToken::new();
        let ctx = RunContext::new(
            Uuid::new_v4(),
            token.clone(),
            deadline,
            Arc::new(EventBus::new()),
        );
        (ctx, token)
    }

    #[test]
    fn test_cancel_stops() {
        let (ctx, token) = ctx(None);
        assert!(!ctx.should_stop());
        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(ctx.should_stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops() {
        let (ctx, _) = ctx(Some(Duration::from_millis(50)));
        assert!(!ctx.should_stop());
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(ctx.deadline_elapsed());
        assert!(ctx.should_stop());
    }

    #[test]
    fn test_next_attempt_shares_token() {
        let (ctx, token) = ctx(None);
        let next = ctx.next_attempt();
        assert_eq!(next.attempt, 2);
        assert_eq!(next.invocation_id, ctx.invocation_id);
        token.cancel();
        assert!(next.is_cancelled());
    }
}
