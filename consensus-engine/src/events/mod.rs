//! Engine events
//!
//! The engine reports progress at every phase and round boundary through an
//! [`EventSink`]. The default sink is the broadcast-based [`EventBus`];
//! callers that need to react before the next boundary (for example to
//! cancel a run) can install their own sink, which is invoked synchronously.
//!
//! ```text
//! ┌──────────────┐  publish  ┌──────────────┐  recv   ┌──────────────┐
//! │    Engine    │──────────▶│  EventSink   │────────▶│  Subscribers │
//! └──────────────┘           └──────────────┘         └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventSink, SharedEventSink};
pub use types::DebateEvent;
