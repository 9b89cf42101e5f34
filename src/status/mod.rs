//! The status transition engine.
//!
//! Everything that decides whether, and how, a work item may change status
//! lives here: the per-type transition table, the completion prerequisite
//! gate, the upward cascade propagator, the per-entity lock coordinator, and
//! the orchestrating engine that sequences them.

mod cascade;
mod engine;
mod gate;
mod lock;
mod transitions;

pub use cascade::CascadeEntry;
pub use engine::{EngineConfig, StatusEngine, TransitionError, TransitionOutcome};
pub use gate::{check_completion, GateDecision};
pub use lock::{LockCoordinator, LockGuard, LockHandle};
pub use transitions::{is_allowed, TransitionMode};
