//! Session coordination for Crucible.
//!
//! Wires the persona panel, background timers, turn evaluation and the
//! scoring pipeline around one interview session. See
//! [`coordinator::SessionCoordinator`] for the lifecycle.

pub mod agents;
pub mod coordinator;
pub mod end_detector;
pub mod governor;
pub mod registry;
pub mod timer;
pub mod transport;

pub use coordinator::{SessionCoordinator, SessionState};
pub use registry::TaskRegistry;
pub use timer::{Timer, TimerState};
pub use transport::{RoomTransport, TranscriptEvent};

#[cfg(test)]
pub(crate) mod test_support;
