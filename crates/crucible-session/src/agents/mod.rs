//! The background panel agents.
//!
//! Each agent runs as a tracked task on the session's registry and unwinds
//! cooperatively when the session tears down.

pub mod clock;
pub mod crisis;
pub mod mole;
pub mod observer;
pub mod pressure;

pub use clock::InterviewClock;
pub use crisis::CrisisPopupAgent;
pub use mole::MoleAgent;
pub use observer::ObserverAgent;
pub use pressure::PressureAgent;
