//! Storage adapters for Crucible.
//!
//! Everything that touches the filesystem lives here: atomic file writes,
//! secret (API key) storage, the TOML scenario repository and the session
//! artifact store.

pub mod artifact;
pub mod scenario_repository;
pub mod storage;

pub use artifact::{ArtifactPaths, ArtifactStore};
pub use scenario_repository::TomlScenarioRepository;
pub use storage::{AtomicFile, SecretStorage};
