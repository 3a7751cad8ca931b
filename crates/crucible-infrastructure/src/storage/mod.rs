//! File storage primitives.

mod atomic_file;
mod secret;

pub use atomic_file::AtomicFile;
pub use secret::{ChatSecret, SecretConfig, SecretStorage};
