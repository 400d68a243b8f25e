//! pmhc-common — Shared error type and network plumbing used across the pmhc-setup crates.

pub mod error;
pub mod sandbox;

// Re-export commonly used types
pub use error::{Result, SetupError};
pub use sandbox::SandboxClient;
