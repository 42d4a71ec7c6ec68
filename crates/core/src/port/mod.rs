// Port Layer - Interfaces for external dependencies

pub mod artifact_writer;
pub mod probe_runner;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use artifact_writer::{ArtifactError, ArtifactWriter};
pub use probe_runner::{ProbeOutput, ProbeRunner, ProcessError};
pub use time_provider::TimeProvider;
