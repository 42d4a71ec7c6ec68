// Artifact Writer Port
// Abstraction for persisting the flag list where the build system expects it

use crate::domain::{CfgFlag, WriteOutcome};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Artifact persistence errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Write failed for {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

impl ArtifactError {
    pub fn write_failed(path: &Path, reason: impl std::fmt::Display) -> Self {
        ArtifactError::WriteFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Artifact Writer trait
///
/// A failed write must never leave a file that looks like a complete flag list.
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Replace the contents of `path` with `flags`, one per line
    ///
    /// # Errors
    /// - ArtifactError::WriteFailed if the destination cannot be created or written
    async fn write(&self, path: &Path, flags: &[CfgFlag]) -> Result<WriteOutcome, ArtifactError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::render_artifact;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// In-memory artifact store for testing
    #[derive(Default)]
    pub struct MemoryArtifactWriter {
        files: Arc<Mutex<HashMap<PathBuf, String>>>,
        write_count: Arc<Mutex<usize>>,
        fail_with: Option<String>,
    }

    impl MemoryArtifactWriter {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn failing(reason: impl Into<String>) -> Self {
            Self {
                fail_with: Some(reason.into()),
                ..Self::default()
            }
        }
        pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
            self.files.lock().unwrap().get(path.as_ref()).cloned()
        }
        pub fn write_count(&self) -> usize {
            *self.write_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl ArtifactWriter for MemoryArtifactWriter {
        async fn write(
            &self,
            path: &Path,
            flags: &[CfgFlag],
        ) -> Result<WriteOutcome, ArtifactError> {
            *self.write_count.lock().unwrap() += 1;

            if let Some(reason) = &self.fail_with {
                return Err(ArtifactError::write_failed(path, reason));
            }

            let body = render_artifact(flags);
            let mut files = self.files.lock().unwrap();
            if files.get(path).is_some_and(|existing| *existing == body) {
                return Ok(WriteOutcome::Unchanged);
            }
            files.insert(path.to_path_buf(), body);
            Ok(WriteOutcome::Written)
        }
    }
}
