// Filesystem artifact writer
// reason: tempfile for write-then-rename atomic replacement
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use cfgprobe_core::domain::{render_artifact, CfgFlag, WriteOutcome};
use cfgprobe_core::port::artifact_writer::{ArtifactError, ArtifactWriter};

/// Writes the flag file next to its destination and renames it into place.
///
/// A destination that already holds identical bytes is left untouched so its
/// modification time does not trigger downstream rebuilds.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsArtifactWriter;

impl FsArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

fn destination_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<WriteOutcome, ArtifactError> {
    if path.as_os_str().is_empty() {
        return Err(ArtifactError::write_failed(path, "empty output path"));
    }

    if let Ok(existing) = std::fs::read(path) {
        if existing == content {
            return Ok(WriteOutcome::Unchanged);
        }
    }

    let dir = destination_dir(path);
    std::fs::create_dir_all(&dir).map_err(|e| ArtifactError::write_failed(path, e))?;

    let mut temp = NamedTempFile::new_in(&dir).map_err(|e| ArtifactError::write_failed(path, e))?;
    temp.write_all(content)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| ArtifactError::write_failed(path, e))?;

    // Replacing keeps the destination's mode; new files keep tempfile's owner-only mode
    if let Ok(existing) = std::fs::metadata(path) {
        if existing.is_file() {
            std::fs::set_permissions(temp.path(), existing.permissions())
                .map_err(|e| ArtifactError::write_failed(path, e))?;
        }
    }

    // Dropping the temp file on failure removes it; the destination is untouched
    temp.persist(path)
        .map_err(|e| ArtifactError::write_failed(path, e.error))?;

    Ok(WriteOutcome::Written)
}

#[async_trait]
impl ArtifactWriter for FsArtifactWriter {
    async fn write(&self, path: &Path, flags: &[CfgFlag]) -> Result<WriteOutcome, ArtifactError> {
        let body = render_artifact(flags);
        let destination = path.to_path_buf();

        let outcome = tokio::task::spawn_blocking(move || write_atomic(&destination, body.as_bytes()))
            .await
            .map_err(|e| ArtifactError::write_failed(path, e))??;

        debug!(output = %path.display(), outcome = %outcome, "Artifact persisted");
        Ok(outcome)
    }
}
