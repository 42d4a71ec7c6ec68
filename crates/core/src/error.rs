// Central Error Type for the pipeline

use std::fmt;
use thiserror::Error;

use crate::port::{ArtifactError, ProcessError};

/// Pipeline stage that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Spawn,
    Wait,
    Exit,
    Cancelled,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Spawn => write!(f, "spawn"),
            Stage::Wait => write!(f, "wait"),
            Stage::Exit => write!(f, "exit"),
            Stage::Cancelled => write!(f, "cancelled"),
            Stage::Write => write!(f, "write"),
        }
    }
}

/// Pipeline-level error type
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("probe {} stage failed: {0}", .0.stage())]
    Process(#[from] ProcessError),

    #[error("artifact write stage failed: {0}")]
    Artifact(#[from] ArtifactError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Process(err) => err.stage(),
            PipelineError::Artifact(_) => Stage::Write,
        }
    }
}

impl ProcessError {
    pub fn stage(&self) -> Stage {
        match self {
            ProcessError::SpawnFailed { .. } => Stage::Spawn,
            ProcessError::Io { .. } => Stage::Wait,
            ProcessError::NonZeroExit { .. } => Stage::Exit,
            ProcessError::Cancelled { .. } => Stage::Cancelled,
        }
    }
}

/// Result type alias using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
