// Probe Runner Port (Invoker)
// Abstraction for executing the probe executable and capturing its stdout

use crate::application::cancel::CancelToken;
use crate::domain::ProbeInvocation;
use async_trait::async_trait;
use thiserror::Error;

/// Captured output of a probe that exited successfully
#[derive(Debug, Clone, Default)]
pub struct ProbeOutput {
    /// Complete stdout, decoded as UTF-8 (invalid sequences replaced)
    pub stdout: String,
    /// Complete stderr; diagnostic only, never parsed
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Invoker errors. All are fatal; none are retried.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Spawn failed for {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("{program} exited with {}{}", exit_label(.code), stderr_suffix(.stderr_tail))]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("IO error while waiting for {program}: {reason}")]
    Io { program: String, reason: String },

    #[error("{program} was cancelled")]
    Cancelled { program: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

fn stderr_suffix(stderr_tail: &str) -> String {
    if stderr_tail.is_empty() {
        String::new()
    } else {
        format!("\n--- stderr ---\n{}", stderr_tail)
    }
}

/// Probe Runner trait
///
/// Implementations:
/// - SubprocessRunner: spawns the probe as a child process
/// - MockProbeRunner: scripted outputs for tests
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    /// Run the probe once and return its complete output
    ///
    /// # Errors
    /// - ProcessError::SpawnFailed if the executable cannot be located or launched
    /// - ProcessError::NonZeroExit if the probe exits unsuccessfully (output discarded)
    /// - ProcessError::Cancelled if `cancel` fires before the probe exits
    async fn run(
        &self,
        invocation: &ProbeInvocation,
        cancel: CancelToken,
    ) -> Result<ProbeOutput, ProcessError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock runner behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit 0 with the given stdout
        Stdout(String),
        /// Exit with the given non-zero code
        Exit(i32),
        /// Fail to launch
        SpawnFail(String),
        /// Block until cancelled
        Hang,
    }

    /// Mock Probe Runner for testing
    pub struct MockProbeRunner {
        behavior: Arc<Mutex<MockBehavior>>,
        invocations: Arc<Mutex<Vec<ProbeInvocation>>>,
    }

    impl MockProbeRunner {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                invocations: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn with_stdout(stdout: impl Into<String>) -> Self {
            Self::new(MockBehavior::Stdout(stdout.into()))
        }
        pub fn with_exit(code: i32) -> Self {
            Self::new(MockBehavior::Exit(code))
        }
        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }
        pub fn call_count(&self) -> usize {
            self.invocations.lock().unwrap().len()
        }
        pub fn invocations(&self) -> Vec<ProbeInvocation> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProbeRunner for MockProbeRunner {
        async fn run(
            &self,
            invocation: &ProbeInvocation,
            mut cancel: CancelToken,
        ) -> Result<ProbeOutput, ProcessError> {
            self.invocations.lock().unwrap().push(invocation.clone());

            let behavior = self.behavior.lock().unwrap().clone();
            let program = invocation.program().display().to_string();

            match behavior {
                MockBehavior::Stdout(stdout) => Ok(ProbeOutput {
                    stdout,
                    stderr: String::new(),
                    exit_code: Some(0),
                }),
                MockBehavior::Exit(code) => Err(ProcessError::NonZeroExit {
                    program,
                    code: Some(code),
                    stderr_tail: String::new(),
                }),
                MockBehavior::SpawnFail(reason) => {
                    Err(ProcessError::SpawnFailed { program, reason })
                }
                MockBehavior::Hang => {
                    cancel.cancelled().await;
                    Err(ProcessError::Cancelled { program })
                }
            }
        }
    }
}
