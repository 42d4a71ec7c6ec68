// Subprocess probe runner
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cfgprobe_core::application::cancel::CancelToken;
use cfgprobe_core::application::constants::{CANCEL_GRACE_PERIOD, STDERR_TAIL_LINES};
use cfgprobe_core::domain::ProbeInvocation;
use cfgprobe_core::port::probe_runner::{ProbeOutput, ProbeRunner, ProcessError};

type PipeTask = JoinHandle<std::io::Result<Vec<u8>>>;

/// Spawns the probe as a child process.
///
/// The child inherits this process's environment with the invocation's
/// overrides applied on top. No arguments, stdin closed, stdout and stderr
/// captured separately.
pub struct SubprocessRunner {
    grace_period: Duration,
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SubprocessRunner {
    pub fn new() -> Self {
        Self {
            grace_period: CANCEL_GRACE_PERIOD,
        }
    }

    /// Override the SIGTERM -> SIGKILL delay used on cancellation
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    fn spawn(&self, invocation: &ProbeInvocation) -> Result<Child, ProcessError> {
        Command::new(invocation.program())
            .envs(invocation.env_overrides())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::SpawnFailed {
                program: invocation.program().display().to_string(),
                reason: e.to_string(),
            })
    }

    /// SIGTERM first, then SIGKILL once the grace period runs out
    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            info!(pid = %pid, "Sending SIGTERM to cancelled probe");
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!(pid = %pid, error = %e, "SIGTERM failed");
            }

            match tokio::time::timeout(self.grace_period, child.wait()).await {
                Ok(_) => {
                    info!(pid = %pid, "Probe exited after SIGTERM");
                    return;
                }
                Err(_) => {
                    warn!(pid = %pid, "Probe did not exit after SIGTERM, sending SIGKILL");
                }
            }
        }

        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill cancelled probe");
        }
    }
}

fn read_pipe<R>(pipe: Option<R>) -> PipeTask
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn collect_pipe(task: &mut PipeTask, program: &str) -> Result<String, ProcessError> {
    let io_error = |reason: String| ProcessError::Io {
        program: program.to_string(),
        reason,
    };
    let bytes = task
        .await
        .map_err(|e| io_error(e.to_string()))?
        .map_err(|e| io_error(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Last `max_lines` lines of `stderr`
fn stderr_tail(stderr: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

fn check_status(
    program: &str,
    status: ExitStatus,
    stderr: &str,
) -> Result<(), ProcessError> {
    if status.success() {
        return Ok(());
    }
    Err(ProcessError::NonZeroExit {
        program: program.to_string(),
        code: status.code(),
        stderr_tail: stderr_tail(stderr, STDERR_TAIL_LINES),
    })
}

#[async_trait]
impl ProbeRunner for SubprocessRunner {
    async fn run(
        &self,
        invocation: &ProbeInvocation,
        mut cancel: CancelToken,
    ) -> Result<ProbeOutput, ProcessError> {
        let program = invocation.program().display().to_string();

        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled { program });
        }

        let mut child = self.spawn(invocation)?;
        debug!(program = %program, pid = ?child.id(), "Probe spawned");

        let stdout_task = read_pipe(child.stdout.take());
        let stderr_task = read_pipe(child.stderr.take());

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| ProcessError::Io {
                program: program.clone(),
                reason: e.to_string(),
            }),
            _ = cancel.cancelled() => {
                self.terminate(&mut child).await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(ProcessError::Cancelled { program });
            }
        };
        let status = match status {
            Ok(status) => status,
            Err(e) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(e);
            }
        };

        let (mut stdout_task, mut stderr_task) = (stdout_task, stderr_task);

        // Pipes can outlive the probe when a grandchild inherits them
        let drained = tokio::select! {
            drained = async {
                let stdout = collect_pipe(&mut stdout_task, &program).await?;
                let stderr = collect_pipe(&mut stderr_task, &program).await?;
                Ok::<_, ProcessError>((stdout, stderr))
            } => drained,
            _ = cancel.cancelled() => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(ProcessError::Cancelled { program });
            }
        };
        let (stdout, stderr) = drained?;

        for line in stderr.lines() {
            debug!(program = %program, "probe stderr: {}", line);
        }

        check_status(&program, status, &stderr)?;

        Ok(ProbeOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        })
    }
}
