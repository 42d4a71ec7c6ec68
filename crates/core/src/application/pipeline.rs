// Probe pipeline: run probe -> select cfg directives -> persist flag file
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::cancel::CancelToken;
use crate::domain::{transform, warnings, CfgFlag, ProbeInvocation, WriteOutcome};
use crate::error::{PipelineError, Result};
use crate::port::{ArtifactWriter, ProbeRunner, ProcessError, TimeProvider};

/// One pipeline run: which probe to invoke and where its flags go
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub invocation: ProbeInvocation,
    pub output_path: PathBuf,
}

impl PipelineRequest {
    pub fn new(invocation: ProbeInvocation, output_path: impl Into<PathBuf>) -> Self {
        Self {
            invocation,
            output_path: output_path.into(),
        }
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub probe: PathBuf,
    pub output: PathBuf,
    pub flags: Vec<String>,
    pub outcome: WriteOutcome,
    pub duration_ms: i64,
}

/// Composes the Invoker, the directive transform and the Artifact Writer.
///
/// Holds no per-run state, so a single instance can drive any number of
/// concurrent runs as long as each targets its own output path.
pub struct CfgProbePipeline {
    runner: Arc<dyn ProbeRunner>,
    writer: Arc<dyn ArtifactWriter>,
    time_provider: Arc<dyn TimeProvider>,
}

impl CfgProbePipeline {
    /// Create a new pipeline
    ///
    /// # Arguments
    /// * `runner` - Invoker used to execute the probe
    /// * `writer` - Destination for the flag list
    /// * `time_provider` - Clock for duration tracking
    pub fn new(
        runner: Arc<dyn ProbeRunner>,
        writer: Arc<dyn ArtifactWriter>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            runner,
            writer,
            time_provider,
        }
    }

    /// Run the probe and write its cfg flags to `request.output_path`.
    ///
    /// Any probe failure (launch, exit status, cancellation) aborts before the
    /// writer is reached, so the artifact is never created or modified.
    ///
    /// # Example
    /// ```text
    /// let request = PipelineRequest::new(ProbeInvocation::untargeted(probe), out_path);
    /// let report = pipeline.run(&request, CancelToken::never()).await?;
    /// println!("{} flags -> {}", report.flags.len(), report.output.display());
    /// ```
    pub async fn run(&self, request: &PipelineRequest, cancel: CancelToken) -> Result<RunReport> {
        let start_time = self.time_provider.now_millis();
        let probe = request.invocation.program();
        let cancel_check = cancel.clone();

        info!(
            probe = %probe.display(),
            output = %request.output_path.display(),
            env_overrides = ?request.invocation.env_overrides(),
            "Running build probe"
        );

        let output = self
            .runner
            .run(&request.invocation, cancel)
            .await
            .map_err(|e| {
                warn!(probe = %probe.display(), stage = %e.stage(), error = %e, "Build probe failed");
                PipelineError::from(e)
            })?;

        for message in warnings(&output.stdout) {
            warn!(probe = %probe.display(), "probe warning: {}", message);
        }

        let flags: Vec<CfgFlag> = transform(&output.stdout).collect();
        debug!(probe = %probe.display(), flag_count = flags.len(), "Selected cfg directives");

        if cancel_check.is_cancelled() {
            warn!(probe = %probe.display(), "Cancelled before artifact write");
            return Err(PipelineError::from(ProcessError::Cancelled {
                program: probe.display().to_string(),
            }));
        }

        let outcome = self.write_artifact(&request.output_path, &flags).await?;

        let duration_ms = self.time_provider.now_millis() - start_time;

        info!(
            probe = %probe.display(),
            output = %request.output_path.display(),
            flag_count = flags.len(),
            outcome = %outcome,
            duration_ms = %duration_ms,
            "Build probe completed"
        );

        Ok(RunReport {
            probe: probe.to_path_buf(),
            output: request.output_path.clone(),
            flags: flags.iter().map(ToString::to_string).collect(),
            outcome,
            duration_ms,
        })
    }

    async fn write_artifact(&self, path: &Path, flags: &[CfgFlag]) -> Result<WriteOutcome> {
        self.writer.write(path, flags).await.map_err(|e| {
            warn!(output = %path.display(), error = %e, "Artifact write failed");
            PipelineError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cancel::cancel_channel;
    use crate::error::Stage;
    use crate::port::artifact_writer::mocks::MemoryArtifactWriter;
    use crate::port::probe_runner::mocks::{MockBehavior, MockProbeRunner};
    use crate::port::time_provider::mocks::SteppingTimeProvider;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const OUT: &str = "/build/out/probe.cfg";

    fn pipeline(
        runner: Arc<MockProbeRunner>,
        writer: Arc<MemoryArtifactWriter>,
    ) -> CfgProbePipeline {
        CfgProbePipeline::new(runner, writer, Arc::new(SteppingTimeProvider::new(1_000, 5)))
    }

    fn request() -> PipelineRequest {
        PipelineRequest::new(ProbeInvocation::untargeted("/build/probe"), OUT)
    }

    #[tokio::test]
    async fn test_selected_flags_written_in_order() {
        let runner = Arc::new(MockProbeRunner::with_stdout(
            "cargo:rustc-cfg=feature_x\ncargo:warning=ignore me\ncargo:rustc-cfg=feature_y\n",
        ));
        let writer = Arc::new(MemoryArtifactWriter::new());

        let report = assert_ok!(
            pipeline(runner.clone(), writer.clone())
                .run(&request(), CancelToken::never())
                .await
        );

        assert_eq!(writer.contents(OUT).unwrap(), "--cfg=feature_x\n--cfg=feature_y\n");
        assert_eq!(report.flags, vec!["--cfg=feature_x", "--cfg=feature_y"]);
        assert_eq!(report.outcome, WriteOutcome::Written);
        assert_eq!(report.duration_ms, 5);
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_output_writes_empty_artifact() {
        let runner = Arc::new(MockProbeRunner::with_stdout(""));
        let writer = Arc::new(MemoryArtifactWriter::new());

        let report = assert_ok!(
            pipeline(runner, writer.clone())
                .run(&request(), CancelToken::never())
                .await
        );

        assert_eq!(writer.contents(OUT).unwrap(), "");
        assert!(report.flags.is_empty());
    }

    #[tokio::test]
    async fn test_second_identical_run_is_unchanged() {
        let runner = Arc::new(MockProbeRunner::with_stdout("cargo:rustc-cfg=a\n"));
        let writer = Arc::new(MemoryArtifactWriter::new());
        let pipeline = pipeline(runner, writer.clone());

        let first = assert_ok!(pipeline.run(&request(), CancelToken::never()).await);
        let second = assert_ok!(pipeline.run(&request(), CancelToken::never()).await);

        assert_eq!(first.outcome, WriteOutcome::Written);
        assert_eq!(second.outcome, WriteOutcome::Unchanged);
        assert_eq!(writer.contents(OUT).unwrap(), "--cfg=a\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_skips_writer() {
        let runner = Arc::new(MockProbeRunner::with_exit(1));
        let writer = Arc::new(MemoryArtifactWriter::new());

        let err = assert_err!(
            pipeline(runner, writer.clone())
                .run(&request(), CancelToken::never())
                .await
        );

        assert_eq!(err.stage(), Stage::Exit);
        assert!(matches!(
            err,
            PipelineError::Process(ProcessError::NonZeroExit { code: Some(1), .. })
        ));
        assert_eq!(writer.write_count(), 0);
        assert!(writer.contents(OUT).is_none());
    }

    #[tokio::test]
    async fn test_spawn_failure_skips_writer() {
        let runner = Arc::new(MockProbeRunner::new(MockBehavior::SpawnFail(
            "No such file or directory".to_string(),
        )));
        let writer = Arc::new(MemoryArtifactWriter::new());

        let err = assert_err!(
            pipeline(runner, writer.clone())
                .run(&request(), CancelToken::never())
                .await
        );

        assert_eq!(err.stage(), Stage::Spawn);
        assert_eq!(writer.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_reported_as_write_stage() {
        let runner = Arc::new(MockProbeRunner::with_stdout("cargo:rustc-cfg=a\n"));
        let writer = Arc::new(MemoryArtifactWriter::failing("Permission denied"));

        let err = assert_err!(
            pipeline(runner, writer)
                .run(&request(), CancelToken::never())
                .await
        );

        assert_eq!(err.stage(), Stage::Write);
        assert!(err.to_string().contains("Permission denied"));
    }

    #[tokio::test]
    async fn test_cancelled_probe_writes_nothing() {
        let runner = Arc::new(MockProbeRunner::new(MockBehavior::Hang));
        let writer = Arc::new(MemoryArtifactWriter::new());
        let pipeline = Arc::new(pipeline(runner, writer.clone()));
        let (handle, token) = cancel_channel();

        let task = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run(&request(), token).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("cancelled run should finish")
            .unwrap();

        let err = assert_err!(result);
        assert_eq!(err.stage(), Stage::Cancelled);
        assert_eq!(writer.write_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_probe_exit_skips_writer() {
        // Runner returns normally even though cancellation already fired
        let runner = Arc::new(MockProbeRunner::with_stdout("cargo:rustc-cfg=a\n"));
        let writer = Arc::new(MemoryArtifactWriter::new());
        let (handle, token) = cancel_channel();
        handle.cancel();

        let err = assert_err!(pipeline(runner.clone(), writer.clone()).run(&request(), token).await);

        assert_eq!(err.stage(), Stage::Cancelled);
        assert_eq!(runner.call_count(), 1);
        assert_eq!(writer.write_count(), 0);
    }

    #[tokio::test]
    async fn test_invocation_forwarded_to_runner() {
        let runner = Arc::new(MockProbeRunner::with_stdout(""));
        let writer = Arc::new(MemoryArtifactWriter::new());
        let request = PipelineRequest::new(
            ProbeInvocation::untargeted("/build/probe").with_env("PROFILE", "release"),
            OUT,
        );

        assert_ok!(
            pipeline(runner.clone(), writer)
                .run(&request, CancelToken::never())
                .await
        );

        let seen = runner.invocations();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].env_overrides()["TARGET"], "");
        assert_eq!(seen[0].env_overrides()["PROFILE"], "release");
    }

    #[tokio::test]
    async fn test_runner_behavior_can_change_between_runs() {
        let runner = Arc::new(MockProbeRunner::with_stdout("cargo:rustc-cfg=a\n"));
        let writer = Arc::new(MemoryArtifactWriter::new());
        let pipeline = pipeline(runner.clone(), writer.clone());

        assert_ok!(pipeline.run(&request(), CancelToken::never()).await);
        runner.set_behavior(MockBehavior::Exit(2));
        assert_err!(pipeline.run(&request(), CancelToken::never()).await);

        // Failed second run leaves the first artifact intact
        assert_eq!(writer.contents(OUT).unwrap(), "--cfg=a\n");
        assert_eq!(writer.write_count(), 1);
    }
}
