//! cfgprobe - runs a build probe and writes its cfg directives as a rustc flag file
//!
//! The host build system supplies the probe and output paths; the artifact
//! holds one `--cfg=<value>` per `cargo:rustc-cfg=<value>` line the probe prints.

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use cfgprobe_core::application::{cancel_channel, CfgProbePipeline, PipelineRequest, RunReport};
use cfgprobe_core::domain::{ProbeInvocation, WriteOutcome, TARGET_ENV_VAR};
use cfgprobe_core::port::time_provider::SystemTimeProvider;
use cfgprobe_infra_system::{FsArtifactWriter, SubprocessRunner};

#[derive(Parser, Debug)]
#[command(name = "cfgprobe")]
#[command(about = "Translate build probe cfg directives into a rustc flag file", long_about = None)]
#[command(version)]
struct Cli {
    /// Probe executable to run
    #[arg(long, env = "CFGPROBE_PROBE")]
    probe: String,

    /// Flag file to write
    #[arg(short, long, env = "CFGPROBE_OUTPUT")]
    output: String,

    /// Target triple passed to the probe as TARGET (empty: no explicit target)
    #[arg(long, env = "CFGPROBE_TARGET", default_value = "")]
    target: String,

    /// Extra environment override for the probe (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_override)]
    env: Vec<(String, String)>,

    /// Report format printed on success
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

impl Cli {
    /// `--env TARGET=...` wins over `--target`
    fn invocation(&self) -> ProbeInvocation {
        ProbeInvocation::new(expand(&self.probe))
            .with_env(TARGET_ENV_VAR, self.target.clone())
            .with_envs(self.env.iter().cloned())
    }

    fn output_path(&self) -> PathBuf {
        expand(&self.output)
    }
}

fn parse_env_override(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, _)) if key.is_empty() => Err(format!("empty variable name in '{}'", raw)),
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn print_report(report: &RunReport, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report).context("Failed to encode report")?;
            println!("{}", json);
        }
        ReportFormat::Text => {
            let status = match report.outcome {
                WriteOutcome::Written => "✓ cfg flags written".green().bold(),
                WriteOutcome::Unchanged => "✓ cfg flags unchanged".green(),
            };
            println!("{}", status);
            println!("  {} {}", "Probe:".bold(), report.probe.display());
            println!("  {} {}", "Output:".bold(), report.output.display());
            println!("  {} {}", "Flags:".bold(), report.flags.len());
            for flag in &report.flags {
                println!("    {}", flag);
            }
            println!("  {} {} ms", "Duration:".bold(), report.duration_ms);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init()?;
    info!("cfgprobe v{} starting", cfgprobe_core::VERSION);

    let request = PipelineRequest::new(cli.invocation(), cli.output_path());

    let pipeline = CfgProbePipeline::new(
        Arc::new(SubprocessRunner::new()),
        Arc::new(FsArtifactWriter::new()),
        Arc::new(SystemTimeProvider),
    );

    // Ctrl-C terminates the probe; nothing gets written
    let (cancel_handle, cancel_token) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling probe");
            cancel_handle.cancel();
        }
    });

    let report = pipeline
        .run(&request, cancel_token)
        .await
        .with_context(|| {
            format!(
                "cfgprobe failed for {}",
                request.invocation.program().display()
            )
        })?;

    print_report(&report, cli.report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_override() {
        assert_eq!(
            parse_env_override("PROFILE=release").unwrap(),
            ("PROFILE".to_string(), "release".to_string())
        );
        assert_eq!(
            parse_env_override("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert_eq!(
            parse_env_override("A=b=c").unwrap(),
            ("A".to_string(), "b=c".to_string())
        );
        assert!(parse_env_override("NOVALUE").is_err());
        assert!(parse_env_override("=value").is_err());
    }

    #[test]
    fn test_default_target_is_empty() {
        let cli = Cli::try_parse_from(["cfgprobe", "--probe", "/p", "--output", "/o"]).unwrap();
        let invocation = cli.invocation();

        assert_eq!(invocation.env_overrides()[TARGET_ENV_VAR], "");
        assert_eq!(cli.report, ReportFormat::Text);
    }

    #[test]
    fn test_env_override_beats_target_flag() {
        let cli = Cli::try_parse_from([
            "cfgprobe",
            "--probe",
            "/p",
            "--output",
            "/o",
            "--target",
            "aarch64-apple-darwin",
            "--env",
            "TARGET=x86_64-pc-windows-msvc",
            "--env",
            "OPT_LEVEL=3",
            "--report",
            "json",
        ])
        .unwrap();
        let invocation = cli.invocation();

        assert_eq!(invocation.env_overrides()["TARGET"], "x86_64-pc-windows-msvc");
        assert_eq!(invocation.env_overrides()["OPT_LEVEL"], "3");
        assert_eq!(cli.report, ReportFormat::Json);
    }

    #[test]
    fn test_plain_paths_kept() {
        let cli = Cli::try_parse_from(["cfgprobe", "--probe", "/bin/probe", "-o", "out/flags.txt"])
            .unwrap();
        assert_eq!(cli.output_path(), PathBuf::from("out/flags.txt"));
        assert_eq!(cli.invocation().program(), std::path::Path::new("/bin/probe"));
    }
}
