//! Shared helpers: shell-script probes and a real pipeline
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cfgprobe_core::application::CfgProbePipeline;
use cfgprobe_core::port::time_provider::SystemTimeProvider;
use cfgprobe_infra_system::{FsArtifactWriter, SubprocessRunner};

/// Write an executable `/bin/sh` probe with the given body
pub fn write_probe(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Probe whose stdout is exactly `stdout`
pub fn printing_probe(dir: &Path, name: &str, stdout: &str) -> PathBuf {
    let data = dir.join(format!("{}.stdout", name));
    std::fs::write(&data, stdout).unwrap();
    write_probe(dir, name, &format!("cat '{}'", data.display()))
}

pub fn real_pipeline() -> CfgProbePipeline {
    CfgProbePipeline::new(
        Arc::new(SubprocessRunner::new()),
        Arc::new(FsArtifactWriter::new()),
        Arc::new(SystemTimeProvider),
    )
}
