// cfgprobe Infrastructure - System Adapters
// Implements: ProbeRunner, ArtifactWriter

pub mod fs_artifact_writer;
pub mod subprocess_runner;

pub use fs_artifact_writer::FsArtifactWriter;
pub use subprocess_runner::SubprocessRunner;
