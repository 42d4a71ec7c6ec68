// Domain Layer - Pure probe protocol and artifact logic

pub mod artifact;
pub mod directive;
pub mod invocation;

// Re-exports
pub use artifact::{render_artifact, WriteOutcome};
pub use directive::{transform, warnings, CfgFlag, CfgFlags, CFG_FLAG_PREFIX, RUSTC_CFG_PREFIX};
pub use invocation::{ProbeInvocation, TARGET_ENV_VAR};
