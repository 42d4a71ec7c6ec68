// Application Layer - Use Cases

pub mod cancel;
pub mod constants;
pub mod pipeline;

// Re-exports
pub use cancel::{cancel_channel, CancelHandle, CancelToken};
pub use pipeline::{CfgProbePipeline, PipelineRequest, RunReport};
