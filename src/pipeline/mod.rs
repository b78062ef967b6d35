//! The pipeline: pool-health checks, LLM-driven group generation, and
//! uniqueness-aware puzzle assembly (spec §4).

pub mod error;
pub mod generator;
pub mod result;
pub mod service;
pub mod stage;

pub use error::{PipelineErrorCode, PipelineErrorEntry};
pub use generator::{GenerationOutcome, PipelineGenerator};
pub use result::{ColorOutcome, GroupsByColor, PipelineFillResult};
pub use service::{PipelineService, PoolHealth};
pub use stage::{Stage, StageSink};
