pub mod connection_type;
pub mod feedback;
pub mod group;
pub mod pipeline_config;
pub mod puzzle;

pub use connection_type::ConnectionTypeStore;
pub use feedback::FeedbackStore;
pub use group::GroupStore;
pub use pipeline_config::PipelineConfigStore;
pub use puzzle::PuzzleStore;
