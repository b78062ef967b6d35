pub mod connection_type;
pub mod feedback;
pub mod group;
pub mod pipeline_config;
pub mod puzzle;

pub use connection_type::PgConnectionTypeStore;
pub use feedback::PgFeedbackStore;
pub use group::PgGroupStore;
pub use pipeline_config::PgPipelineConfigStore;
pub use puzzle::PgPuzzleStore;
