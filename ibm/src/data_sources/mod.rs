pub mod pipeline;

pub use pipeline::PipelineDataSource;
