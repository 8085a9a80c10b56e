pub mod dimensions;
pub mod fact_builder;
pub mod pipeline;
pub mod quality_gate;
pub mod staging;

pub use dimensions::DimensionReport;
pub use fact_builder::{FactBuildReport, FactBuilder};
pub use pipeline::{Pipeline, PipelineReport, StageDetails, StageId, StageReport};
pub use quality_gate::{check_count, check_unique_key, QualityCheck};
pub use staging::StagingReport;
