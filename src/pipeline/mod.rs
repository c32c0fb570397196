// ETL pipeline: extraction, transform and run orchestration

pub mod extract;
pub mod orchestrator;
pub mod transform;

pub use orchestrator::{record_failed_run, run_pipeline, EtlPipeline, RunFailure, RunStep, RunSummary};
pub use transform::{purge_staging, transform_and_load, TransformEngine, TransformReport};
