use super::extract::{extract_crime_records, extract_district_document, OcrEngine, PageRenderer};
use super::transform::{purge_staging, TransformEngine, TransformReport};
use crate::config::{SourcePaths, TransformRules};
use crate::constants::BANNER_RULE_WIDTH;
use crate::error::EtlError;
use crate::metrics::LoadMetrics;
use crate::storage::Storage;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// The fixed steps of one run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStep {
    VerifyStore,
    ExtractRecords,
    ExtractDocument,
    TransformAndLoad,
    PurgeStaging,
}

impl RunStep {
    pub const ALL: [RunStep; 5] = [
        RunStep::VerifyStore,
        RunStep::ExtractRecords,
        RunStep::ExtractDocument,
        RunStep::TransformAndLoad,
        RunStep::PurgeStaging,
    ];

    /// Stable snake_case name for logs and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStep::VerifyStore => "verify_store",
            RunStep::ExtractRecords => "extract_records",
            RunStep::ExtractDocument => "extract_document",
            RunStep::TransformAndLoad => "transform_and_load",
            RunStep::PurgeStaging => "purge_staging",
        }
    }

    fn success_banner(&self) -> &'static str {
        match self {
            RunStep::VerifyStore => "✅ Database connection successful",
            RunStep::ExtractRecords => "✅ Crime data extracted into STAGING crime table successfully",
            RunStep::ExtractDocument => {
                "✅ District data extracted into STAGING district table successfully"
            }
            RunStep::TransformAndLoad => {
                "✅ Data transformed and loaded into CORE crime table successfully."
            }
            RunStep::PurgeStaging => "✅ Staging tables truncated successfully.",
        }
    }
}

impl fmt::Display for RunStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStep::VerifyStore => "Database connection",
            RunStep::ExtractRecords => "Crime records extraction",
            RunStep::ExtractDocument => "District document extraction",
            RunStep::TransformAndLoad => "Transform and load",
            RunStep::PurgeStaging => "Staging truncation",
        };
        f.write_str(label)
    }
}

/// The first step that failed, with its cause
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct RunFailure {
    pub step: RunStep,
    pub source: EtlError,
}

impl RunFailure {
    pub fn new(step: RunStep, source: EtlError) -> Self {
        Self { step, source }
    }
}

/// Counts from a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub crime_rows_staged: u64,
    pub district_rows_staged: u64,
    pub transform: TransformReport,
    pub duration_secs: f64,
}

fn print_banner(message: &str) {
    println!("{message}");
    println!("{}", "-".repeat(BANNER_RULE_WIDTH));
}

/// Drives the five run steps against one store
pub struct EtlPipeline<'a> {
    sources: SourcePaths,
    renderer: &'a dyn PageRenderer,
    ocr: &'a dyn OcrEngine,
    engine: TransformEngine,
}

impl<'a> EtlPipeline<'a> {
    pub fn new(
        sources: SourcePaths,
        rules: TransformRules,
        renderer: &'a dyn PageRenderer,
        ocr: &'a dyn OcrEngine,
    ) -> Self {
        Self {
            sources,
            renderer,
            ocr,
            engine: TransformEngine::new(rules),
        }
    }

    /// Run every step in order. The first failing step ends the run; nothing is retried.
    pub async fn run<S>(&self, store: &S) -> Result<RunSummary, RunFailure>
    where
        S: Storage + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("etl_run", run_id = %run_id);
        let started = Instant::now();

        let result = self.run_steps(store, run_id, started).instrument(span).await;

        let duration_secs = started.elapsed().as_secs_f64();
        match &result {
            Ok(_) => LoadMetrics::record_run("success", duration_secs),
            Err(failure) => record_failed_run(failure, Some(run_id), duration_secs),
        }
        result
    }

    async fn run_steps<S>(
        &self,
        store: &S,
        run_id: Uuid,
        started: Instant,
    ) -> Result<RunSummary, RunFailure>
    where
        S: Storage + ?Sized,
    {
        info!("Starting ETL run");
        println!("\n\n");

        store
            .ping()
            .await
            .map_err(|e| RunFailure::new(RunStep::VerifyStore, e))?;
        step_done(RunStep::VerifyStore);

        let crime_rows_staged = extract_crime_records(store, &self.sources.crime_records)
            .await
            .map_err(|e| RunFailure::new(RunStep::ExtractRecords, e))?;
        step_done(RunStep::ExtractRecords);

        let district_rows_staged = extract_district_document(
            store,
            self.renderer,
            self.ocr,
            &self.sources.district_document,
        )
        .await
        .map_err(|e| RunFailure::new(RunStep::ExtractDocument, e))?;
        // A soft-empty document already printed its own notice
        if district_rows_staged > 0 {
            step_done(RunStep::ExtractDocument);
        }

        let transform = self
            .engine
            .transform_and_load(store)
            .await
            .map_err(|e| RunFailure::new(RunStep::TransformAndLoad, e))?;
        step_done(RunStep::TransformAndLoad);

        purge_staging(store)
            .await
            .map_err(|e| RunFailure::new(RunStep::PurgeStaging, e))?;
        step_done(RunStep::PurgeStaging);

        println!("✅ ETL Data Pipeline has been executed successfully ✅");
        println!("\n\n");

        let summary = RunSummary {
            run_id,
            crime_rows_staged,
            district_rows_staged,
            transform,
            duration_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            crime_rows_staged = summary.crime_rows_staged,
            district_rows_staged = summary.district_rows_staged,
            rows_loaded = summary.transform.rows_loaded,
            duration_secs = summary.duration_secs,
            "ETL run completed"
        );
        Ok(summary)
    }
}

/// Log a failed run and count it. Also used for failures before a run starts.
pub fn record_failed_run(failure: &RunFailure, run_id: Option<Uuid>, duration_secs: f64) {
    LoadMetrics::record_run("failure", duration_secs);
    match run_id {
        Some(run_id) => error!(
            run_id = %run_id,
            step = failure.step.as_str(),
            "Run failed: {}",
            failure.source
        ),
        None => error!(step = failure.step.as_str(), "Run failed: {}", failure.source),
    }
}

fn step_done(step: RunStep) {
    info!(step = step.as_str(), "Step completed");
    print_banner(step.success_banner());
}

/// Run one pipeline with the given collaborators
pub async fn run_pipeline<S>(
    store: &S,
    renderer: &dyn PageRenderer,
    ocr: &dyn OcrEngine,
    sources: &SourcePaths,
    rules: &TransformRules,
) -> Result<RunSummary, RunFailure>
where
    S: Storage + ?Sized,
{
    EtlPipeline::new(sources.clone(), rules.clone(), renderer, ocr)
        .run(store)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_run_in_fixed_order() {
        let names: Vec<&str> = RunStep::ALL.iter().map(RunStep::as_str).collect();
        assert_eq!(
            names,
            vec![
                "verify_store",
                "extract_records",
                "extract_document",
                "transform_and_load",
                "purge_staging",
            ]
        );
    }

    #[test]
    fn test_failure_message_names_step() {
        let failure = RunFailure::new(
            RunStep::ExtractRecords,
            EtlError::MissingField("record 0: timestamp".to_string()),
        );
        assert_eq!(
            failure.to_string(),
            "Crime records extraction failed: Missing required field: record 0: timestamp"
        );
        assert!(std::error::Error::source(&failure).is_some());
    }

    #[test]
    fn test_failed_run_is_counted() {
        crate::metrics::init_metrics();
        let failure = RunFailure::new(
            RunStep::VerifyStore,
            EtlError::Connectivity("connection refused".to_string()),
        );

        record_failed_run(&failure, None, 0.25);

        let rendered = crate::metrics::render().unwrap_or_default();
        let line = rendered
            .lines()
            .find(|line| line.starts_with("etl_load_runs_total") && line.contains("failure"));
        assert!(line.is_some(), "missing failure counter in:\n{rendered}");
    }
}
