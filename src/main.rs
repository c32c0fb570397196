use anyhow::Context;
use clap::Parser;
use crime_etl::config::EtlConfig;
use crime_etl::logging;
use crime_etl::metrics;
use crime_etl::pipeline::extract::{PdftoppmRenderer, TesseractOcr};
use crime_etl::pipeline::{record_failed_run, EtlPipeline, RunFailure, RunStep};
use crime_etl::storage::PostgresStorage;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "crime_etl")]
#[command(about = "Stage crime records and district data, then load the joined core table")]
#[command(version)]
struct Cli {}

async fn run(config: EtlConfig) -> Result<(), RunFailure> {
    let started = Instant::now();
    let store = match PostgresStorage::connect(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            // The pipeline never started, so no run id exists yet
            let failure = RunFailure::new(RunStep::VerifyStore, e);
            record_failed_run(&failure, None, started.elapsed().as_secs_f64());
            return Err(failure);
        }
    };

    let renderer = PdftoppmRenderer::from_settings(&config.ocr);
    let ocr = TesseractOcr::from_settings(&config.ocr);

    let pipeline = EtlPipeline::new(config.sources, config.rules, &renderer, &ocr);
    let summary = pipeline.run(&store).await?;
    info!(run_id = %summary.run_id, rows_loaded = summary.transform.rows_loaded, "Run finished");
    Ok(())
}

fn bootstrap() -> anyhow::Result<EtlConfig> {
    EtlConfig::load().context("Failed to load configuration")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _cli = Cli::parse();

    dotenv::dotenv().ok();
    let _guard = logging::init_logging();
    metrics::init_metrics();

    let config = match bootstrap() {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(database = ?config.database, "Configuration loaded");

    let outcome = run(config).await;
    metrics::write_textfile_from_env();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("❌ {failure}");
            ExitCode::FAILURE
        }
    }
}
