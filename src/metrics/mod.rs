//! Metrics infrastructure for the ETL run
//!
//! Each pipeline phase owns a small metrics struct in its own submodule.
//! The recorder is a Prometheus one without an HTTP listener: a run is a
//! short-lived batch job, so the snapshot is rendered in-process and, when
//! configured, written to a textfile for a node-exporter style collector.

pub mod core;
pub mod extract;
pub mod load;
pub mod transform;

pub use self::core::{time_operation, TimingGuard};
pub use extract::ExtractMetrics;
pub use load::LoadMetrics;
pub use transform::TransformMetrics;

use crate::constants;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::{debug, info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Macro to create phase-specific metric names with consistent naming
///
/// All metrics follow the convention: etl_{phase}_{metric_name}[_total]
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

/// Install the global recorder. Idempotent; failures only log.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Metrics handle was already set");
            }
            ExtractMetrics::describe();
            TransformMetrics::describe();
            LoadMetrics::describe();
            debug!("Prometheus recorder installed");
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
        }
    });
}

/// Render the current snapshot, if a recorder was installed
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Write the snapshot to `ETL_METRICS_TEXTFILE` when that variable is set.
/// Never fails the run.
pub fn write_textfile_from_env() {
    let path = match std::env::var(constants::ENV_METRICS_TEXTFILE) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return,
    };
    write_textfile(Path::new(&path));
}

pub fn write_textfile(path: &Path) {
    let Some(body) = render() else {
        debug!("No metrics recorder installed, skipping textfile");
        return;
    };

    // Write-then-rename so a collector never reads a half-written file
    let tmp = path.with_extension("prom.tmp");
    let result = std::fs::write(&tmp, body).and_then(|_| std::fs::rename(&tmp, path));
    match result {
        Ok(()) => info!("Wrote metrics snapshot to {}", path.display()),
        Err(e) => warn!("Failed to write metrics snapshot to {}: {}", path.display(), e),
    }
}
