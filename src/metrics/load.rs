//! Load and cleanup phase metrics

use crate::metrics::phase_metric;

pub struct LoadMetrics;

impl LoadMetrics {
    pub fn describe() {
        ::metrics::describe_counter!(
            phase_metric!(counter, "load", "core_rows_loaded"),
            "Canonical rows committed to the core table"
        );
        ::metrics::describe_counter!(
            phase_metric!(counter, "load", "staging_purges"),
            "Successful staging purges"
        );
        ::metrics::describe_counter!(
            phase_metric!(counter, "load", "runs"),
            "Completed pipeline runs by outcome"
        );
        ::metrics::describe_histogram!(
            phase_metric!(histogram, "load", "run_duration_seconds"),
            "Wall time of one pipeline run"
        );
    }

    pub fn record_core_rows(count: u64) {
        ::metrics::counter!(phase_metric!(counter, "load", "core_rows_loaded")).increment(count);
    }

    pub fn record_staging_purge() {
        ::metrics::counter!(phase_metric!(counter, "load", "staging_purges")).increment(1);
    }

    /// `outcome` is "success" or "failure"
    pub fn record_run(outcome: &'static str, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "load", "runs"), "outcome" => outcome)
            .increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "load", "run_duration_seconds"))
            .record(duration_secs);
    }
}
