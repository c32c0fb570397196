//! Transform phase metrics

use crate::metrics::phase_metric;

pub struct TransformMetrics;

impl TransformMetrics {
    pub fn describe() {
        ::metrics::describe_counter!(
            phase_metric!(counter, "transform", "crime_rows_dropped"),
            "Crime rows dropped for a null or blank crime_type"
        );
        ::metrics::describe_counter!(
            phase_metric!(counter, "transform", "corrections_applied"),
            "crime_type values rewritten by the corrections table"
        );
        ::metrics::describe_counter!(
            phase_metric!(counter, "transform", "rows_joined"),
            "Rows produced by the district join"
        );
        ::metrics::describe_counter!(
            phase_metric!(counter, "transform", "crime_rows_unmatched"),
            "Cleaned crime rows with no district match"
        );
        ::metrics::describe_histogram!(
            phase_metric!(histogram, "transform", "stage_duration_seconds"),
            "Wall time per transform stage"
        );
    }

    pub fn record_dropped(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "transform", "crime_rows_dropped"))
            .increment(count as u64);
    }

    pub fn record_correction() {
        ::metrics::counter!(phase_metric!(counter, "transform", "corrections_applied")).increment(1);
    }

    pub fn record_join(joined: usize, unmatched_crimes: usize) {
        ::metrics::counter!(phase_metric!(counter, "transform", "rows_joined"))
            .increment(joined as u64);
        ::metrics::counter!(phase_metric!(counter, "transform", "crime_rows_unmatched"))
            .increment(unmatched_crimes as u64);
    }
}
