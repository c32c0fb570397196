//! Extraction phase metrics
//!
//! Rows staged from each raw source and OCR outcomes.

use crate::metrics::phase_metric;

pub struct ExtractMetrics;

impl ExtractMetrics {
    pub fn describe() {
        ::metrics::describe_counter!(
            phase_metric!(counter, "extract", "crime_rows_staged"),
            "Crime records written to staging"
        );
        ::metrics::describe_counter!(
            phase_metric!(counter, "extract", "district_rows_staged"),
            "District rows matched in the OCR text and written to staging"
        );
        ::metrics::describe_counter!(
            phase_metric!(counter, "extract", "document_soft_empty"),
            "Document extractions that produced no pages or no matches"
        );
        ::metrics::describe_histogram!(
            phase_metric!(histogram, "extract", "ocr_text_bytes"),
            "Size of the raw OCR text"
        );
    }

    pub fn record_crime_rows(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "extract", "crime_rows_staged"))
            .increment(count as u64);
    }

    pub fn record_district_rows(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "extract", "district_rows_staged"))
            .increment(count as u64);
    }

    /// `reason` is "no_pages" or "no_matches"
    pub fn record_soft_empty(reason: &'static str) {
        ::metrics::counter!(
            phase_metric!(counter, "extract", "document_soft_empty"),
            "reason" => reason
        )
        .increment(1);
    }

    pub fn record_ocr_text(bytes: usize) {
        ::metrics::histogram!(phase_metric!(histogram, "extract", "ocr_text_bytes"))
            .record(bytes as f64);
    }
}
