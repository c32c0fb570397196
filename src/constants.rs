/// Input locations, store identifiers and fixed collaborator references.
/// Everything here is a name the pipeline and its adapters must agree on.

// Default raw inputs (relative to the working directory)
pub const CRIME_RECORDS_PATH: &str = "data/crime_records.json";
pub const DISTRICT_DOCUMENT_PATH: &str = "data/district_info.pdf";

// Staging tables
pub const RAW_CRIME_TABLE: &str = "staging.raw_crime_data";
pub const RAW_DISTRICT_TABLE: &str = "staging.raw_district_data";

// Core table
pub const TRANSFORMED_CRIME_TABLE: &str = "core.transformed_crime_data";

// Connection environment
pub const ENV_DB_USER: &str = "POSTGRES_USER";
pub const ENV_DB_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const ENV_DB_NAME: &str = "POSTGRES_DB";
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;

// Optional rule extensions and metrics output
pub const ENV_RULES_FILE: &str = "ETL_RULES_FILE";
pub const DEFAULT_RULES_FILE: &str = "etl_rules.toml";
pub const ENV_METRICS_TEXTFILE: &str = "ETL_METRICS_TEXTFILE";

// OCR collaborators (fixed, not configurable at runtime)
pub const TESSERACT_CMD: &str = "tesseract";
pub const PDFTOPPM_CMD: &str = "pdftoppm";
pub const PDFINFO_CMD: &str = "pdfinfo";
pub const RENDER_DPI: u32 = 300;

// Transform defaults
pub const MILES_TO_KM: f64 = 1.60934;
pub const DISTRICT_PLACEHOLDER: &str = "District";

/// Spelling fixes applied to `crime_type` before capitalization.
pub fn default_crime_corrections() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Assult", "assault"),
        ("Frued", "fraud"),
        ("cybercrime", "cyber crime"),
    ]
}

pub const BANNER_RULE_WIDTH: usize = 80;
