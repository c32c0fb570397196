// Extraction: raw sources into staging rows

pub mod document;
pub mod ocr;
pub mod records;

pub use document::{extract_district_document, match_district_rows, normalize_ocr_text};
pub use ocr::{OcrEngine, PageRenderer, PdftoppmRenderer, TesseractOcr};
pub use records::{extract_crime_records, parse_crime_records};
