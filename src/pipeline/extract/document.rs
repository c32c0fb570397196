use super::ocr::{OcrEngine, PageRenderer};
use crate::domain::StagedDistrictRecord;
use crate::error::{EtlError, Result};
use crate::metrics::ExtractMetrics;
use crate::storage::StagingStore;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, instrument};

static WHITESPACE_OR_PIPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s|]+").expect("whitespace pattern is valid"));

/// Collapse every run of whitespace and/or `|` characters into one space.
/// Table rules in the scan come through as pipes; leading/trailing runs are kept as a single space.
pub fn normalize_ocr_text(text: &str) -> String {
    WHITESPACE_OR_PIPE.replace_all(text, " ").into_owned()
}

/// One quantified character class in the row pattern
struct Element {
    class: fn(char) -> bool,
    min: usize,
    greedy: bool,
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_space(c: char) -> bool {
    c.is_whitespace()
}

fn is_district_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == ' ' || c == '/' || c == '-'
}

fn is_population_char(c: char) -> bool {
    c.is_ascii_digit() || c == ','
}

fn is_governor_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == ' ' || c == '-'
}

// <id> WS <district, lazy> WS <population> WS <governor, 3+>
const DISTRICT_ROW: [Element; 7] = [
    Element { class: is_digit, min: 1, greedy: true },
    Element { class: is_space, min: 1, greedy: true },
    Element { class: is_district_char, min: 1, greedy: false },
    Element { class: is_space, min: 1, greedy: true },
    Element { class: is_population_char, min: 1, greedy: true },
    Element { class: is_space, min: 1, greedy: true },
    Element { class: is_governor_char, min: 3, greedy: true },
];

// Indexes of the captured elements within DISTRICT_ROW
const ID_SPAN: usize = 0;
const DISTRICT_SPAN: usize = 2;
const POPULATION_SPAN: usize = 4;
const GOVERNOR_SPAN: usize = 6;

fn run_length(chars: &[char], from: usize, class: fn(char) -> bool) -> usize {
    chars[from..].iter().take_while(|&&c| class(c)).count()
}

/// Backtracking match of `elements` starting at `pos`.
/// Greedy elements try their longest run first, lazy ones their shortest,
/// and a failed continuation falls back to the next candidate length.
fn match_elements(
    chars: &[char],
    elements: &[Element],
    pos: usize,
    spans: &mut Vec<(usize, usize)>,
) -> Option<usize> {
    let Some((element, rest)) = elements.split_first() else {
        return Some(pos);
    };

    let max = run_length(chars, pos, element.class);
    if max < element.min {
        return None;
    }

    let lengths: Box<dyn Iterator<Item = usize>> = if element.greedy {
        Box::new((element.min..=max).rev())
    } else {
        Box::new(element.min..=max)
    };

    for len in lengths {
        spans.push((pos, pos + len));
        if let Some(end) = match_elements(chars, rest, pos + len, spans) {
            return Some(end);
        }
        spans.pop();
    }
    None
}

/// Find every non-overlapping district row in normalized OCR text, scanning left to right
pub fn match_district_rows(text: &str) -> Result<Vec<StagedDistrictRecord>> {
    let chars: Vec<char> = text.chars().collect();
    let mut rows = Vec::new();
    let mut pos = 0;
    let mut spans = Vec::with_capacity(DISTRICT_ROW.len());

    while pos < chars.len() {
        spans.clear();
        match match_elements(&chars, &DISTRICT_ROW, pos, &mut spans) {
            Some(end) => {
                rows.push(build_row(&chars, &spans)?);
                pos = end;
            }
            None => pos += 1,
        }
    }

    Ok(rows)
}

fn span_text(chars: &[char], span: (usize, usize)) -> String {
    chars[span.0..span.1].iter().collect()
}

fn build_row(chars: &[char], spans: &[(usize, usize)]) -> Result<StagedDistrictRecord> {
    let id_text = span_text(chars, spans[ID_SPAN]);
    let district_id = id_text.parse::<i64>().map_err(|e| {
        EtlError::extraction(format!("district id '{id_text}' is not a valid integer: {e}"))
    })?;

    let population_text = span_text(chars, spans[POPULATION_SPAN]);
    let digits: String = population_text.chars().filter(|&c| c != ',').collect();
    let population = digits.parse::<i64>().map_err(|e| {
        EtlError::extraction(format!(
            "population '{population_text}' is not a valid integer: {e}"
        ))
    })?;

    Ok(StagedDistrictRecord {
        district_id,
        district_name: span_text(chars, spans[DISTRICT_SPAN]).trim().to_string(),
        population,
        governor: span_text(chars, spans[GOVERNOR_SPAN]).trim().to_string(),
    })
}

/// OCR the first page of the district document and stage every matched row.
///
/// No pages and no matches are soft outcomes that stage nothing; renderer, OCR
/// and I/O failures are errors.
#[instrument(skip(store, renderer, ocr, path), fields(path = %path.display()))]
pub async fn extract_district_document<S>(
    store: &S,
    renderer: &dyn PageRenderer,
    ocr: &dyn OcrEngine,
    path: &Path,
) -> Result<u64>
where
    S: StagingStore + ?Sized,
{
    // Surface a missing input as an I/O error rather than a renderer failure
    std::fs::metadata(path)?;

    let scratch = tempfile::tempdir()?;
    let Some(page) = renderer.render_first_page(path, scratch.path()).await? else {
        info!("No pages found in document");
        println!("No pages found in PDF.");
        ExtractMetrics::record_soft_empty("no_pages");
        return Ok(0);
    };

    let raw_text = ocr.image_to_string(&page).await?;
    ExtractMetrics::record_ocr_text(raw_text.len());
    debug!("OCR produced {} bytes of text", raw_text.len());

    let normalized = normalize_ocr_text(&raw_text);
    let rows = match_district_rows(&normalized)?;
    if rows.is_empty() {
        info!("No district rows matched in OCR text");
        println!("No valid data found in PDF.");
        ExtractMetrics::record_soft_empty("no_matches");
        return Ok(0);
    }

    let inserted = store.insert_raw_districts(&rows).await?;
    ExtractMetrics::record_district_rows(rows.len());
    info!("Staged {} district rows", inserted);
    Ok(inserted)
}
