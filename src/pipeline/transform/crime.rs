//! Stage A: crime record cleaning.
//!
//! Runs as column-wise passes over the batch: drop blank crime types, correct
//! and capitalize them, convert distances to kilometers, then split timestamps.
//! The first unparseable distance or timestamp aborts the batch.

use crate::config::TransformRules;
use crate::domain::{KeyedRow, StagedCrimeRecord};
use crate::error::{EtlError, Result};
use crate::metrics::TransformMetrics;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

/// A crime row after Stage A, ready to join
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedCrime {
    pub district_id: i64,
    pub day_of_week: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub crime_type: String,
    pub nearest_patrol_distance_km: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrimeCleaning {
    pub rows: Vec<CleanedCrime>,
    pub dropped: usize,
}

/// Split of a source timestamp into its reporting columns
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampParts {
    pub day_of_week: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Titlecase form of `c`. Characters whose uppercase expands to several
/// (`ß`, `ﬁ`) keep only the first one uppercased.
fn titlecase(c: char) -> String {
    match c {
        'Ǆ' | 'ǅ' | 'ǆ' => "ǅ".to_string(),
        'Ǉ' | 'ǈ' | 'ǉ' => "ǈ".to_string(),
        'Ǌ' | 'ǋ' | 'ǌ' => "ǋ".to_string(),
        'Ǳ' | 'ǲ' | 'ǳ' => "ǲ".to_string(),
        _ => {
            let mut upper = c.to_uppercase();
            match upper.next() {
                Some(first) => std::iter::once(first)
                    .chain(upper.flat_map(char::to_lowercase))
                    .collect(),
                None => c.to_string(),
            }
        }
    }
}

/// Titlecase the first character and lowercase the rest
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => {
            let mut out = titlecase(first);
            out.extend(chars.flat_map(char::to_lowercase));
            out
        }
        None => String::new(),
    }
}

/// Apply the corrections table (exact match), then capitalize
pub fn canonical_crime_type(value: &str, rules: &TransformRules) -> String {
    match rules.corrections.get(value) {
        Some(corrected) => {
            TransformMetrics::record_correction();
            capitalize(corrected)
        }
        None => capitalize(value),
    }
}

/// Parse the leading token of a distance as kilometers.
/// Any "mile" in the text, in any case, marks the value as miles.
pub fn normalize_distance_km(text: &str, miles_to_km: f64) -> Result<f64> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| EtlError::transform(format!("empty patrol distance '{text}'")))?;

    let value = token.parse::<f64>().map_err(|e| {
        EtlError::transform(format!("patrol distance '{text}' is not numeric: {e}"))
    })?;

    if text.to_lowercase().contains("mile") {
        Ok(value * miles_to_km)
    } else {
        Ok(value)
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();

    // Offsets are dropped: reporting columns use the source's wall clock
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    // %#z takes "+02:00", "+0200" and the bare "+02" Postgres prints for timestamptz
    const OFFSET_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f%#z",
        "%Y-%m-%d %H:%M:%S%.f%#z",
        "%Y-%m-%dT%H:%M%#z",
        "%Y-%m-%d %H:%M%#z",
    ];
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Some(dt.naive_local());
        }
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

pub fn decompose_timestamp(text: &str) -> Result<TimestampParts> {
    let dt = parse_timestamp(text)
        .ok_or_else(|| EtlError::transform(format!("unparseable timestamp '{text}'")))?;

    Ok(TimestampParts {
        day_of_week: dt.format("%A").to_string(),
        date: dt.date(),
        time: dt.time(),
    })
}

/// Run every Stage A pass over the staged crime rows
pub fn clean_crime_rows(
    rows: &[KeyedRow<StagedCrimeRecord>],
    rules: &TransformRules,
) -> Result<CrimeCleaning> {
    // Pass 1: drop null or blank crime types
    let kept: Vec<(&KeyedRow<StagedCrimeRecord>, &str)> = rows
        .iter()
        .filter_map(|row| match row.record.crime_type.as_deref() {
            Some(crime_type) if !crime_type.trim().is_empty() => Some((row, crime_type)),
            _ => None,
        })
        .collect();
    let dropped = rows.len() - kept.len();
    if dropped > 0 {
        debug!("Dropped {} crime rows with a blank crime_type", dropped);
    }

    // Pass 2: corrections, then capitalization
    let crime_types: Vec<String> = kept
        .iter()
        .map(|(_, crime_type)| canonical_crime_type(crime_type, rules))
        .collect();

    // Pass 3: distances
    let distances = kept
        .iter()
        .map(|(row, _)| {
            normalize_distance_km(&row.record.nearest_patrol_distance, rules.miles_to_km)
                .map_err(|e| with_row_context(e, row.id))
        })
        .collect::<Result<Vec<f64>>>()?;

    // Pass 4: timestamps
    let parts = kept
        .iter()
        .map(|(row, _)| {
            decompose_timestamp(&row.record.timestamp).map_err(|e| with_row_context(e, row.id))
        })
        .collect::<Result<Vec<TimestampParts>>>()?;

    let cleaned = kept
        .iter()
        .zip(crime_types)
        .zip(distances)
        .zip(parts)
        .map(|((((row, _), crime_type), distance), parts)| CleanedCrime {
            district_id: row.record.district_id,
            day_of_week: parts.day_of_week,
            date: parts.date,
            time: parts.time,
            crime_type,
            nearest_patrol_distance_km: distance,
        })
        .collect();

    Ok(CrimeCleaning {
        rows: cleaned,
        dropped,
    })
}

fn with_row_context(err: EtlError, id: i64) -> EtlError {
    match err {
        EtlError::Transform { message } => {
            EtlError::transform(format!("raw_crime_data row {id}: {message}"))
        }
        other => other,
    }
}
