use crate::domain::StagedCrimeRecord;
use crate::error::{EtlError, Result};
use crate::metrics::ExtractMetrics;
use crate::storage::StagingStore;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Parse a JSON array of crime records into staging rows.
///
/// Every record must carry `district_id`, `timestamp`, `crime_type` and
/// `nearest_police_patrol`; the first malformed record fails the whole batch.
pub fn parse_crime_records(json: &str) -> Result<Vec<StagedCrimeRecord>> {
    let value: Value = serde_json::from_str(json)?;
    let records = value.as_array().ok_or_else(|| {
        EtlError::extraction("crime records file must contain a JSON array")
    })?;

    records
        .iter()
        .enumerate()
        .map(|(index, record)| map_record(index, record))
        .collect()
}

fn map_record(index: usize, record: &Value) -> Result<StagedCrimeRecord> {
    let object = record.as_object().ok_or_else(|| {
        EtlError::extraction(format!("record {index} is not a JSON object"))
    })?;

    let field = |name: &str| {
        object
            .get(name)
            .ok_or_else(|| EtlError::MissingField(format!("record {index}: {name}")))
    };

    let district_id = field("district_id")?.as_i64().ok_or_else(|| {
        EtlError::extraction(format!("record {index}: district_id must be an integer"))
    })?;

    let timestamp = field("timestamp")?
        .as_str()
        .ok_or_else(|| EtlError::extraction(format!("record {index}: timestamp must be a string")))?
        .to_string();

    let crime_type = match field("crime_type")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => {
            return Err(EtlError::extraction(format!(
                "record {index}: crime_type must be a string or null, got {other}"
            )))
        }
    };

    // Plain numbers are accepted and staged in their textual form
    let nearest_patrol_distance = match field("nearest_police_patrol")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(EtlError::extraction(format!(
                "record {index}: nearest_police_patrol must be a string, got {other}"
            )))
        }
    };

    Ok(StagedCrimeRecord {
        district_id,
        timestamp,
        crime_type,
        nearest_patrol_distance,
    })
}

/// Read the structured feed at `path` and stage it as one atomic batch
#[instrument(skip(store, path), fields(path = %path.display()))]
pub async fn extract_crime_records<S>(store: &S, path: &Path) -> Result<u64>
where
    S: StagingStore + ?Sized,
{
    let content = fs::read_to_string(path)?;
    let records = parse_crime_records(&content)?;
    debug!("Parsed {} crime records", records.len());

    let inserted = store.insert_raw_crime(&records).await?;
    ExtractMetrics::record_crime_rows(records.len());
    info!("Staged {} crime records", inserted);
    Ok(inserted)
}
