use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One observed incident as extracted from the structured feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedCrimeRecord {
    pub district_id: i64,
    /// Source-reported timestamp text; parsed during transform
    pub timestamp: String,
    pub crime_type: Option<String>,
    /// Distance text, e.g. "3.2 miles" or "5" (kilometers)
    pub nearest_patrol_distance: String,
}

/// One district descriptor recovered from the scanned document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedDistrictRecord {
    pub district_id: i64,
    pub district_name: String,
    pub population: i64,
    pub governor: String,
}

/// A stored record together with the identity key its table assigned it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRow<T> {
    pub id: i64,
    pub record: T,
}

impl<T> KeyedRow<T> {
    pub fn new(id: i64, record: T) -> Self {
        Self { id, record }
    }
}

/// A joined, cleaned output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCrimeRecord {
    pub district_id: i64,
    pub day_of_week: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub crime_type: String,
    pub nearest_patrol_distance_km: f64,
    pub district_name: String,
    pub population: i64,
    pub governor: String,
}
