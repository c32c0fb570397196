//! Transform engine: staging rows to the canonical core table.
//!
//! Stages A to C (crime cleaning, district cleaning, join) run entirely in
//! memory. Stage D replaces the core table in one transaction, so a failure in
//! any earlier stage leaves the previous core content untouched. Stage E, the
//! staging purge, is a separate run step (see [`purge_staging`]).

pub mod crime;
pub mod district;
pub mod join;

pub use crime::{
    canonical_crime_type, capitalize, clean_crime_rows, decompose_timestamp,
    normalize_distance_km, CleanedCrime, TimestampParts,
};
pub use district::{clean_district_rows, strip_placeholders, CleanedDistrict};
pub use join::{join_crimes_with_districts, JoinOutcome};

use crate::config::TransformRules;
use crate::domain::{CanonicalCrimeRecord, KeyedRow, StagedCrimeRecord, StagedDistrictRecord};
use crate::error::Result;
use crate::metrics::{phase_metric, time_operation, LoadMetrics, TransformMetrics};
use crate::storage::{StagingStore, Storage};
use serde::Serialize;
use tracing::{debug, info, instrument};

const STAGE_HISTOGRAM: &str = phase_metric!(histogram, "transform", "stage_duration_seconds");

/// Row counts for one transform-and-load pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub crime_rows_read: usize,
    pub crime_rows_dropped: usize,
    pub district_rows_read: usize,
    pub rows_joined: usize,
    pub unmatched_crime_rows: usize,
    pub rows_loaded: u64,
}

/// Runs Stages A to D with a fixed set of cleaning rules
pub struct TransformEngine {
    rules: TransformRules,
}

impl TransformEngine {
    pub fn new(rules: TransformRules) -> Self {
        Self { rules }
    }

    /// Stages A to C over already-fetched staging rows
    pub fn transform(
        &self,
        crimes: &[KeyedRow<StagedCrimeRecord>],
        districts: &[KeyedRow<StagedDistrictRecord>],
    ) -> Result<(Vec<CanonicalCrimeRecord>, TransformReport)> {
        let cleaning = {
            let _timer = time_operation(STAGE_HISTOGRAM).with_step("clean_crime");
            clean_crime_rows(crimes, &self.rules)?
        };
        TransformMetrics::record_dropped(cleaning.dropped);

        let cleaned_districts = {
            let _timer = time_operation(STAGE_HISTOGRAM).with_step("clean_district");
            clean_district_rows(districts, &self.rules)
        };

        let outcome = {
            let _timer = time_operation(STAGE_HISTOGRAM).with_step("join");
            join_crimes_with_districts(&cleaning.rows, &cleaned_districts)
        };
        TransformMetrics::record_join(outcome.rows.len(), outcome.unmatched_crimes);

        if outcome.unmatched_crimes > 0 {
            debug!(
                "{} cleaned crime rows had no matching district",
                outcome.unmatched_crimes
            );
        }

        let report = TransformReport {
            crime_rows_read: crimes.len(),
            crime_rows_dropped: cleaning.dropped,
            district_rows_read: districts.len(),
            rows_joined: outcome.rows.len(),
            unmatched_crime_rows: outcome.unmatched_crimes,
            rows_loaded: 0,
        };
        Ok((outcome.rows, report))
    }

    /// Read staging, transform in memory, then replace the core table
    #[instrument(skip(self, store))]
    pub async fn transform_and_load<S>(&self, store: &S) -> Result<TransformReport>
    where
        S: Storage + ?Sized,
    {
        let crimes = store.fetch_raw_crime().await?;
        let districts = store.fetch_raw_districts().await?;
        debug!(
            "Read {} crime and {} district staging rows",
            crimes.len(),
            districts.len()
        );

        let (rows, mut report) = self.transform(&crimes, &districts)?;

        let loaded = {
            let _timer = time_operation(STAGE_HISTOGRAM).with_step("load");
            store.replace_core(&rows).await?
        };
        LoadMetrics::record_core_rows(loaded);
        report.rows_loaded = loaded;

        info!(
            crime_rows_read = report.crime_rows_read,
            crime_rows_dropped = report.crime_rows_dropped,
            district_rows_read = report.district_rows_read,
            rows_joined = report.rows_joined,
            rows_loaded = report.rows_loaded,
            "Core table replaced"
        );
        Ok(report)
    }
}

/// Convenience wrapper over [`TransformEngine::transform_and_load`]
pub async fn transform_and_load<S>(store: &S, rules: &TransformRules) -> Result<TransformReport>
where
    S: Storage + ?Sized,
{
    TransformEngine::new(rules.clone())
        .transform_and_load(store)
        .await
}

/// Stage E: empty both staging tables and restart their identity counters
#[instrument(skip(store))]
pub async fn purge_staging<S>(store: &S) -> Result<()>
where
    S: StagingStore + ?Sized,
{
    store.truncate_staging().await?;
    LoadMetrics::record_staging_purge();
    info!("Staging tables purged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::storage::{CoreStore, InMemoryStorage};
    use chrono::{NaiveDate, NaiveTime};

    fn crime(district_id: i64, timestamp: &str, crime_type: Option<&str>, distance: &str) -> StagedCrimeRecord {
        StagedCrimeRecord {
            district_id,
            timestamp: timestamp.to_string(),
            crime_type: crime_type.map(str::to_string),
            nearest_patrol_distance: distance.to_string(),
        }
    }

    fn district(district_id: i64, name: &str, population: i64, governor: &str) -> StagedDistrictRecord {
        StagedDistrictRecord {
            district_id,
            district_name: name.to_string(),
            population,
            governor: governor.to_string(),
        }
    }

    async fn seeded_store() -> InMemoryStorage {
        let store = InMemoryStorage::new();
        store
            .insert_raw_crime(&[
                crime(1, "2024-01-01T10:00:00", Some("Assult"), "1 mile"),
                crime(2, "2024-03-14T15:30:00", Some("cybercrime"), "5 km"),
                crime(1, "2024-01-02T08:00:00", None, "2"),
                crime(3, "2024-01-03T09:00:00", Some("Theft"), "2 miles"),
            ])
            .await
            .unwrap();
        store
            .insert_raw_districts(&[
                district(1, "District Alpha", 10000, "District Smith"),
                district(2, "Beta", 2500, "Jane Doe"),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_end_to_end_canonical_row() {
        let store = InMemoryStorage::new();
        store
            .insert_raw_crime(&[crime(1, "2024-01-01T10:00:00", Some("Assult"), "1 mile")])
            .await
            .unwrap();
        store
            .insert_raw_districts(&[district(1, "District Alpha", 10000, "District Smith")])
            .await
            .unwrap();

        let report = transform_and_load(&store, &TransformRules::default())
            .await
            .unwrap();
        assert_eq!(report.rows_loaded, 1);

        let core = store.fetch_core().await.unwrap();
        assert_eq!(core.len(), 1);
        assert_eq!(core[0].id, 1);

        let row = &core[0].record;
        assert_eq!(row.district_id, 1);
        assert_eq!(row.day_of_week, "Monday");
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(row.time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(row.crime_type, "Assault");
        assert!((row.nearest_patrol_distance_km - 1.60934).abs() < 1e-9);
        assert_eq!(row.district_name, "Alpha");
        assert_eq!(row.population, 10000);
        assert_eq!(row.governor, "Smith");
    }

    #[tokio::test]
    async fn test_report_counts() {
        let store = seeded_store().await;
        let report = transform_and_load(&store, &TransformRules::default())
            .await
            .unwrap();

        assert_eq!(
            report,
            TransformReport {
                crime_rows_read: 4,
                crime_rows_dropped: 1,
                district_rows_read: 2,
                rows_joined: 2,
                unmatched_crime_rows: 1,
                rows_loaded: 2,
            }
        );

        let core = store.fetch_core().await.unwrap();
        let types: Vec<&str> = core.iter().map(|r| r.record.crime_type.as_str()).collect();
        assert_eq!(types, vec!["Assault", "Cyber crime"]);
        assert_eq!(core[1].record.day_of_week, "Thursday");
        assert_eq!(core[1].record.nearest_patrol_distance_km, 5.0);
    }

    #[tokio::test]
    async fn test_reload_is_idempotent() {
        let store = seeded_store().await;
        let engine = TransformEngine::new(TransformRules::default());

        engine.transform_and_load(&store).await.unwrap();
        let first = store.fetch_core().await.unwrap();
        engine.transform_and_load(&store).await.unwrap();
        let second = store.fetch_core().await.unwrap();

        assert_eq!(first, second);
        let ids: Vec<i64> = second.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_transform_failure_keeps_previous_core() {
        let store = seeded_store().await;
        transform_and_load(&store, &TransformRules::default())
            .await
            .unwrap();
        let before = store.fetch_core().await.unwrap();

        store
            .insert_raw_crime(&[crime(1, "not a time", Some("Theft"), "1")])
            .await
            .unwrap();
        let result = transform_and_load(&store, &TransformRules::default()).await;

        assert!(matches!(result, Err(EtlError::Transform { .. })));
        assert_eq!(store.fetch_core().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_load_failure_rolls_back() {
        let store = seeded_store().await;
        transform_and_load(&store, &TransformRules::default())
            .await
            .unwrap();
        let before = store.fetch_core().await.unwrap();

        store.fail_next_core_load_at(1).unwrap();
        let result = transform_and_load(&store, &TransformRules::default()).await;

        assert!(matches!(result, Err(EtlError::Database { .. })));
        assert_eq!(store.fetch_core().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_duplicate_district_keys_cross_join() {
        let store = InMemoryStorage::new();
        store
            .insert_raw_crime(&[
                crime(1, "2024-01-01T10:00:00", Some("Theft"), "1"),
                crime(1, "2024-01-01T11:00:00", Some("Fraud"), "1"),
            ])
            .await
            .unwrap();
        store
            .insert_raw_districts(&[
                district(1, "Alpha", 100, "Smith"),
                district(1, "Alpha", 100, "Jones"),
            ])
            .await
            .unwrap();

        let report = transform_and_load(&store, &TransformRules::default())
            .await
            .unwrap();
        assert_eq!(report.rows_loaded, 4);
    }

    #[tokio::test]
    async fn test_empty_staging_empties_core() {
        let store = seeded_store().await;
        transform_and_load(&store, &TransformRules::default())
            .await
            .unwrap();
        purge_staging(&store).await.unwrap();

        let report = transform_and_load(&store, &TransformRules::default())
            .await
            .unwrap();
        assert_eq!(report, TransformReport::default());
        assert!(store.fetch_core().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_restarts_staging_identity() {
        let store = seeded_store().await;
        purge_staging(&store).await.unwrap();
        assert!(store.fetch_raw_crime().await.unwrap().is_empty());
        assert!(store.fetch_raw_districts().await.unwrap().is_empty());

        store
            .insert_raw_districts(&[district(5, "Gamma", 1, "Lee")])
            .await
            .unwrap();
        assert_eq!(store.fetch_raw_districts().await.unwrap()[0].id, 1);
    }
}
