use crate::domain::{CanonicalCrimeRecord, KeyedRow, StagedCrimeRecord, StagedDistrictRecord};
use crate::error::Result;
use async_trait::async_trait;

/// Holding area for raw rows extracted from both sources
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Confirm the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Insert one file's crime records as a single atomic batch
    async fn insert_raw_crime(&self, rows: &[StagedCrimeRecord]) -> Result<u64>;
    /// Insert one document's district rows as a single atomic batch
    async fn insert_raw_districts(&self, rows: &[StagedDistrictRecord]) -> Result<u64>;

    // Reads return rows in identity order
    async fn fetch_raw_crime(&self) -> Result<Vec<KeyedRow<StagedCrimeRecord>>>;
    async fn fetch_raw_districts(&self) -> Result<Vec<KeyedRow<StagedDistrictRecord>>>;

    /// Purge both staging tables and restart their identity counters
    async fn truncate_staging(&self) -> Result<()>;
}

/// Destination for canonical rows
#[async_trait]
pub trait CoreStore: Send + Sync {
    /// Reset the core table (rows and identity) and load `rows`, all or nothing
    async fn replace_core(&self, rows: &[CanonicalCrimeRecord]) -> Result<u64>;

    async fn fetch_core(&self) -> Result<Vec<KeyedRow<CanonicalCrimeRecord>>>;
}

/// A store serving both the staging and core tables
pub trait Storage: StagingStore + CoreStore {}

impl<T: StagingStore + CoreStore + ?Sized> Storage for T {}
