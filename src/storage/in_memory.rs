use super::traits::{CoreStore, StagingStore};
use crate::domain::{CanonicalCrimeRecord, KeyedRow, StagedCrimeRecord, StagedDistrictRecord};
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A table with a SERIAL-like identity counter
#[derive(Debug, Clone)]
struct Table<T> {
    rows: Vec<KeyedRow<T>>,
    next_id: i64,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn push(&mut self, record: T) {
        self.rows.push(KeyedRow::new(self.next_id, record));
        self.next_id += 1;
    }

    fn truncate_restart_identity(&mut self) {
        self.rows.clear();
        self.next_id = 1;
    }
}

#[derive(Debug)]
struct Tables {
    raw_crime: Table<StagedCrimeRecord>,
    raw_district: Table<StagedDistrictRecord>,
    core: Table<CanonicalCrimeRecord>,
}

/// In-memory storage implementation for development/testing
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
    unreachable: AtomicBool,
    fail_core_load_at: Mutex<Option<usize>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                raw_crime: Table::new(),
                raw_district: Table::new(),
                core: Table::new(),
            }),
            unreachable: AtomicBool::new(false),
            fail_core_load_at: Mutex::new(None),
        }
    }

    /// Make `ping` fail, as if the server were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make the next `replace_core` fail while inserting row `index` (0-based)
    pub fn fail_next_core_load_at(&self, index: usize) -> Result<()> {
        *lock(&self.fail_core_load_at)? = Some(index);
        Ok(())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        lock(&self.tables)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| EtlError::database("in-memory store lock poisoned"))
}

#[async_trait]
impl StagingStore for InMemoryStorage {
    async fn ping(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(EtlError::Connectivity(
                "in-memory store marked unreachable".to_string(),
            ));
        }
        Ok(())
    }

    async fn insert_raw_crime(&self, rows: &[StagedCrimeRecord]) -> Result<u64> {
        let mut tables = self.tables()?;
        for row in rows {
            tables.raw_crime.push(row.clone());
        }
        debug!("Staged {} crime rows in memory", rows.len());
        Ok(rows.len() as u64)
    }

    async fn insert_raw_districts(&self, rows: &[StagedDistrictRecord]) -> Result<u64> {
        let mut tables = self.tables()?;
        for row in rows {
            tables.raw_district.push(row.clone());
        }
        debug!("Staged {} district rows in memory", rows.len());
        Ok(rows.len() as u64)
    }

    async fn fetch_raw_crime(&self) -> Result<Vec<KeyedRow<StagedCrimeRecord>>> {
        Ok(self.tables()?.raw_crime.rows.clone())
    }

    async fn fetch_raw_districts(&self) -> Result<Vec<KeyedRow<StagedDistrictRecord>>> {
        Ok(self.tables()?.raw_district.rows.clone())
    }

    async fn truncate_staging(&self) -> Result<()> {
        let mut tables = self.tables()?;
        tables.raw_crime.truncate_restart_identity();
        tables.raw_district.truncate_restart_identity();
        debug!("Truncated in-memory staging tables");
        Ok(())
    }
}

#[async_trait]
impl CoreStore for InMemoryStorage {
    async fn replace_core(&self, rows: &[CanonicalCrimeRecord]) -> Result<u64> {
        let fail_at = lock(&self.fail_core_load_at)?.take();

        // Build the replacement off to the side; the live table is swapped only on success
        let mut replacement = Table::new();
        for (index, row) in rows.iter().enumerate() {
            if fail_at == Some(index) {
                return Err(EtlError::database(format!(
                    "simulated failure inserting core row {index}"
                )));
            }
            replacement.push(row.clone());
        }

        self.tables()?.core = replacement;
        debug!("Replaced in-memory core table with {} rows", rows.len());
        Ok(rows.len() as u64)
    }

    async fn fetch_core(&self) -> Result<Vec<KeyedRow<CanonicalCrimeRecord>>> {
        Ok(self.tables()?.core.rows.clone())
    }
}
