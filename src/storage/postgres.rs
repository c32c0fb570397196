use super::traits::{CoreStore, StagingStore};
use crate::config::DatabaseConfig;
use crate::constants::{RAW_CRIME_TABLE, RAW_DISTRICT_TABLE, TRANSFORMED_CRIME_TABLE};
use crate::domain::{CanonicalCrimeRecord, KeyedRow, StagedCrimeRecord, StagedDistrictRecord};
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA_SQL: &str = include_str!("../../migrations/001_create_etl_tables.sql");

/// PostgreSQL-backed staging and core store.
///
/// Single-connection pool: one run at a time, every stage awaited in sequence.
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect and make sure the staging/core tables exist
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            "Connecting to PostgreSQL at {}:{}/{}",
            config.host, config.port, config.database
        );

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| EtlError::Connectivity(format!("Failed to connect to database: {e}")))?;

        let storage = Self { pool };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| EtlError::database(format!("Failed to create ETL tables: {e}")))?;
        debug!("ETL tables present");
        Ok(())
    }
}

#[async_trait]
impl StagingStore for PostgresStorage {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| EtlError::Connectivity(format!("Database ping failed: {e}")))?;
        Ok(())
    }

    async fn insert_raw_crime(&self, rows: &[StagedCrimeRecord]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT INTO {RAW_CRIME_TABLE} \
             (district_id, \"timestamp\", crime_type, nearest_police_patrol) \
             VALUES ($1, $2, $3, $4)"
        );

        let mut tx = self.pool.begin().await?;
        let mut affected = 0u64;
        for row in rows {
            let result = sqlx::query(&sql)
                .bind(row.district_id)
                .bind(&row.timestamp)
                .bind(&row.crime_type)
                .bind(&row.nearest_patrol_distance)
                .execute(&mut *tx)
                .await
                .map_err(|e| EtlError::database(format!("raw_crime_data insert failed: {e}")))?;
            affected = affected.saturating_add(result.rows_affected());
        }
        tx.commit().await?;

        Ok(affected)
    }

    async fn insert_raw_districts(&self, rows: &[StagedDistrictRecord]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT INTO {RAW_DISTRICT_TABLE} (district_id, district, population, governor) \
             VALUES ($1, $2, $3, $4)"
        );

        let mut tx = self.pool.begin().await?;
        let mut affected = 0u64;
        for row in rows {
            let result = sqlx::query(&sql)
                .bind(row.district_id)
                .bind(&row.district_name)
                .bind(row.population)
                .bind(&row.governor)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    EtlError::database(format!("raw_district_data insert failed: {e}"))
                })?;
            affected = affected.saturating_add(result.rows_affected());
        }
        tx.commit().await?;

        Ok(affected)
    }

    async fn fetch_raw_crime(&self) -> Result<Vec<KeyedRow<StagedCrimeRecord>>> {
        let sql = format!(
            "SELECT id::BIGINT AS id, district_id::BIGINT AS district_id, \
             \"timestamp\"::TEXT AS \"timestamp\", crime_type::TEXT AS crime_type, \
             nearest_police_patrol::TEXT AS nearest_police_patrol \
             FROM {RAW_CRIME_TABLE} ORDER BY id"
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EtlError::database(format!("raw_crime_data read failed: {e}")))?;

        rows.into_iter().map(map_raw_crime_row).collect()
    }

    async fn fetch_raw_districts(&self) -> Result<Vec<KeyedRow<StagedDistrictRecord>>> {
        let sql = format!(
            "SELECT id::BIGINT AS id, district_id::BIGINT AS district_id, district, \
             population::BIGINT AS population, governor \
             FROM {RAW_DISTRICT_TABLE} ORDER BY id"
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EtlError::database(format!("raw_district_data read failed: {e}")))?;

        rows.into_iter().map(map_raw_district_row).collect()
    }

    async fn truncate_staging(&self) -> Result<()> {
        let sql = format!("TRUNCATE TABLE {RAW_CRIME_TABLE}, {RAW_DISTRICT_TABLE} RESTART IDENTITY");

        let mut tx = self.pool.begin().await?;
        sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::database(format!("staging truncate failed: {e}")))?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CoreStore for PostgresStorage {
    async fn replace_core(&self, rows: &[CanonicalCrimeRecord]) -> Result<u64> {
        let reset_sql = format!("TRUNCATE TABLE {TRANSFORMED_CRIME_TABLE} RESTART IDENTITY");
        let insert_sql = format!(
            "INSERT INTO {TRANSFORMED_CRIME_TABLE} \
             (district_id, day_of_week, date, time, crime_type, nearest_patrol_distance_km, \
              district_name, population, governor) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        );

        // Dropping `tx` on any early return rolls the truncate back
        let mut tx = self.pool.begin().await?;

        sqlx::query(&reset_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::database(format!("core table reset failed: {e}")))?;

        let mut affected = 0u64;
        for row in rows {
            let result = sqlx::query(&insert_sql)
                .bind(row.district_id)
                .bind(&row.day_of_week)
                .bind(row.date)
                .bind(row.time)
                .bind(&row.crime_type)
                .bind(row.nearest_patrol_distance_km)
                .bind(&row.district_name)
                .bind(row.population)
                .bind(&row.governor)
                .execute(&mut *tx)
                .await
                .map_err(|e| EtlError::database(format!("core insert failed: {e}")))?;
            affected = affected.saturating_add(result.rows_affected());
        }

        tx.commit()
            .await
            .map_err(|e| EtlError::database(format!("core load commit failed: {e}")))?;
        Ok(affected)
    }

    async fn fetch_core(&self) -> Result<Vec<KeyedRow<CanonicalCrimeRecord>>> {
        let sql = format!(
            "SELECT id::BIGINT AS id, district_id::BIGINT AS district_id, day_of_week, date, time, \
             crime_type, nearest_patrol_distance_km, district_name, \
             population::BIGINT AS population, governor \
             FROM {TRANSFORMED_CRIME_TABLE} ORDER BY id"
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EtlError::database(format!("core read failed: {e}")))?;

        rows.into_iter().map(map_core_row).collect()
    }
}

fn column<'r, T>(row: &'r PgRow, table: &str, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<T, _>(name)
        .map_err(|e| EtlError::database(format!("{table}.{name} decode failed: {e}")))
}

fn map_raw_crime_row(row: PgRow) -> Result<KeyedRow<StagedCrimeRecord>> {
    let table = "raw_crime_data";
    Ok(KeyedRow::new(
        column::<i64>(&row, table, "id")?,
        StagedCrimeRecord {
            district_id: column::<i64>(&row, table, "district_id")?,
            timestamp: column::<String>(&row, table, "timestamp")?,
            crime_type: column::<Option<String>>(&row, table, "crime_type")?,
            nearest_patrol_distance: column::<String>(&row, table, "nearest_police_patrol")?,
        },
    ))
}

fn map_raw_district_row(row: PgRow) -> Result<KeyedRow<StagedDistrictRecord>> {
    let table = "raw_district_data";
    Ok(KeyedRow::new(
        column::<i64>(&row, table, "id")?,
        StagedDistrictRecord {
            district_id: column::<i64>(&row, table, "district_id")?,
            district_name: column::<String>(&row, table, "district")?,
            population: column::<i64>(&row, table, "population")?,
            governor: column::<String>(&row, table, "governor")?,
        },
    ))
}

fn map_core_row(row: PgRow) -> Result<KeyedRow<CanonicalCrimeRecord>> {
    let table = "transformed_crime_data";
    Ok(KeyedRow::new(
        column::<i64>(&row, table, "id")?,
        CanonicalCrimeRecord {
            district_id: column::<i64>(&row, table, "district_id")?,
            day_of_week: column::<String>(&row, table, "day_of_week")?,
            date: column::<NaiveDate>(&row, table, "date")?,
            time: column::<NaiveTime>(&row, table, "time")?,
            crime_type: column::<String>(&row, table, "crime_type")?,
            nearest_patrol_distance_km: column::<f64>(&row, table, "nearest_patrol_distance_km")?,
            district_name: column::<String>(&row, table, "district_name")?,
            population: column::<i64>(&row, table, "population")?,
            governor: column::<String>(&row, table, "governor")?,
        },
    ))
}
