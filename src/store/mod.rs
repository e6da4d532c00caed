//! SQLite persistence for countries and the refresh status singleton.

mod countries;
mod status;

use crate::core::country::{CountryRecord, RefreshStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info, instrument};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS countries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        name_key TEXT NOT NULL UNIQUE,
        capital TEXT,
        region TEXT,
        population INTEGER NOT NULL CHECK (population >= 0),
        currency_code TEXT,
        exchange_rate REAL,
        estimated_gdp REAL,
        flag_url TEXT,
        last_refreshed_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_countries_region ON countries (region)",
    "CREATE INDEX IF NOT EXISTS idx_countries_currency ON countries (currency_code)",
    r#"CREATE TABLE IF NOT EXISTS refresh_status (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        total_countries INTEGER NOT NULL DEFAULT 0,
        last_refreshed_at TEXT NOT NULL
    )"#,
];

/// Handle to the country database. Cheap to clone; clones share one pool.
#[derive(Clone)]
pub struct CountryStore {
    pool: SqlitePool,
}

impl CountryStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {url}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {url}"))?;

        let store = Self { pool };
        store.migrate().await?;
        info!("Database connected successfully");
        Ok(store)
    }

    /// A private in-memory database, mostly for tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection to :memory: is its own database, so pin the pool to one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply database schema")?;
        }
        debug!("Database schema is up to date");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    /// Upserts every record and the status singleton in one transaction.
    /// Either all of it is committed or none of it is.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn replace_countries(
        &self,
        records: &[CountryRecord],
        refreshed_at: DateTime<Utc>,
    ) -> Result<RefreshStatus> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for record in records {
            countries::upsert(&mut tx, record)
                .await
                .with_context(|| format!("Failed to upsert country: {}", record.name))?;
        }

        let status = RefreshStatus {
            total_countries: records.len() as i64,
            last_refreshed_at: refreshed_at,
        };
        status::upsert(&mut tx, &status)
            .await
            .context("Failed to upsert refresh status")?;

        // Dropping an uncommitted transaction rolls it back, so every early
        // return above leaves the database untouched.
        tx.commit().await.context("Failed to commit transaction")?;
        debug!("Committed refresh transaction");
        Ok(status)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
