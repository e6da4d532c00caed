use super::CountryStore;
use crate::core::country::RefreshStatus;
use anyhow::{Context, Result};
use sqlx::SqliteConnection;

const STATUS_ID: i64 = 1;

pub(super) async fn upsert(conn: &mut SqliteConnection, status: &RefreshStatus) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO refresh_status (id, total_countries, last_refreshed_at)
        VALUES (?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            total_countries = excluded.total_countries,
            last_refreshed_at = excluded.last_refreshed_at"#,
    )
    .bind(STATUS_ID)
    .bind(status.total_countries)
    .bind(status.last_refreshed_at)
    .execute(conn)
    .await?;
    Ok(())
}

impl CountryStore {
    /// The last successful refresh, or `None` if there has never been one.
    pub async fn status(&self) -> Result<Option<RefreshStatus>> {
        sqlx::query_as::<_, RefreshStatus>(
            "SELECT total_countries, last_refreshed_at FROM refresh_status WHERE id = ?",
        )
        .bind(STATUS_ID)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read refresh status")
    }
}
