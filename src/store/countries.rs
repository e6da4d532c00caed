use super::CountryStore;
use crate::core::country::{Country, CountryFilter, CountryRecord, SortOrder, name_key};
use anyhow::{Context, Result};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

const COUNTRY_COLUMNS: &str = "id, name, capital, region, population, currency_code, \
     exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

/// Inserts a country or refreshes every non-key column of the existing row
/// with the same case-folded name. The stored display name is kept.
pub(super) async fn upsert(conn: &mut SqliteConnection, record: &CountryRecord) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO countries (
            name, name_key, capital, region, population, currency_code,
            exchange_rate, estimated_gdp, flag_url, last_refreshed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (name_key) DO UPDATE SET
            capital = excluded.capital,
            region = excluded.region,
            population = excluded.population,
            currency_code = excluded.currency_code,
            exchange_rate = excluded.exchange_rate,
            estimated_gdp = excluded.estimated_gdp,
            flag_url = excluded.flag_url,
            last_refreshed_at = excluded.last_refreshed_at"#,
    )
    .bind(&record.name)
    .bind(record.name_key())
    .bind(&record.capital)
    .bind(&record.region)
    .bind(record.population)
    .bind(&record.currency_code)
    .bind(record.exchange_rate)
    .bind(record.estimated_gdp)
    .bind(&record.flag_url)
    .bind(record.last_refreshed_at)
    .execute(conn)
    .await?;
    Ok(())
}

impl CountryStore {
    pub async fn list_countries(&self, filter: &CountryFilter) -> Result<Vec<Country>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE 1 = 1"));

        if let Some(region) = &filter.region {
            query.push(" AND region = ").push_bind(region);
        }
        if let Some(currency) = &filter.currency_code {
            query.push(" AND currency_code = ").push_bind(currency);
        }
        query.push(match filter.sort {
            SortOrder::Natural => " ORDER BY id",
            // SQLite sorts NULL lowest, so unknown GDP lands last.
            SortOrder::GdpDesc => " ORDER BY estimated_gdp DESC, id",
        });

        let countries = query
            .build_query_as::<Country>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list countries")?;
        debug!(count = countries.len(), ?filter, "Listed countries");
        Ok(countries)
    }

    pub async fn find_country(&self, name: &str) -> Result<Option<Country>> {
        let sql = format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE name_key = ?");
        sqlx::query_as::<_, Country>(&sql)
            .bind(name_key(name))
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to look up country: {name}"))
    }

    /// Returns whether a row was deleted.
    pub async fn delete_country(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM countries WHERE name_key = ?")
            .bind(name_key(name))
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete country: {name}"))?;
        Ok(result.rows_affected() > 0)
    }
}
