use crate::config::Settings;
use crate::domain::analysis::AnalysisResult;
use crate::domain::key::AnalysisKey;
use crate::storage::{CacheBackend, CacheEntry, CachedKey};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Managed-store backend: one row per cache key in `analysis_cache`.
#[derive(Debug, Clone)]
pub struct PgCache {
    pool: sqlx::PgPool,
}

impl PgCache {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(settings: &Settings) -> anyhow::Result<Self> {
        let db_url = settings.require_database_url()?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .context("connect DATABASE_URL failed")?;
        super::migrate(&pool).await?;
        Ok(Self::new(pool))
    }
}

fn row_key(ticker: &str, year: i32, quarter: i16) -> anyhow::Result<AnalysisKey> {
    let quarter = u8::try_from(quarter).context("quarter out of range in analysis_cache")?;
    Ok(AnalysisKey::new(ticker, year, quarter)?)
}

#[async_trait::async_trait]
impl CacheBackend for PgCache {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn load(&self, cache_id: &str) -> anyhow::Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, (String, i32, i16, Value, Option<String>, DateTime<Utc>)>(
            "SELECT ticker, year, quarter, analysis, transcript_date, cached_at \
             FROM analysis_cache \
             WHERE cache_key = $1",
        )
        .bind(cache_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("select analysis_cache failed (cache_key={cache_id})"))?;

        let Some((ticker, year, quarter, analysis, transcript_date, cached_at)) = row else {
            return Ok(None);
        };

        let analysis = serde_json::from_value::<AnalysisResult>(analysis)
            .with_context(|| format!("stored analysis does not match schema (cache_key={cache_id})"))?;

        Ok(Some(CacheEntry {
            key: row_key(&ticker, year, quarter)?,
            analysis,
            transcript_date,
            cached_at,
        }))
    }

    async fn store(&self, cache_id: &str, entry: &CacheEntry) -> anyhow::Result<()> {
        let analysis = serde_json::to_value(&entry.analysis).context("serialize analysis failed")?;

        sqlx::query(
            "INSERT INTO analysis_cache (cache_key, ticker, year, quarter, analysis, transcript_date, cached_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (cache_key) DO UPDATE \
               SET ticker = EXCLUDED.ticker, year = EXCLUDED.year, quarter = EXCLUDED.quarter, \
                   analysis = EXCLUDED.analysis, transcript_date = EXCLUDED.transcript_date, \
                   cached_at = EXCLUDED.cached_at",
        )
        .bind(cache_id)
        .bind(entry.key.ticker())
        .bind(entry.key.year())
        .bind(i16::from(entry.key.quarter()))
        .bind(analysis)
        .bind(&entry.transcript_date)
        .bind(entry.cached_at)
        .execute(&self.pool)
        .await
        .context("upsert analysis_cache failed")?;

        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<CachedKey>> {
        let rows = sqlx::query_as::<_, (String, i32, i16, DateTime<Utc>)>(
            "SELECT ticker, year, quarter, cached_at \
             FROM analysis_cache \
             WHERE left(cache_key, length($1)) = $1 \
             ORDER BY ticker ASC, year ASC, quarter ASC",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .context("list analysis_cache failed")?;

        let mut out = Vec::with_capacity(rows.len());
        for (ticker, year, quarter, cached_at) in rows {
            out.push(CachedKey {
                key: row_key(&ticker, year, quarter)?,
                cached_at,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_key_rejects_corrupt_rows() {
        assert_eq!(
            row_key("msft", 2024, 2).unwrap(),
            AnalysisKey::new("MSFT", 2024, 2).unwrap()
        );
        assert!(row_key("MSFT", 2024, -1).is_err());
        assert!(row_key("MSFT", 2024, 7).is_err());
    }
}
