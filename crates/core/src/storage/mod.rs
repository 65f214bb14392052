pub mod local;
pub mod postgres;

use crate::config::{CacheBackendKind, Settings};
use crate::domain::analysis::AnalysisResult;
use crate::domain::key::AnalysisKey;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Entries older than this are served as misses. They are not deleted.
pub const RETENTION_DAYS: i64 = 30;

/// One cached analysis. Never mutated in place; a newer analysis for the same
/// key replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: AnalysisKey,
    pub analysis: AnalysisResult,
    #[serde(default)]
    pub transcript_date: Option<String>,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedKey {
    pub key: AnalysisKey,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearQuarters {
    pub year: i32,
    pub quarters: Vec<u8>,
}

/// Raw key/value store behind the [`CacheGateway`]. Implementations are
/// addressed by cache id (see [`AnalysisKey::cache_id`]).
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn load(&self, cache_id: &str) -> anyhow::Result<Option<CacheEntry>>;

    /// Unconditional overwrite.
    async fn store(&self, cache_id: &str, entry: &CacheEntry) -> anyhow::Result<()>;

    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<CachedKey>>;
}

/// The only component that touches cache storage. Owns key derivation and the
/// freshness policy.
#[derive(Clone)]
pub struct CacheGateway {
    backend: Arc<dyn CacheBackend>,
    retention: Duration,
}

impl CacheGateway {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            retention: Duration::days(RETENTION_DAYS),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub async fn get(&self, key: &AnalysisKey) -> anyhow::Result<Option<CacheEntry>> {
        self.get_at(key, Utc::now()).await
    }

    pub async fn get_at(
        &self,
        key: &AnalysisKey,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<CacheEntry>> {
        let cache_id = key.cache_id();
        let Some(entry) = self.backend.load(&cache_id).await? else {
            tracing::debug!(%cache_id, "cache miss");
            return Ok(None);
        };

        if &entry.key != key {
            tracing::warn!(%cache_id, stored = %entry.key, "cache entry key mismatch; ignoring");
            return Ok(None);
        }

        if now.signed_duration_since(entry.cached_at) > self.retention {
            tracing::debug!(%cache_id, cached_at = %entry.cached_at, "cache entry expired");
            return Ok(None);
        }

        tracing::debug!(%cache_id, "cache hit");
        Ok(Some(entry))
    }

    pub async fn put(
        &self,
        key: &AnalysisKey,
        analysis: &AnalysisResult,
        transcript_date: Option<&str>,
    ) -> anyhow::Result<CacheEntry> {
        self.put_at(key, analysis, transcript_date, Utc::now()).await
    }

    pub async fn put_at(
        &self,
        key: &AnalysisKey,
        analysis: &AnalysisResult,
        transcript_date: Option<&str>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<CacheEntry> {
        let entry = CacheEntry {
            key: key.clone(),
            analysis: analysis.clone(),
            transcript_date: transcript_date.map(str::to_string),
            cached_at: now,
        };
        let cache_id = key.cache_id();
        self.backend
            .store(&cache_id, &entry)
            .await
            .with_context(|| format!("failed to store cache entry {cache_id}"))?;
        tracing::debug!(%cache_id, "cache entry stored");
        Ok(entry)
    }

    /// Every stored entry for `ticker`, expired ones included, in key order.
    pub async fn list_entries(&self, ticker: &str) -> anyhow::Result<Vec<CachedKey>> {
        let prefix = AnalysisKey::cache_prefix(ticker)?;
        let mut entries = self.backend.list_prefix(&prefix).await?;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries.dedup_by(|a, b| a.key == b.key);
        Ok(entries)
    }

    pub async fn list_keys(&self, ticker: &str) -> anyhow::Result<Vec<AnalysisKey>> {
        Ok(self
            .list_entries(ticker)
            .await?
            .into_iter()
            .map(|e| e.key)
            .collect())
    }

    /// Cached quarters grouped by year, newest year first.
    pub async fn available_quarters(&self, ticker: &str) -> anyhow::Result<Vec<YearQuarters>> {
        let mut by_year: BTreeMap<i32, BTreeSet<u8>> = BTreeMap::new();
        for key in self.list_keys(ticker).await? {
            by_year.entry(key.year()).or_default().insert(key.quarter());
        }
        Ok(by_year
            .into_iter()
            .rev()
            .map(|(year, quarters)| YearQuarters {
                year,
                quarters: quarters.into_iter().collect(),
            })
            .collect())
    }
}

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Chooses the backend named by configuration. A Postgres backend that cannot
/// connect or migrate degrades to the local backend with an error log.
pub async fn gateway_from_settings(settings: &Settings) -> anyhow::Result<CacheGateway> {
    let backend: Arc<dyn CacheBackend> = match settings.cache_backend()? {
        CacheBackendKind::Postgres => match postgres::PgCache::connect(settings).await {
            Ok(pg) => Arc::new(pg),
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "postgres cache unavailable; using local cache");
                Arc::new(local_from_settings(settings).await?)
            }
        },
        CacheBackendKind::Local => Arc::new(local_from_settings(settings).await?),
    };

    tracing::info!(backend = backend.backend_name(), "cache backend selected");
    Ok(CacheGateway::new(backend))
}

async fn local_from_settings(settings: &Settings) -> anyhow::Result<local::LocalCache> {
    match settings.local_cache_path.as_deref() {
        Some(path) => local::LocalCache::open(path).await,
        None => Ok(local::LocalCache::in_memory()),
    }
}
