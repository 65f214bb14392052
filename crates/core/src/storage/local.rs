use crate::storage::{CacheBackend, CacheEntry, CachedKey};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Development backend: all entries in one map, optionally mirrored to a JSON
/// file after every write.
#[derive(Debug)]
pub struct LocalCache {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
}

impl LocalCache {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str::<BTreeMap<String, CacheEntry>>(&text)
                .with_context(|| format!("local cache file is corrupt: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read local cache {}", path.display()))
            }
        };

        tracing::info!(path = %path.display(), entries = entries.len(), "opened local cache");
        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &BTreeMap<String, CacheEntry>) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(entries).context("serialize local cache failed")?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheBackend for LocalCache {
    fn backend_name(&self) -> &'static str {
        if self.path.is_some() {
            "local_file"
        } else {
            "in_memory"
        }
    }

    async fn load(&self, cache_id: &str) -> anyhow::Result<Option<CacheEntry>> {
        Ok(self.entries.lock().await.get(cache_id).cloned())
    }

    async fn store(&self, cache_id: &str, entry: &CacheEntry) -> anyhow::Result<()> {
        // Held across the file write so concurrent stores persist in order.
        let mut entries = self.entries.lock().await;
        if self.path.is_none() {
            entries.insert(cache_id.to_string(), entry.clone());
            return Ok(());
        }

        let mut next = entries.clone();
        next.insert(cache_id.to_string(), entry.clone());
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<CachedKey>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(id, _)| id.starts_with(prefix))
            .map(|(_, e)| CachedKey {
                key: e.key.clone(),
                cached_at: e.cached_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::AnalysisResult;
    use crate::domain::key::AnalysisKey;
    use chrono::{TimeZone, Utc};

    fn entry(ticker: &str, year: i32, quarter: u8) -> CacheEntry {
        CacheEntry {
            key: AnalysisKey::new(ticker, year, quarter).unwrap(),
            analysis: AnalysisResult {
                red_flags: Some(vec!["guidance cut".to_string()]),
                ..Default::default()
            },
            transcript_date: None,
            cached_at: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn file_backed_cache_survives_reopen() {
        let path = std::env::temp_dir().join(format!(
            "earnings-local-cache-{}-reopen.json",
            std::process::id()
        ));
        let _ = tokio::fs::remove_file(&path).await;

        let e = entry("NVDA", 2025, 1);
        {
            let cache = LocalCache::open(&path).await.unwrap();
            assert_eq!(cache.backend_name(), "local_file");
            cache.store(&e.key.cache_id(), &e).await.unwrap();
        }

        let reopened = LocalCache::open(&path).await.unwrap();
        assert_eq!(reopened.load("NVDA_2025_1").await.unwrap(), Some(e));
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn store_overwrites_and_prefix_scan_stops_at_ticker_boundary() {
        let cache = LocalCache::in_memory();
        let a = entry("AMD", 2024, 4);
        let b = entry("AMDX", 2024, 4);
        cache.store(&a.key.cache_id(), &a).await.unwrap();
        cache.store(&b.key.cache_id(), &b).await.unwrap();

        let mut newer = a.clone();
        newer.cached_at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        cache.store(&a.key.cache_id(), &newer).await.unwrap();

        let listed = cache.list_prefix("AMD_").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].cached_at, newer.cached_at);
    }

    #[tokio::test]
    async fn failed_file_write_leaves_memory_unchanged() {
        let path = std::env::temp_dir()
            .join(format!("earnings-local-cache-{}-missing-dir", std::process::id()))
            .join("cache.json");
        let cache = LocalCache::open(&path).await.unwrap();

        let e = entry("AAPL", 2024, 3);
        assert!(cache.store(&e.key.cache_id(), &e).await.is_err());
        assert_eq!(cache.load("AAPL_2024_3").await.unwrap(), None);
        assert!(cache.list_prefix("AAPL_").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let path = std::env::temp_dir().join(format!(
            "earnings-local-cache-{}-corrupt.json",
            std::process::id()
        ));
        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(LocalCache::open(&path).await.is_err());
        let _ = tokio::fs::remove_file(&path).await;
    }
}
