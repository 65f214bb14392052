use crate::config::Settings;
use crate::domain::analysis::{AnalysisResult, Provenance};
use crate::domain::fallback::mock_analysis;
use crate::domain::key::AnalysisKey;
use crate::domain::request::AnalysisRequest;
use crate::error::AnalyzeError;
use crate::ingest::provider::{ApiNinjasTranscripts, FetchError, TranscriptSource};
use crate::llm::error::ModelError;
use crate::llm::{self, json, prompt, LlmClient};
use crate::storage::{self, CacheGateway, YearQuarters};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What a request is answered with. Every variant of provenance carries a
/// schema-shaped result.
#[derive(Debug, Clone, PartialEq)]
pub struct Served {
    pub result: AnalysisResult,
    pub provenance: Provenance,
    pub transcript_date: Option<String>,
    pub warning: Option<String>,
    pub cached_at: Option<DateTime<Utc>>,
}

impl Served {
    fn fallback(key: &AnalysisKey, transcript_date: Option<String>, warning: String) -> Self {
        tracing::warn!(
            ticker = key.ticker(),
            year = key.year(),
            quarter = key.quarter(),
            provenance = %Provenance::Fallback,
            %warning,
            "serving fallback analysis"
        );
        Self {
            result: mock_analysis(),
            provenance: Provenance::Fallback,
            transcript_date,
            warning: Some(warning),
            cached_at: None,
        }
    }
}

/// Runs the cache → fetch → model → extract pipeline for one key.
#[derive(Clone)]
pub struct Analyzer {
    transcripts: Arc<dyn TranscriptSource>,
    llm: Arc<dyn LlmClient>,
    cache: CacheGateway,
}

impl Analyzer {
    pub fn new(
        transcripts: Arc<dyn TranscriptSource>,
        llm: Arc<dyn LlmClient>,
        cache: CacheGateway,
    ) -> Self {
        Self {
            transcripts,
            llm,
            cache,
        }
    }

    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let transcripts = Arc::new(ApiNinjasTranscripts::from_settings(settings)?);
        let llm = llm::client_from_settings(settings)?;
        let cache = storage::gateway_from_settings(settings).await?;

        tracing::info!(
            transcripts = transcripts.provider_name(),
            llm = %llm.provider(),
            cache = cache.backend_name(),
            "analyzer ready"
        );
        Ok(Self::new(transcripts, llm, cache))
    }

    pub fn cache(&self) -> &CacheGateway {
        &self.cache
    }

    /// Only a missing credential escapes as an error; every other failure is
    /// answered with the fallback payload and a `warning`.
    pub async fn analyze(&self, req: &AnalysisRequest) -> Result<Served, AnalyzeError> {
        let key = &req.key;

        if req.force_refresh {
            tracing::info!(%key, "force refresh; skipping cache read");
        } else {
            match self.cache.get(key).await {
                Ok(Some(entry)) => {
                    tracing::info!(%key, provenance = %Provenance::Cached, "serving cached analysis");
                    return Ok(Served {
                        result: entry.analysis,
                        provenance: Provenance::Cached,
                        transcript_date: entry.transcript_date,
                        warning: None,
                        cached_at: Some(entry.cached_at),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%key, error = %format!("{e:#}"), "cache read failed; treating as miss");
                }
            }
        }

        let transcript = match self.transcripts.fetch(key).await {
            Ok(t) => t,
            Err(FetchError::Config(e)) => return Err(e.into()),
            Err(e) => {
                return Ok(Served::fallback(
                    key,
                    None,
                    format!("Transcript fetch failed: {e}. Using mock data."),
                ))
            }
        };
        let transcript_date = transcript.date().map(str::to_string);

        let prompt = prompt::analysis_prompt(key, &transcript);
        let text = match self.llm.generate_text(&prompt).await {
            Ok(text) => text,
            Err(ModelError::Config(e)) => return Err(e.into()),
            Err(ModelError::Call(e)) => {
                if let Some(raw) = e.raw_output.as_deref() {
                    tracing::debug!(%key, raw_output = raw, "model call raw output");
                }
                return Ok(Served::fallback(
                    key,
                    transcript_date,
                    format!("Model call failed: {e}. Using mock data."),
                ));
            }
        };

        let result = match json::extract(&text) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(%key, raw_output = %text, "unextractable model output");
                return Ok(Served::fallback(
                    key,
                    transcript_date,
                    format!("Analysis error: {e}. Using mock data."),
                ));
            }
        };

        let cached_at = match self
            .cache
            .put(key, &result, transcript_date.as_deref())
            .await
        {
            Ok(entry) => Some(entry.cached_at),
            Err(e) => {
                tracing::warn!(%key, error = %format!("{e:#}"), "cache write failed; serving uncached result");
                None
            }
        };

        tracing::info!(%key, provenance = %Provenance::Fresh, "analysis complete");
        Ok(Served {
            result,
            provenance: Provenance::Fresh,
            transcript_date,
            warning: None,
            cached_at,
        })
    }

    pub async fn available_quarters(&self, ticker: &str) -> anyhow::Result<Vec<YearQuarters>> {
        self.cache.available_quarters(ticker).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::ConfigError;
    use crate::ingest::types::TranscriptRecord;
    use crate::llm::error::ModelCallError;
    use crate::llm::Provider;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub enum SourceMode {
        Ok(Value),
        Upstream(u16),
        MissingKey,
    }

    pub struct FakeSource {
        pub mode: SourceMode,
        pub calls: AtomicUsize,
    }

    impl FakeSource {
        pub fn new(mode: SourceMode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl TranscriptSource for FakeSource {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch(&self, key: &AnalysisKey) -> Result<TranscriptRecord, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.mode {
                SourceMode::Ok(v) => {
                    let record = TranscriptRecord(v.clone());
                    if record.is_empty() {
                        return Err(FetchError::Empty(key.clone()));
                    }
                    Ok(record)
                }
                SourceMode::Upstream(status) => Err(FetchError::Upstream {
                    status: *status,
                    body: "upstream unavailable".to_string(),
                }),
                SourceMode::MissingKey => Err(ConfigError::missing("API_NINJAS_KEY").into()),
            }
        }
    }

    pub enum ModelMode {
        Reply(String),
        CallFails,
        MissingKey,
    }

    pub struct FakeModel {
        pub mode: ModelMode,
        pub calls: AtomicUsize,
    }

    impl FakeModel {
        pub fn new(mode: ModelMode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn replying(text: &str) -> Arc<Self> {
            Self::new(ModelMode::Reply(text.to_string()))
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for FakeModel {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.mode {
                ModelMode::Reply(text) => Ok(text.clone()),
                ModelMode::CallFails => Err(ModelCallError::new(
                    Provider::Gemini,
                    "http",
                    "status=503 Service Unavailable",
                )
                .into()),
                ModelMode::MissingKey => Err(ConfigError::missing("GOOGLE_API_KEY").into()),
            }
        }
    }
}
