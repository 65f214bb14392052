use crate::config::Settings;
use crate::domain::key::AnalysisKey;
use crate::error::ConfigError;
use crate::ingest::types::TranscriptRecord;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.api-ninjas.com";
const TRANSCRIPT_PATH: &str = "/v1/earningstranscript";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("transcript provider returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("transcript request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("transcript response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("no transcript available for {0}")]
    Empty(AnalysisKey),
}

/// Source of earnings-call transcripts. One attempt per call; retries are not
/// this layer's concern.
#[async_trait::async_trait]
pub trait TranscriptSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch(&self, key: &AnalysisKey) -> Result<TranscriptRecord, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ApiNinjasTranscripts {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiNinjasTranscripts {
    /// A missing API key is not an error here; `fetch` reports it as
    /// [`FetchError::Config`] so the service can still start.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings
            .transcript_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("TRANSCRIPT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build transcript provider http client")?;

        Ok(Self {
            http,
            base_url,
            api_key: settings.api_ninjas_key.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), TRANSCRIPT_PATH)
    }

    fn headers(&self) -> Result<HeaderMap, ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ConfigError::missing("API_NINJAS_KEY"))?;
        let mut headers = HeaderMap::new();
        let value =
            HeaderValue::from_str(api_key).map_err(|_| ConfigError::invalid("API_NINJAS_KEY"))?;
        headers.insert("X-Api-Key", value);
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl TranscriptSource for ApiNinjasTranscripts {
    fn provider_name(&self) -> &'static str {
        "api_ninjas"
    }

    async fn fetch(&self, key: &AnalysisKey) -> Result<TranscriptRecord, FetchError> {
        let headers = self.headers()?;

        tracing::info!(
            ticker = key.ticker(),
            year = key.year(),
            quarter = key.quarter(),
            "fetching transcript"
        );

        let res = self
            .http
            .get(self.url())
            .headers(headers)
            .query(&[
                ("ticker", key.ticker().to_string()),
                ("year", key.year().to_string()),
                ("quarter", key.quarter().to_string()),
            ])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = res.status();
        let text = res.text().await.map_err(FetchError::Transport)?;
        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let record = parse_transcript(&text)?;
        if record.is_empty() {
            return Err(FetchError::Empty(key.clone()));
        }
        Ok(record)
    }
}

fn parse_transcript(text: &str) -> Result<TranscriptRecord, FetchError> {
    serde_json::from_str::<TranscriptRecord>(text).map_err(FetchError::Decode)
}
