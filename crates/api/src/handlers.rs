use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use earnings_core::domain::analysis::{AnalysisResult, Provenance};
use earnings_core::domain::fallback::mock_analysis;
use earnings_core::domain::key::normalize_ticker;
use earnings_core::domain::request::AnalysisRequest;
use earnings_core::error::AnalyzeError;
use earnings_core::orchestrator::{Analyzer, Served};
use earnings_core::storage::YearQuarters;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Analyzer,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/analyze-earnings", post(analyze_earnings))
        .route("/api/analyze_earnings", post(analyze_earnings))
        .route("/api/analyses/:ticker", get(available_quarters))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    /// Analysis could not run at all; the body still carries a mock payload.
    Analysis(String),
    Storage(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(error) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response()
            }
            ApiError::Analysis(error) => server_fault(error),
            ApiError::Storage(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error })),
            )
                .into_response(),
        }
    }
}

fn server_fault(error: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": error, "mock_data": mock_analysis() })),
    )
        .into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "request handler panicked");
    server_fault("Failed to analyze earnings call".to_string())
}

#[derive(Debug, Serialize)]
struct AnalysisResponse {
    #[serde(flatten)]
    result: AnalysisResult,
    ticker: String,
    year: i32,
    quarter: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    provenance: Provenance,
    from_cache: bool,
}

impl AnalysisResponse {
    fn new(req: &AnalysisRequest, served: Served) -> Self {
        Self {
            result: served.result,
            ticker: req.key.ticker().to_string(),
            year: req.key.year(),
            quarter: req.key.quarter(),
            date: served.transcript_date,
            warning: served.warning,
            provenance: served.provenance,
            from_cache: served.provenance == Provenance::Cached,
        }
    }
}

/// Raw bytes rather than `Json<_>` so that every malformed body gets the same
/// `{error}` shape.
async fn analyze_earnings(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?;
    let req = AnalysisRequest::from_json(&body).map_err(|e| ApiError::BadRequest(e.0))?;

    let served = state.analyzer.analyze(&req).await.map_err(|e| {
        let AnalyzeError::Config(cause) = &e;
        let err = anyhow::Error::new(e.clone());
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(
            key = %req.key,
            setting = cause.name,
            problem = %cause.problem,
            "analysis cannot run"
        );
        ApiError::Analysis(format!("Failed to analyze earnings call: {e}"))
    })?;

    Ok(Json(AnalysisResponse::new(&req, served)))
}

#[derive(Debug, Serialize)]
struct AvailableQuarters {
    ticker: String,
    years: Vec<YearQuarters>,
}

async fn available_quarters(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<AvailableQuarters>, ApiError> {
    let ticker = normalize_ticker(&ticker).map_err(|e| ApiError::BadRequest(e.0))?;

    let years = state
        .analyzer
        .available_quarters(&ticker)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(%ticker, error = %format!("{e:#}"), "listing cached analyses failed");
            ApiError::Storage("Failed to list cached analyses".to_string())
        })?;

    Ok(Json(AvailableQuarters { ticker, years }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use earnings_core::domain::key::AnalysisKey;
    use earnings_core::error::ConfigError;
    use earnings_core::ingest::provider::{FetchError, TranscriptSource};
    use earnings_core::ingest::types::TranscriptRecord;
    use earnings_core::llm::error::ModelError;
    use earnings_core::llm::{LlmClient, Provider};
    use earnings_core::storage::local::LocalCache;
    use earnings_core::storage::CacheGateway;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StaticTranscript(Option<Value>);

    #[async_trait::async_trait]
    impl TranscriptSource for StaticTranscript {
        fn provider_name(&self) -> &'static str {
            "static"
        }

        async fn fetch(&self, _key: &AnalysisKey) -> Result<TranscriptRecord, FetchError> {
            match &self.0 {
                Some(v) => Ok(TranscriptRecord(v.clone())),
                None => Err(FetchError::Upstream {
                    status: 500,
                    body: "provider down".to_string(),
                }),
            }
        }
    }

    struct StaticModel(Option<&'static str>);

    #[async_trait::async_trait]
    impl LlmClient for StaticModel {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String, ModelError> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| ConfigError::missing("GOOGLE_API_KEY").into())
        }
    }

    const REPLY: &str = r#"{"overall_assessment":"ok","red_flags":[]}"#;

    fn app(transcript: Option<Value>, reply: Option<&'static str>) -> Router {
        let analyzer = Analyzer::new(
            Arc::new(StaticTranscript(transcript)),
            Arc::new(StaticModel(reply)),
            CacheGateway::new(Arc::new(LocalCache::in_memory())),
        );
        router(AppState { analyzer })
    }

    fn transcript() -> Option<Value> {
        Some(json!({"date": "2024-07-25", "transcript": "Welcome to the call."}))
    }

    async fn post(app: Router, path: &str, body: &str) -> (StatusCode, Value) {
        let res = app
            .oneshot(
                Request::post(path)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        read(res).await
    }

    async fn read(res: Response) -> (StatusCode, Value) {
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn fresh_analysis_echoes_request_metadata() {
        let (status, body) = post(
            app(transcript(), Some(REPLY)),
            "/api/analyze-earnings",
            r#"{"ticker":"aapl","year":2024,"quarter":3}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overall_assessment"], "ok");
        assert_eq!(body["ticker"], "AAPL");
        assert_eq!(body["year"], 2024);
        assert_eq!(body["quarter"], 3);
        assert_eq!(body["date"], "2024-07-25");
        assert_eq!(body["provenance"], "fresh");
        assert_eq!(body["from_cache"], false);
        assert!(body.get("warning").is_none());
    }

    #[tokio::test]
    async fn repeated_request_is_a_cache_hit_on_either_route() {
        let app = app(transcript(), Some(REPLY));
        let req = r#"{"ticker":"AAPL","year":2024,"quarter":3}"#;

        let (_, first) = post(app.clone(), "/api/analyze-earnings", req).await;
        let (status, second) = post(app, "/api/analyze_earnings", req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["provenance"], "cached");
        assert_eq!(second["from_cache"], true);
        assert_eq!(second["overall_assessment"], first["overall_assessment"]);
        assert_eq!(second["date"], first["date"]);
    }

    #[tokio::test]
    async fn fetch_failure_is_still_a_200_with_warning() {
        let (status, body) = post(
            app(None, Some(REPLY)),
            "/api/analyze-earnings",
            r#"{"ticker":"AAPL","year":2024,"quarter":3}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provenance"], "fallback");
        assert!(body["warning"]
            .as_str()
            .unwrap()
            .contains("Transcript fetch failed"));
        assert!(body["overall_assessment"].is_string());
        assert!(body["executive_analysis"].is_object());
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_with_400() {
        for body in [
            "not json",
            r#"{"ticker":"AAPL","year":2024}"#,
            r#"{"ticker":"","year":2024,"quarter":1}"#,
            r#"{"ticker":"AAPL","year":"2024","quarter":1}"#,
            r#"{"ticker":"AAPL","year":2024,"quarter":0}"#,
        ] {
            let (status, res) = post(app(transcript(), Some(REPLY)), "/api/analyze-earnings", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(res["error"].is_string(), "{body}");
            assert!(res.get("mock_data").is_none());
        }
    }

    #[tokio::test]
    async fn missing_credentials_return_500_with_mock_data() {
        let (status, body) = post(
            app(transcript(), None),
            "/api/analyze-earnings",
            r#"{"ticker":"AAPL","year":2024,"quarter":3}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("GOOGLE_API_KEY"));
        assert_eq!(body["mock_data"], serde_json::to_value(mock_analysis()).unwrap());
    }

    #[tokio::test]
    async fn lists_cached_quarters_by_year() {
        let app = app(transcript(), Some(REPLY));
        for (year, quarter) in [(2023, 4), (2024, 2), (2024, 1)] {
            let body = json!({"ticker": "MSFT", "year": year, "quarter": quarter}).to_string();
            let (status, _) = post(app.clone(), "/api/analyze-earnings", &body).await;
            assert_eq!(status, StatusCode::OK);
        }

        let res = app
            .clone()
            .oneshot(Request::get("/api/analyses/msft").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let (status, body) = read(res).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "ticker": "MSFT",
                "years": [
                    {"year": 2024, "quarters": [1, 2]},
                    {"year": 2023, "quarters": [4]}
                ]
            })
        );

        let res = app
            .oneshot(Request::get("/api/analyses/bad_ticker").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn panics_render_the_server_fault_body() {
        let app = Router::new()
            .route(
                "/boom",
                get(|| async {
                    if true {
                        panic!("boom");
                    }
                    "unreachable"
                }),
            )
            .layer(CatchPanicLayer::custom(handle_panic));

        let res = app
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let (status, body) = read(res).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
        assert!(body["mock_data"].is_object());
    }
}
