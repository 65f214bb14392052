pub mod domain;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod orchestrator;
pub mod storage;

pub mod config {
    use crate::error::ConfigError;
    use anyhow::Context;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LlmProviderKind {
        Gemini,
        Anthropic,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum CacheBackendKind {
        Postgres,
        Local,
    }

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub api_ninjas_key: Option<String>,
        pub transcript_base_url: Option<String>,
        pub google_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub llm_provider: Option<String>,
        pub cache_backend: Option<String>,
        pub local_cache_path: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: non_empty_var("DATABASE_URL"),
                api_ninjas_key: non_empty_var("API_NINJAS_KEY"),
                transcript_base_url: non_empty_var("TRANSCRIPT_BASE_URL"),
                google_api_key: non_empty_var("GOOGLE_API_KEY"),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                llm_provider: non_empty_var("LLM_PROVIDER"),
                cache_backend: non_empty_var("CACHE_BACKEND"),
                local_cache_path: non_empty_var("LOCAL_CACHE_PATH"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        /// Credentials the configured pipeline will need but does not have.
        pub fn missing_credentials(&self) -> Vec<ConfigError> {
            let mut missing = Vec::new();
            if self.api_ninjas_key.is_none() {
                missing.push(ConfigError::missing("API_NINJAS_KEY"));
            }
            match self.llm_provider() {
                Ok(LlmProviderKind::Gemini) if self.google_api_key.is_none() => {
                    missing.push(ConfigError::missing("GOOGLE_API_KEY"));
                }
                Ok(LlmProviderKind::Anthropic) if self.anthropic_api_key.is_none() => {
                    missing.push(ConfigError::missing("ANTHROPIC_API_KEY"));
                }
                _ => {}
            }
            missing
        }

        pub fn llm_provider(&self) -> anyhow::Result<LlmProviderKind> {
            match self
                .llm_provider
                .as_deref()
                .map(|s| s.trim().to_ascii_lowercase())
                .as_deref()
            {
                None | Some("gemini") | Some("google") => Ok(LlmProviderKind::Gemini),
                Some("anthropic") | Some("claude") => Ok(LlmProviderKind::Anthropic),
                Some(other) => anyhow::bail!("unsupported LLM_PROVIDER: {other}"),
            }
        }

        /// Postgres when explicitly requested or when a database URL is present.
        pub fn cache_backend(&self) -> anyhow::Result<CacheBackendKind> {
            match self
                .cache_backend
                .as_deref()
                .map(|s| s.trim().to_ascii_lowercase())
                .as_deref()
            {
                Some("postgres") | Some("pg") => Ok(CacheBackendKind::Postgres),
                Some("local") | Some("memory") => Ok(CacheBackendKind::Local),
                Some(other) => anyhow::bail!("unsupported CACHE_BACKEND: {other}"),
                None if self.database_url.is_some() => Ok(CacheBackendKind::Postgres),
                None => Ok(CacheBackendKind::Local),
            }
        }
    }

    /// Environment value, with unset and blank treated alike.
    pub fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.trim().is_empty())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn empty() -> Settings {
            Settings::default()
        }

        #[test]
        fn defaults_to_gemini_and_local_cache() {
            let s = empty();
            assert_eq!(s.llm_provider().unwrap(), LlmProviderKind::Gemini);
            assert_eq!(s.cache_backend().unwrap(), CacheBackendKind::Local);
        }

        #[test]
        fn database_url_selects_postgres_unless_overridden() {
            let mut s = empty();
            s.database_url = Some("postgres://localhost/earnings".to_string());
            assert_eq!(s.cache_backend().unwrap(), CacheBackendKind::Postgres);

            s.cache_backend = Some("LOCAL".to_string());
            assert_eq!(s.cache_backend().unwrap(), CacheBackendKind::Local);
        }

        #[test]
        fn blank_variables_read_as_unset() {
            std::env::set_var("EARNINGS_CORE_TEST_BLANK_VAR", "  ");
            assert_eq!(non_empty_var("EARNINGS_CORE_TEST_BLANK_VAR"), None);
            std::env::set_var("EARNINGS_CORE_TEST_BLANK_VAR", "gemini-2.0-flash");
            assert_eq!(
                non_empty_var("EARNINGS_CORE_TEST_BLANK_VAR").as_deref(),
                Some("gemini-2.0-flash")
            );
        }

        #[test]
        fn rejects_unknown_provider() {
            let mut s = empty();
            s.llm_provider = Some("mystery".to_string());
            assert!(s.llm_provider().is_err());
        }

        #[test]
        fn missing_credentials_follow_the_selected_provider() {
            let names = |s: &Settings| -> Vec<&'static str> {
                s.missing_credentials().into_iter().map(|e| e.name).collect()
            };

            let mut s = empty();
            assert_eq!(names(&s), vec!["API_NINJAS_KEY", "GOOGLE_API_KEY"]);

            s.api_ninjas_key = Some("k".to_string());
            s.llm_provider = Some("anthropic".to_string());
            assert_eq!(names(&s), vec!["ANTHROPIC_API_KEY"]);

            s.anthropic_api_key = Some("k".to_string());
            assert!(names(&s).is_empty());
        }
    }
}
