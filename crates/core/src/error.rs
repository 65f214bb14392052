use std::fmt;
use thiserror::Error;

/// A required credential or setting is absent or unusable. The service cannot
/// work at all until an operator fixes the environment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{name} {problem}")]
pub struct ConfigError {
    pub name: &'static str,
    pub problem: ConfigProblem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigProblem {
    Missing,
    /// Set, but not usable as given (e.g. not a valid HTTP header value).
    Invalid,
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigProblem::Missing => f.write_str("is not configured"),
            ConfigProblem::Invalid => f.write_str("has an invalid value"),
        }
    }
}

impl ConfigError {
    pub fn missing(name: &'static str) -> Self {
        Self {
            name,
            problem: ConfigProblem::Missing,
        }
    }

    pub fn invalid(name: &'static str) -> Self {
        Self {
            name,
            problem: ConfigProblem::Invalid,
        }
    }
}

/// Malformed client request, rejected before any work begins.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// The only failure the orchestrator lets escape. Every other stage failure is
/// absorbed into a fallback payload.
#[derive(Debug, Clone, Error)]
pub enum AnalyzeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
