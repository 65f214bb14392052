use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_TICKER_LEN: usize = 16;
const CACHE_KEY_SEPARATOR: char = '_';

/// Cache identity of one analysis. The ticker is always stored uppercase, so
/// keys differing only in ticker case compare equal.
///
/// Ordering is (ticker, year, quarter), which groups every key of a ticker into
/// one contiguous run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAnalysisKey")]
pub struct AnalysisKey {
    ticker: String,
    year: i32,
    quarter: u8,
}

#[derive(Deserialize)]
struct RawAnalysisKey {
    ticker: String,
    year: i32,
    quarter: u8,
}

impl TryFrom<RawAnalysisKey> for AnalysisKey {
    type Error = ValidationError;

    fn try_from(raw: RawAnalysisKey) -> Result<Self, Self::Error> {
        Self::new(&raw.ticker, raw.year, raw.quarter)
    }
}

impl AnalysisKey {
    pub fn new(ticker: &str, year: i32, quarter: u8) -> Result<Self, ValidationError> {
        let ticker = normalize_ticker(ticker)?;
        if !(1900..=2100).contains(&year) {
            return Err(ValidationError(format!(
                "year must be between 1900 and 2100 (got {year})"
            )));
        }
        if !(1..=4).contains(&quarter) {
            return Err(ValidationError(format!(
                "quarter must be between 1 and 4 (got {quarter})"
            )));
        }
        Ok(Self {
            ticker,
            year,
            quarter,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u8 {
        self.quarter
    }

    /// Storage key, e.g. `AAPL_2024_3`.
    pub fn cache_id(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.ticker,
            self.year,
            self.quarter,
            sep = CACHE_KEY_SEPARATOR
        )
    }

    /// Prefix shared by the cache ids of every key for `ticker`.
    pub fn cache_prefix(ticker: &str) -> Result<String, ValidationError> {
        Ok(format!("{}{}", normalize_ticker(ticker)?, CACHE_KEY_SEPARATOR))
    }
}

impl fmt::Display for AnalysisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Q{} {}", self.ticker, self.quarter, self.year)
    }
}

/// Trims and uppercases a ticker. The charset excludes the cache key separator.
pub fn normalize_ticker(ticker: &str) -> Result<String, ValidationError> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(ValidationError("ticker must be non-empty".to_string()));
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(ValidationError(format!(
            "ticker must be at most {MAX_TICKER_LEN} characters"
        )));
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ValidationError(format!(
            "ticker contains invalid characters: {ticker}"
        )));
    }
    Ok(ticker.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_case_does_not_change_identity() {
        let lower = AnalysisKey::new("aapl", 2024, 3).unwrap();
        let upper = AnalysisKey::new(" AAPL ", 2024, 3).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.cache_id(), "AAPL_2024_3");
        assert_eq!(upper.cache_id(), "AAPL_2024_3");
    }

    #[test]
    fn rejects_out_of_range_quarter_and_blank_ticker() {
        assert!(AnalysisKey::new("AAPL", 2024, 0).is_err());
        assert!(AnalysisKey::new("AAPL", 2024, 5).is_err());
        assert!(AnalysisKey::new("   ", 2024, 1).is_err());
        assert!(AnalysisKey::new("AA_PL", 2024, 1).is_err());
    }

    #[test]
    fn orders_by_ticker_then_year_then_quarter() {
        let mut keys = vec![
            AnalysisKey::new("MSFT", 2023, 1).unwrap(),
            AnalysisKey::new("AAPL", 2024, 2).unwrap(),
            AnalysisKey::new("AAPL", 2023, 4).unwrap(),
            AnalysisKey::new("AAPL", 2024, 1).unwrap(),
        ];
        keys.sort();
        let ids: Vec<_> = keys.iter().map(AnalysisKey::cache_id).collect();
        assert_eq!(
            ids,
            vec!["AAPL_2023_4", "AAPL_2024_1", "AAPL_2024_2", "MSFT_2023_1"]
        );
    }

    #[test]
    fn deserialization_normalizes_ticker() {
        let key: AnalysisKey =
            serde_json::from_str(r#"{"ticker":"brk.b","year":2024,"quarter":2}"#).unwrap();
        assert_eq!(key.ticker(), "BRK.B");
        assert!(serde_json::from_str::<AnalysisKey>(r#"{"ticker":"x","year":2024,"quarter":9}"#)
            .is_err());
    }

    #[test]
    fn prefix_matches_cache_ids() {
        let key = AnalysisKey::new("nvda", 2025, 1).unwrap();
        assert!(key
            .cache_id()
            .starts_with(&AnalysisKey::cache_prefix("Nvda").unwrap()));
    }
}
