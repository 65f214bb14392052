use crate::domain::key::AnalysisKey;
use crate::error::ValidationError;
use serde_json::Value;

/// A validated analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub key: AnalysisKey,
    pub force_refresh: bool,
}

impl AnalysisRequest {
    /// Validates a raw JSON body `{ticker, year, quarter, force_refresh?}`.
    ///
    /// Works on an untyped value so that type errors are reported with the
    /// same structured message as range errors.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let obj = body
            .as_object()
            .ok_or_else(|| ValidationError("request body must be a JSON object".to_string()))?;

        let ticker = match obj.get("ticker") {
            Some(Value::String(s)) => s.as_str(),
            Some(Value::Null) | None => return Err(missing()),
            Some(_) => return Err(ValidationError("ticker must be a string".to_string())),
        };

        let year = match obj.get("year") {
            Some(Value::Null) | None => return Err(missing()),
            Some(v) => v
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| ValidationError("year must be an integer".to_string()))?,
        };

        let quarter = match obj.get("quarter") {
            Some(Value::Null) | None => return Err(missing()),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| ValidationError("quarter must be an integer".to_string()))?,
        };
        let quarter = u8::try_from(quarter).map_err(|_| {
            ValidationError(format!("quarter must be between 1 and 4 (got {quarter})"))
        })?;

        let force_refresh = match obj.get("force_refresh") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(ValidationError(
                    "force_refresh must be a boolean".to_string(),
                ))
            }
        };

        Ok(Self {
            key: AnalysisKey::new(ticker, year, quarter)?,
            force_refresh,
        })
    }
}

fn missing() -> ValidationError {
    ValidationError("Missing required parameters: ticker, year, quarter".to_string())
}
