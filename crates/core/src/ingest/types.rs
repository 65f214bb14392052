use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider payload for one earnings call. Opaque apart from the optional
/// `date`; the whole value is embedded in the prompt verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranscriptRecord(pub Value);

impl TranscriptRecord {
    pub fn date(&self) -> Option<&str> {
        // Some provider responses wrap the record in a one-element array.
        let record = match &self.0 {
            Value::Array(items) => items.first()?,
            other => other,
        };
        record.get("date")?.as_str().filter(|s| !s.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(obj) => obj.is_empty(),
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn to_prompt_json(&self) -> String {
        self.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_date_from_object_or_wrapped_array() {
        let direct = TranscriptRecord(json!({"date": "2024-07-30", "transcript": "..."}));
        assert_eq!(direct.date(), Some("2024-07-30"));

        let wrapped = TranscriptRecord(json!([{"date": "2024-10-31"}]));
        assert_eq!(wrapped.date(), Some("2024-10-31"));

        let missing = TranscriptRecord(json!({"transcript": "..."}));
        assert_eq!(missing.date(), None);
    }

    #[test]
    fn detects_empty_payloads() {
        assert!(TranscriptRecord(json!(null)).is_empty());
        assert!(TranscriptRecord(json!([])).is_empty());
        assert!(TranscriptRecord(json!({})).is_empty());
        assert!(!TranscriptRecord(json!({"transcript": "Good afternoon"})).is_empty());
    }
}
