use crate::domain::analysis::{AnalysisResult, SECTION_NAMES};
use anyhow::{bail, ensure, Context};
use serde_json::Value;

/// Gate between a parsed model payload and [`AnalysisResult`].
///
/// Syntactically valid JSON is not enough: the payload must be an object,
/// carry at least one known section, and every present section must have the
/// declared shape. Unknown top-level keys are ignored.
pub fn validate_and_into_result(value: Value) -> anyhow::Result<AnalysisResult> {
    if !value.is_object() {
        bail!("expected a JSON object, got {}", json_kind(&value));
    }

    let result = serde_json::from_value::<AnalysisResult>(value)
        .context("payload does not match the analysis schema")?;

    ensure!(
        result.has_any_section(),
        "payload has none of the analysis sections ({})",
        SECTION_NAMES.join(", ")
    );

    if let Some(assessment) = &result.overall_assessment {
        ensure!(
            !assessment.trim().is_empty(),
            "overall_assessment must be non-empty when present"
        );
    }

    let questions = result
        .qa_analysis
        .as_ref()
        .and_then(|qa| qa.most_evasive_questions.as_deref())
        .unwrap_or_default();
    for (idx, q) in questions.iter().enumerate() {
        ensure!(
            !q.question.trim().is_empty(),
            "most_evasive_questions[{idx}].question must be non-empty"
        );
    }

    Ok(result)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
