use serde::{Deserialize, Serialize};

/// Structured analysis of one earnings call.
///
/// Every section is optional; a present section must match its declared shape.
/// Lists are ordered and hold strings, except Q&A entries which are records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_analysis: Option<ExecutiveAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_analysis: Option<QaAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_metrics: Option<FinancialMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitive_positioning: Option<CompetitivePositioning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_looking_statements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red_flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_analysis: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_assessment: Option<String>,
}

/// Top-level section names, in schema order.
pub const SECTION_NAMES: [&str; 8] = [
    "executive_analysis",
    "qa_analysis",
    "financial_metrics",
    "competitive_positioning",
    "forward_looking_statements",
    "red_flags",
    "change_analysis",
    "overall_assessment",
];

impl AnalysisResult {
    pub fn has_any_section(&self) -> bool {
        self.executive_analysis.is_some()
            || self.qa_analysis.is_some()
            || self.financial_metrics.is_some()
            || self.competitive_positioning.is_some()
            || self.forward_looking_statements.is_some()
            || self.red_flags.is_some()
            || self.change_analysis.is_some()
            || self.overall_assessment.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hedging_language: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strong_claims: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_messages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QaAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_evasive_questions: Option<Vec<EvasiveQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notable_insights: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvasiveQuestion {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyst: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evasion_tactics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_metrics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downplayed_metrics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_metrics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitivePositioning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentioned_competitors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_dynamics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitive_advantages: Option<Vec<String>>,
}

/// Where a served result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Fresh,
    Cached,
    Fallback,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Fresh => "fresh",
            Provenance::Cached => "cached",
            Provenance::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
