use crate::domain::key::AnalysisKey;
use crate::ingest::types::TranscriptRecord;

fn schema() -> String {
    [
        "{",
        "  \"executive_analysis\": {",
        "    \"overall_tone\": \"very negative/negative/neutral/positive/very positive\",",
        "    \"confidence_level\": \"very low/low/moderate/high/very high\",",
        "    \"hedging_language\": [\"EXACT QUOTES of uncertain or cautious language with brief context\"],",
        "    \"strong_claims\": [\"EXACT QUOTES of definitive statements with brief context\"],",
        "    \"key_messages\": [\"Primary points emphasized with SPECIFIC metrics or examples\"]",
        "  },",
        "  \"qa_analysis\": {",
        "    \"most_evasive_questions\": [",
        "      {",
        "        \"question\": \"EXACT QUOTE of the challenging question\",",
        "        \"analyst\": \"Analyst name and firm\",",
        "        \"directness\": \"CHOOSE ONE: very evasive (completely avoided answering), somewhat evasive (answered different question than asked), neutral (partial answer), somewhat direct (mostly answered), very direct (fully answered)\",",
        "        \"evasion_tactics\": [\"SPECIFIC tactics with EXACT QUOTED phrases from response\"]",
        "      }",
        "    ],",
        "    \"notable_insights\": [\"Specific revelations from Q&A with EXACT QUOTES and implications\"]",
        "  },",
        "  \"financial_metrics\": {",
        "    \"highlighted_metrics\": [\"SPECIFIC metrics with EXACT numbers management emphasized\"],",
        "    \"downplayed_metrics\": [\"SPECIFIC metrics with EXACT numbers that received minimal discussion\"],",
        "    \"new_metrics\": [\"Any new KPIs or measures introduced with EXACT definition provided\"]",
        "  },",
        "  \"competitive_positioning\": {",
        "    \"mentioned_competitors\": [\"Companies EXPLICITLY named with EXACT QUOTES and context\"],",
        "    \"market_dynamics\": [\"SPECIFIC industry trends discussed with EXACT QUOTES\"],",
        "    \"competitive_advantages\": [\"SPECIFIC advantages claimed with EXACT QUOTES and evidence\"]",
        "  },",
        "  \"forward_looking_statements\": [\"EXACT QUOTES of projections with SPECIFIC numbers and timeframes\"],",
        "  \"red_flags\": [\"Concerning elements with EXACT QUOTES and historical context\"],",
        "  \"change_analysis\": [\"Notable shifts in messaging from previous quarters with EXACT comparisons\"],",
        "  \"overall_assessment\": \"Detailed assessment including strongest and weakest points backed by SPECIFIC evidence\"",
        "}",
    ]
    .join("\n")
}

/// Builds the analysis prompt. The transcript JSON is embedded verbatim.
pub fn analysis_prompt(key: &AnalysisKey, transcript: &TranscriptRecord) -> String {
    let ticker = key.ticker();
    let date = transcript.date().unwrap_or("recent date");

    let focus = [
        "1. Executive language patterns, tone, and confidence during prepared remarks",
        "2. Specific claims made about performance, with exact metrics and numbers",
        "3. How executives handle challenging questions from analysts",
        "4. Financial metrics they emphasize or avoid discussing",
        "5. Competitive landscape and market positioning",
        "6. Forward-looking statements and guidance",
        "7. Changes in messaging compared to previous communications",
    ]
    .join("\n");

    let rules = [
        "1. Your entire response must be ONLY this JSON object with NO other text before or after",
        "2. Do not include any explanation, introduction, or any text outside the JSON structure",
        "3. Do not wrap the JSON in markdown code blocks or any other formatting",
        "4. Ensure the JSON is properly formatted with no syntax errors",
        "5. Do not include any non-JSON text in your response whatsoever",
    ]
    .join("\n");

    format!(
        "You are a senior financial analyst with extensive experience analyzing {ticker}'s industry and competitors. \
You're examining {ticker}'s Q{quarter} {year} earnings call transcript from {date}.\n\n\
Analyze this transcript thoroughly and provide detailed, specific insights based on actual content from the transcript, \
not generic observations. Focus on:\n\n{focus}\n\n\
Here's the transcript:\n{transcript}\n\n\
Provide your analysis in this exact JSON format:\n\n{schema}\n\n\
CRITICALLY IMPORTANT:\n{rules}",
        quarter = key.quarter(),
        year = key.year(),
        transcript = transcript.to_prompt_json(),
        schema = schema(),
    )
}
