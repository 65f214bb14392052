use crate::domain::analysis::AnalysisResult;
use crate::domain::contract::validate_and_into_result;
use anyhow::{bail, Context};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

const FENCE: &str = "```";

/// Extraction tiers, tried in declaration order until one yields a payload
/// that both parses and passes the schema gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A fenced block tagged `json`.
    TaggedFence,
    /// Any fenced block, tagged or not.
    AnyFence,
    /// The whole text as-is.
    Direct,
    /// First `{` through last `}`.
    BraceSpan,
    /// Brace span after bounded textual repairs.
    LenientRepair,
}

impl Strategy {
    pub const CHAIN: [Strategy; 5] = [
        Strategy::TaggedFence,
        Strategy::AnyFence,
        Strategy::Direct,
        Strategy::BraceSpan,
        Strategy::LenientRepair,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::TaggedFence => "tagged_fence",
            Strategy::AnyFence => "any_fence",
            Strategy::Direct => "direct",
            Strategy::BraceSpan => "brace_span",
            Strategy::LenientRepair => "lenient_repair",
        }
    }

    fn apply(self, text: &str) -> anyhow::Result<AnalysisResult> {
        match self {
            Strategy::TaggedFence => {
                let blocks: Vec<_> = fenced_blocks(text)
                    .into_iter()
                    .filter(|b| is_json_tag(b.info))
                    .collect();
                first_valid_block(&blocks, "no ```json fenced block found")
            }
            Strategy::AnyFence => first_valid_block(&fenced_blocks(text), "no fenced block found"),
            Strategy::Direct => parse_candidate(text),
            Strategy::BraceSpan => {
                let span = brace_span(text).context("no {...} span found")?;
                parse_candidate(span)
            }
            Strategy::LenientRepair => {
                let repaired = repair(text)?;
                parse_candidate(&repaired)
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "could not extract analysis JSON (tried {}): {last_error}",
    strategy_list(.tried_strategies)
)]
pub struct ExtractionError {
    pub tried_strategies: Vec<Strategy>,
    pub last_error: String,
}

fn strategy_list(strategies: &[Strategy]) -> String {
    strategies
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Coerces raw model output into an [`AnalysisResult`].
pub fn extract(text: &str) -> Result<AnalysisResult, ExtractionError> {
    extract_with_strategy(text).map(|(result, _)| result)
}

/// Like [`extract`], also reporting which tier succeeded.
pub fn extract_with_strategy(text: &str) -> Result<(AnalysisResult, Strategy), ExtractionError> {
    let mut tried = Vec::with_capacity(Strategy::CHAIN.len());
    let mut last_error = String::new();

    for strategy in Strategy::CHAIN {
        tried.push(strategy);
        match strategy.apply(text) {
            Ok(result) => {
                tracing::info!(%strategy, "extracted analysis JSON");
                return Ok((result, strategy));
            }
            Err(err) => {
                tracing::debug!(%strategy, error = %format!("{err:#}"), "extraction strategy failed");
                last_error = format!("{strategy}: {err:#}");
            }
        }
    }

    Err(ExtractionError {
        tried_strategies: tried,
        last_error,
    })
}

fn parse_candidate(candidate: &str) -> anyhow::Result<AnalysisResult> {
    let value = serde_json::from_str::<Value>(candidate.trim()).context("invalid JSON")?;
    validate_and_into_result(value)
}

fn first_valid_block(blocks: &[FencedBlock<'_>], none_msg: &'static str) -> anyhow::Result<AnalysisResult> {
    let mut last_err = None;
    for block in blocks {
        match parse_candidate(block.body) {
            Ok(result) => return Ok(result),
            Err(err) => last_err = Some(err),
        }
    }
    match last_err {
        Some(err) => Err(err),
        None => bail!(none_msg),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FencedBlock<'a> {
    info: &'a str,
    body: &'a str,
}

/// Markdown-style fenced blocks in order of appearance. An unterminated final
/// fence runs to the end of the text.
fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let line_end = after_open.find('\n').unwrap_or(after_open.len());
        let first_line = &after_open[..line_end];

        // Single-line block: ```{...}```
        if let Some(close) = first_line.find(FENCE) {
            out.push(FencedBlock {
                info: "",
                body: &first_line[..close],
            });
            rest = &after_open[close + FENCE.len()..];
            continue;
        }

        let (info, body_start) = if first_line
            .trim_start()
            .starts_with(|c: char| c == '{' || c == '[')
        {
            ("", 0)
        } else {
            (first_line.trim(), (line_end + 1).min(after_open.len()))
        };

        let body_region = &after_open[body_start..];
        match body_region.find(FENCE) {
            Some(close) => {
                out.push(FencedBlock {
                    info,
                    body: &body_region[..close],
                });
                rest = &body_region[close + FENCE.len()..];
            }
            None => {
                out.push(FencedBlock {
                    info,
                    body: body_region,
                });
                break;
            }
        }
    }

    out
}

fn is_json_tag(info: &str) -> bool {
    info.split_whitespace()
        .next()
        .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Bounded repairs: cut to the brace span, undo a doubly escaped payload,
/// normalize quote characters and drop trailing separators.
fn repair(text: &str) -> anyhow::Result<String> {
    let span = brace_span(text).context("no {...} span to repair")?;

    let span: Cow<'_, str> = if looks_escaped(span) {
        Cow::Owned(span.replace("\\n", " ").replace("\\\"", "\""))
    } else {
        Cow::Borrowed(span)
    };

    Ok(normalize_quotes_and_separators(&span))
}

/// `{\"key\": ...}`: the model returned a JSON document as a string literal.
fn looks_escaped(span: &str) -> bool {
    span[1..].trim_start().starts_with("\\\"")
}

/// String delimiters accepted by the repair pass, as (opener, closer). A string
/// closes only on the closer paired with its opener, so `’` used as an
/// apostrophe inside `'...'` stays text.
const QUOTE_PAIRS: [(char, char); 6] = [
    ('"', '"'),
    ('\u{201C}', '\u{201D}'),
    ('\u{201D}', '\u{201D}'),
    ('\'', '\''),
    ('\u{2018}', '\u{2019}'),
    ('\u{2019}', '\u{2019}'),
];

fn closing_quote(opener: char) -> Option<char> {
    QUOTE_PAIRS
        .iter()
        .find(|(open, _)| *open == opener)
        .map(|(_, close)| *close)
}

fn normalize_quotes_and_separators(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(closer) = closing_quote(c) {
            i = copy_string(&chars, i, closer, &mut out);
        } else if c == ',' && next_significant(&chars, i + 1).is_some_and(|n| n == '}' || n == ']')
        {
            // Trailing separator.
        } else {
            out.push(c);
        }
        i += 1;
    }

    out
}

/// Copies the string opened at `start` as a straight double-quoted JSON string
/// and returns the index of its closing delimiter.
fn copy_string(chars: &[char], start: usize, closer: char, out: &mut String) -> usize {
    let straight = chars[start] == '"';
    out.push('"');
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            if next == '\'' {
                out.push('\'');
            } else {
                out.push(c);
                out.push(next);
            }
            i += 2;
            continue;
        }
        if c == closer {
            out.push('"');
            return i;
        }
        match c {
            '"' if !straight => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
        i += 1;
    }

    i
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}
