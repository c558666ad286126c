//! Parsing stages, cheapest first
//!
//! Each stage either yields a JSON object or reports why it could not. The
//! decoder chains them with `or_else`, so well-formed output never pays for
//! the later stages.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::{DecodeError, DecodeResult};
use crate::payload::Card;

pub type JsonObject = Map<String, Value>;

static LEADING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?").unwrap());

static TRAILING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n?```\s*$").unwrap());

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").unwrap());

static QUESTION_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""question"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());

static ANSWER_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""answer"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());

const FULL_WIDTH_COMMA: char = '\u{FF0C}';

/// Remove a markdown code fence (with optional language tag) around the text.
pub fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_leading = LEADING_FENCE_RE.replace(trimmed, "");
    let without_trailing = TRAILING_FENCE_RE.replace(&without_leading, "");
    without_trailing.trim().to_string()
}

/// Parse the whole text as a JSON object.
pub fn parse_direct(text: &str) -> DecodeResult<JsonObject> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| DecodeError::InvalidJson(err.to_string()))?;
    into_object(value)
}

/// Parse the span from the first `{` to the last `}` after light repairs.
pub fn extract_and_repair(text: &str) -> DecodeResult<JsonObject> {
    let span = outer_braces(text)
        .ok_or_else(|| DecodeError::InvalidJson("no JSON object in text".to_string()))?;
    let repaired = repair(span);
    let value: Value = serde_json::from_str(&repaired)
        .map_err(|err| DecodeError::InvalidJson(format!("after repair: {err}")))?;
    into_object(value)
}

/// Greedy outer-brace span: first `{` through last `}`.
pub fn outer_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Drop trailing commas before `}`/`]` and normalize full-width commas.
pub fn repair(text: &str) -> String {
    let normalized = text.replace(FULL_WIDTH_COMMA, ",");
    TRAILING_COMMA_RE.replace_all(&normalized, "$1").into_owned()
}

/// Pair the i-th `"question"` string with the i-th `"answer"` string found
/// anywhere in the text.
pub fn scrape_cards(raw: &str, category: &str) -> Vec<Card> {
    let questions = QUESTION_FIELD_RE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).map(|m| unescape(m.as_str())));
    let answers = ANSWER_FIELD_RE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).map(|m| unescape(m.as_str())));

    questions
        .zip(answers)
        .map(|(question, answer)| Card {
            question,
            answer,
            category: category.to_string(),
        })
        .collect()
}

fn unescape(literal: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{literal}\"")).unwrap_or_else(|_| literal.to_string())
}

fn into_object(value: Value) -> DecodeResult<JsonObject> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::InvalidJson(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
