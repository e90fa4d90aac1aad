//! Recovery of the structured critique embedded in raw model output.
//!
//! The repair grammar is closed: fence strip, brace slice, strict parse, then
//! one repaired parse (raw line breaks to spaces, trailing commas dropped).
//! Anything that still fails is reported, never evaluated loosely.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::FormatError;
use crate::mora::mora_count;
use crate::{EvaluationRecord, ADVICE, EXAMPLE_ANALYSIS, INPUT_ANALYSIS, READING, SYLLABLES};

const FENCE_JSON: &str = "```json";
const FENCE: &str = "```";

static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Remove a leading "```json" or "```" and a trailing "```".
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(FENCE_JSON) {
        text = rest;
    } else if let Some(rest) = text.strip_prefix(FENCE) {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// Slice from the first `{` to the last `}`, dropping prose around the object.
pub fn extract_object(text: &str) -> Result<&str, FormatError> {
    let start = text.find('{').ok_or(FormatError::NoObject)?;
    let end = text.rfind('}').ok_or(FormatError::NoObject)?;
    if end <= start {
        return Err(FormatError::NoObject);
    }
    Ok(&text[start..=end])
}

/// Turn raw line breaks into spaces and drop commas that directly precede a
/// closing brace or bracket.
pub fn repair(text: &str) -> String {
    let flattened: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    TRAILING_COMMA_RE.replace_all(&flattened, "$1").into_owned()
}

fn parse_object(text: &str) -> Result<Map<String, Value>, serde_json::Error> {
    serde_json::from_str(text)
}

/// Overwrite every phrase `syllables` with the mora count of its `reading`.
pub fn rewrite_syllables(record: &mut EvaluationRecord) {
    let fields = record.fields_mut();

    if let Some(Value::Array(phrases)) = fields.get_mut(INPUT_ANALYSIS) {
        recount(phrases);
    }

    if let Some(Value::Array(items)) = fields.get_mut(ADVICE) {
        for item in items.iter_mut() {
            if let Some(Value::Array(phrases)) = item.get_mut(EXAMPLE_ANALYSIS) {
                recount(phrases);
            }
        }
    }
}

fn recount(phrases: &mut [Value]) {
    for phrase in phrases.iter_mut() {
        let Value::Object(entry) = phrase else {
            continue;
        };
        let count = mora_count(entry.get(READING).and_then(Value::as_str).unwrap_or(""));
        entry.insert(SYLLABLES.to_string(), Value::from(count));
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Recover, repair and recount the critique carried by raw model output.
pub fn normalize(raw: &str) -> Result<EvaluationRecord, FormatError> {
    let cleaned = strip_fences(raw);
    let candidate = extract_object(cleaned)?;

    let fields = match parse_object(candidate) {
        Ok(fields) => fields,
        Err(_) => parse_object(&repair(candidate))
            .map_err(|e| FormatError::Malformed(e.to_string()))?,
    };

    let mut record = EvaluationRecord::from_map(fields);
    rewrite_syllables(&mut record);
    Ok(record)
}
