use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod admin;
pub mod cached;
pub mod envelope;
pub mod error;
pub mod meter;
pub mod mora;
pub mod normalize;
pub mod reference;

pub use admin::{screen, AccessLog, AdminStore, Checker, LogStatus, MemoryStore};
pub use cached::{cached_sample, CACHED_MODEL, SAMPLE_POEM};
pub use envelope::candidate_text;
pub use error::{Error, FormatError, Result};
pub use meter::{check_meter, LineFit, MeterLine, MeterReport};
pub use mora::{mora_count, mora_count_opt};
pub use normalize::normalize;
pub use reference::{attach_reference_sample, ReferenceTanka, REFERENCE_TANKA};

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

pub(crate) struct Tuning {
    pub(crate) models: &'static [&'static str],
    pub(crate) tanka_pattern: [usize; 5],
    pub(crate) default_sample_id: u64,
    pub(crate) log_preview_chars: usize,
    pub(crate) log_capacity: usize,
}

pub(crate) static TUNING: Tuning = Tuning {
    models: &[
        "gemini-2.0-flash-exp",
        "gemini-1.5-pro-002",
        "gemini-1.5-pro",
        "gemini-1.5-flash-002",
        "gemini-1.5-flash",
    ],
    tanka_pattern: [5, 7, 5, 7, 7],
    default_sample_id: 1,
    log_preview_chars: 50,
    log_capacity: 100,
};

// Field names of the record contract shared with the rendering layer.
pub(crate) const INPUT_ANALYSIS: &str = "inputAnalysis";
pub(crate) const ADVICE: &str = "advice";
pub(crate) const EXAMPLE_ANALYSIS: &str = "exampleAnalysis";
pub(crate) const READING: &str = "reading";
pub(crate) const SYLLABLES: &str = "syllables";
pub(crate) const SAMPLE_ID: &str = "sampleId";
pub(crate) const SAMPLE: &str = "sample";
pub(crate) const USED_MODEL: &str = "usedModel";
pub(crate) const API_VERSION: &str = "apiVersion";

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// One verse segment with its kana reading and mora count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phrase {
    pub part: String,
    pub reading: String,
    pub syllables: usize,
}

/// Structured critique recovered from model output.
///
/// Only the `syllables` of phrase entries are ever rewritten; every other
/// field is carried exactly as parsed, key order included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationRecord(Map<String, Value>);

impl EvaluationRecord {
    pub(crate) fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Record which model produced the critique and which build served it.
    pub fn stamp_model(&mut self, model: &str) {
        self.0.insert(USED_MODEL.to_string(), Value::from(model));
        self.0.insert(
            API_VERSION.to_string(),
            Value::from(env!("CARGO_PKG_VERSION")),
        );
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Phrases of the submitted poem. Entries that are not phrase-shaped are left out.
    pub fn input_phrases(&self) -> Vec<Phrase> {
        self.get(INPUT_ANALYSIS)
            .map(phrases_from)
            .unwrap_or_default()
    }

    /// Phrase breakdowns of each revision example, one per advice entry
    /// (empty when the entry carries none).
    pub fn example_phrases(&self) -> Vec<Vec<Phrase>> {
        match self.get(ADVICE) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.get(EXAMPLE_ANALYSIS)
                        .map(phrases_from)
                        .unwrap_or_default()
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Typed read-only view for renderers. Absent fields take defaults.
    pub fn evaluation(&self) -> std::result::Result<Evaluation, serde_json::Error> {
        Evaluation::deserialize(&Value::Object(self.0.clone()))
    }
}

fn phrases_from(value: &Value) -> Vec<Phrase> {
    match value {
        Value::Array(entries) => entries
            .iter()
            .filter(|e| e.is_object())
            .filter_map(|e| Phrase::deserialize(e).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scores {
    pub rhythm: f64,
    pub imagery: f64,
    pub originality: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Comments {
    pub rhythm: String,
    pub imagery: String,
    pub originality: String,
    pub general: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Advice {
    pub suggestion: String,
    pub example: String,
    pub example_analysis: Vec<Phrase>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub genre: String,
    pub tone: String,
    pub style: String,
    pub next_topic_recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleTanka {
    pub text: String,
    pub author: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Evaluation {
    pub input_analysis: Vec<Phrase>,
    pub scores: Scores,
    pub comments: Comments,
    pub advice: Vec<Advice>,
    pub theme: Theme,
    pub sample: Option<SampleTanka>,
    pub used_model: Option<String>,
    pub api_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> EvaluationRecord {
        match value {
            Value::Object(map) => EvaluationRecord::from_map(map),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn input_phrases_skip_non_objects() {
        let r = record(json!({
            "inputAnalysis": [
                {"part": "春の夜の", "reading": "はるのよの", "syllables": 5},
                "stray",
                {"part": "夢ばかりなる"}
            ]
        }));
        let phrases = r.input_phrases();
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].reading, "はるのよの");
        assert_eq!(phrases[1].reading, "");
    }

    #[test]
    fn example_phrases_follow_advice_order() {
        let r = record(json!({
            "advice": [
                {"suggestion": "a"},
                {"suggestion": "b", "exampleAnalysis": [{"reading": "あさ", "syllables": 2}]}
            ]
        }));
        let examples = r.example_phrases();
        assert_eq!(examples.len(), 2);
        assert!(examples[0].is_empty());
        assert_eq!(examples[1][0].syllables, 2);
    }

    #[test]
    fn typed_view_tolerates_missing_sections() {
        let r = record(json!({"scores": {"rhythm": 20, "imagery": 25, "originality": 30, "total": 75}}));
        let eval = r.evaluation().unwrap();
        assert_eq!(eval.scores.total, 75.0);
        assert!(eval.input_analysis.is_empty());
        assert!(eval.sample.is_none());
    }

    #[test]
    fn serializes_as_plain_object() {
        let r = record(json!({"b": 1, "a": 2}));
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"b":1,"a":2}"#);
    }
}
