use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cached::CACHED_MODEL;
use crate::error::{Error, Result};
use crate::{attach_reference_sample, cached_sample, normalize, EvaluationRecord, TUNING};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStatus {
    Success,
    Blocked,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    /// Leading part of the submitted poem.
    pub text: String,
    pub model: String,
    pub status: LogStatus,
    pub app_version: String,
}

impl AccessLog {
    pub fn new(ip: &str, poem: &str, model: &str, status: LogStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            ip: ip.to_string(),
            text: poem.chars().take(TUNING.log_preview_chars).collect(),
            model: model.to_string(),
            status,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub trait AdminStore: Send + Sync {
    fn append_log(&self, entry: AccessLog);

    /// Newest first.
    fn recent_logs(&self, limit: usize) -> Vec<AccessLog>;

    fn ng_words(&self) -> Vec<String>;

    fn set_ng_words(&self, words: Vec<String>);
}

/// Process-local store. Contents are lost on restart.
pub struct MemoryStore {
    logs: Mutex<VecDeque<AccessLog>>,
    ng_words: Mutex<Vec<String>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(TUNING.log_capacity)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            logs: Mutex::new(VecDeque::with_capacity(capacity)),
            ng_words: Mutex::new(Vec::new()),
            capacity,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn clean_words(words: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let word = word.trim();
        if !word.is_empty() && !out.iter().any(|w| w == word) {
            out.push(word.to_string());
        }
    }
    out
}

impl AdminStore for MemoryStore {
    fn append_log(&self, entry: AccessLog) {
        let mut logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        logs.push_front(entry);
        logs.truncate(self.capacity);
    }

    fn recent_logs(&self, limit: usize) -> Vec<AccessLog> {
        let logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        logs.iter().take(limit).cloned().collect()
    }

    fn ng_words(&self) -> Vec<String> {
        self.ng_words
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_ng_words(&self, words: Vec<String>) {
        *self.ng_words.lock().unwrap_or_else(|e| e.into_inner()) = clean_words(words);
    }
}

// ---------------------------------------------------------------------------
// Screening
// ---------------------------------------------------------------------------

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// First NG word found in the poem, ignoring whitespace and letter case.
pub fn screen(poem: &str, ng_words: &[String]) -> Option<String> {
    let poem = squash(poem);
    ng_words
        .iter()
        .find(|w| {
            let w = squash(w);
            !w.is_empty() && poem.contains(&w)
        })
        .cloned()
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct Checker<S: AdminStore> {
    store: S,
    models: Vec<String>,
}

impl<S: AdminStore> Checker<S> {
    pub fn new(store: S) -> Self {
        let models = TUNING.models.iter().map(|m| m.to_string()).collect();
        Self::with_models(store, models)
    }

    pub fn with_models(store: S, models: Vec<String>) -> Self {
        Self { store, models }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Screen, fetch, normalize and cite for one submission, logging the outcome.
    ///
    /// `fetch(model, poem)` returns the raw model text. Models are tried in
    /// order; an upstream, empty or IO failure moves on to the next one.
    /// Nothing is fetched for an empty, blocked or bundled-sample poem.
    pub fn evaluate<F>(&self, ip: &str, poem: &str, mut fetch: F) -> Result<EvaluationRecord>
    where
        F: FnMut(&str, &str) -> Result<String>,
    {
        if poem.trim().is_empty() {
            return Err(Error::EmptyPoem);
        }

        if let Some(word) = screen(poem, &self.store.ng_words()) {
            warn!(ip, word = %word, "submission blocked");
            self.store
                .append_log(AccessLog::new(ip, poem, "-", LogStatus::Blocked));
            return Err(Error::Blocked(word));
        }

        if let Some(record) = cached_sample(poem) {
            debug!(ip, "serving bundled sample evaluation");
            self.store
                .append_log(AccessLog::new(ip, poem, CACHED_MODEL, LogStatus::Success));
            return Ok(record);
        }

        let (model, text) = match self.generate(ip, poem, &mut fetch) {
            Ok(generated) => generated,
            Err(e) => {
                error!(ip, kind = e.kind(), error = %e, "generation failed");
                self.store
                    .append_log(AccessLog::new(ip, poem, "-", LogStatus::Error));
                return Err(e);
            }
        };

        match normalize(&text) {
            Ok(mut record) => {
                let sample = attach_reference_sample(&mut record);
                info!(
                    ip,
                    model = %model,
                    sample_id = sample.id,
                    phrases = record.input_phrases().len(),
                    "evaluation normalized"
                );
                record.stamp_model(model);
                self.store
                    .append_log(AccessLog::new(ip, poem, model, LogStatus::Success));
                Ok(record)
            }
            Err(e) => {
                error!(ip, model = %model, error = %e, "model output unusable");
                self.store
                    .append_log(AccessLog::new(ip, poem, model, LogStatus::Error));
                Err(e.into())
            }
        }
    }

    fn generate<F>(&self, ip: &str, poem: &str, fetch: &mut F) -> Result<(&str, String)>
    where
        F: FnMut(&str, &str) -> Result<String>,
    {
        let mut last = None;
        for model in &self.models {
            match fetch(model, poem) {
                Ok(text) => return Ok((model.as_str(), text)),
                Err(e) if e.is_retryable() => {
                    warn!(ip, model = %model, error = %e, "model failed, trying next");
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last.unwrap_or_else(|| Error::Upstream("no models configured".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FormatError;

    fn checker() -> Checker<MemoryStore> {
        Checker::with_models(MemoryStore::new(), vec!["test-model".to_string()])
    }

    #[test]
    fn log_preview_is_truncated_by_chars() {
        let poem = "あ".repeat(80);
        let log = AccessLog::new("127.0.0.1", &poem, "m", LogStatus::Success);
        assert_eq!(log.text.chars().count(), 50);
        assert_eq!(serde_json::to_value(&log).unwrap()["status"], "SUCCESS");
    }

    #[test]
    fn store_keeps_newest_first_within_capacity() {
        let store = MemoryStore::with_capacity(3);
        for i in 0..5 {
            store.append_log(AccessLog::new(&i.to_string(), "p", "m", LogStatus::Success));
        }
        let logs = store.recent_logs(10);
        let ips: Vec<&str> = logs.iter().map(|l| l.ip.as_str()).collect();
        assert_eq!(ips, vec!["4", "3", "2"]);
        assert_eq!(store.recent_logs(1).len(), 1);
    }

    #[test]
    fn ng_words_are_cleaned() {
        let store = MemoryStore::new();
        store.set_ng_words(vec![" 死 ".into(), "".into(), "死".into(), "spam".into()]);
        assert_eq!(store.ng_words(), vec!["死".to_string(), "spam".to_string()]);
    }

    #[test]
    fn screen_ignores_spacing_and_case() {
        let words = vec!["除草剤".to_string(), "SPAM".to_string()];
        assert_eq!(screen("まいた 除 草剤", &words), Some("除草剤".to_string()));
        assert_eq!(screen("buy spam now", &words), Some("SPAM".to_string()));
        assert_eq!(screen("はるのよの", &words), None);
    }

    #[test]
    fn empty_poem_is_rejected_before_fetch() {
        let checker = checker();
        let result = checker.evaluate("ip", " \n\u{3000}", |_, _| panic!("fetched"));
        assert!(matches!(result, Err(Error::EmptyPoem)));
        assert!(checker.store().recent_logs(1).is_empty());
    }

    #[test]
    fn blocked_poem_never_fetches() {
        let checker = checker();
        checker.store().set_ng_words(vec!["夢".into()]);
        let result = checker.evaluate("ip", "春の夜の夢", |_, _| panic!("fetched"));
        assert!(matches!(result, Err(Error::Blocked(w)) if w == "夢"));
        assert_eq!(checker.store().recent_logs(1)[0].status, LogStatus::Blocked);
    }

    #[test]
    fn successful_evaluation_is_recounted_cited_and_stamped() {
        let checker = checker();
        let raw = r#"{"inputAnalysis":[{"part":"きゃ","reading":"きゃ","syllables":99}],"sampleId":6}"#;
        let record = checker
            .evaluate("ip", "きゃ", |_, _| Ok(raw.to_string()))
            .unwrap();
        assert_eq!(record.input_phrases()[0].syllables, 1);
        assert_eq!(record.get("sample").unwrap()["author"], "周防内侍");

        let eval = record.evaluation().unwrap();
        assert_eq!(eval.used_model.as_deref(), Some("test-model"));
        assert_eq!(eval.api_version.as_deref(), Some(env!("CARGO_PKG_VERSION")));

        let log = &checker.store().recent_logs(1)[0];
        assert_eq!(log.status, LogStatus::Success);
        assert_eq!(log.model, "test-model");
    }

    #[test]
    fn live_and_cached_results_share_stamp_fields() {
        let checker = checker();
        let live = checker
            .evaluate("ip", "きゃ", |_, _| Ok("{}".to_string()))
            .unwrap();
        let cached = checker
            .evaluate("ip", crate::SAMPLE_POEM, |_, _| panic!("fetched"))
            .unwrap();
        for field in ["usedModel", "apiVersion", "sample"] {
            assert!(live.get(field).is_some(), "live result lacks {field}");
            assert!(cached.get(field).is_some(), "cached result lacks {field}");
        }
        assert_eq!(cached.get("usedModel").unwrap(), CACHED_MODEL);
    }

    #[test]
    fn falls_back_to_next_model_on_upstream_failure() {
        let models = vec!["first".to_string(), "second".to_string(), "third".to_string()];
        let checker = Checker::with_models(MemoryStore::new(), models);
        let mut tried = Vec::new();
        let record = checker
            .evaluate("ip", "はるのよの", |model, _| {
                tried.push(model.to_string());
                match model {
                    "first" => Err(Error::Upstream("503".into())),
                    "second" => Err(Error::EmptyResponse),
                    _ => Ok("{}".to_string()),
                }
            })
            .unwrap();
        assert_eq!(tried, vec!["first", "second", "third"]);
        assert_eq!(record.get("usedModel").unwrap(), "third");
        assert_eq!(checker.store().recent_logs(1)[0].model, "third");
    }

    #[test]
    fn all_models_failing_reports_the_last_error() {
        let models = vec!["a".to_string(), "b".to_string()];
        let checker = Checker::with_models(MemoryStore::new(), models);
        let result = checker.evaluate("ip", "poem", |model, _| Err(Error::Upstream(model.into())));
        assert!(matches!(result, Err(Error::Upstream(m)) if m == "b"));
        assert_eq!(checker.store().recent_logs(1)[0].status, LogStatus::Error);
    }

    #[test]
    fn safety_block_does_not_fall_back() {
        let models = vec!["a".to_string(), "b".to_string()];
        let checker = Checker::with_models(MemoryStore::new(), models);
        let mut calls = 0;
        let result = checker.evaluate("ip", "poem", |_, _| {
            calls += 1;
            Err(Error::SafetyBlocked)
        });
        assert!(matches!(result, Err(Error::SafetyBlocked)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn format_failure_is_logged_and_not_retried() {
        let models = vec!["a".to_string(), "b".to_string()];
        let checker = Checker::with_models(MemoryStore::new(), models);
        let result = checker.evaluate("ip", "poem", |_, _| Ok("sorry, no json".to_string()));
        assert!(matches!(result, Err(Error::Format(FormatError::NoObject))));
        let log = &checker.store().recent_logs(1)[0];
        assert_eq!(log.status, LogStatus::Error);
        assert_eq!(log.model, "a");
    }
}
