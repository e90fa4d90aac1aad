use serde_json::Value;

use crate::error::{Error, Result};

const SAFETY: &str = "SAFETY";

/// Raw text of the first candidate. Safety blocks, provider errors and empty
/// candidates are reported separately from format problems.
pub fn candidate_text(envelope: &Value) -> Result<&str> {
    if let Some(err) = envelope.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown provider error");
        return Err(Error::Upstream(message.to_string()));
    }

    let candidate = envelope.pointer("/candidates/0");
    if candidate
        .and_then(|c| c.get("finishReason"))
        .and_then(Value::as_str)
        == Some(SAFETY)
    {
        return Err(Error::SafetyBlocked);
    }

    match candidate
        .and_then(|c| c.pointer("/content/parts/0/text"))
        .and_then(Value::as_str)
    {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(Error::EmptyResponse),
    }
}
