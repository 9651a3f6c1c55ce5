//! Response normalization and JSON repair.
//!
//! Provider output arrives in any of several shapes. Normalization reduces
//! every shape to text; parsing tries the cheap brace-slice extraction
//! first, then a dedicated repair completion, and finally degrades to a
//! sentinel object so the orchestrator always has a well-formed payload.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use acuity_providers::{CompletionRequest, Message, Provider, RawOutput, RawPart};

/// Repair prompts are truncated to this many characters.
const REPAIR_INPUT_LIMIT: usize = 8000;
/// Sentinel objects carry at most this much of the original text.
const SENTINEL_EXCERPT_LIMIT: usize = 500;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json|```").expect("static code fence pattern"));

/// Reduce any provider output shape to a single string.
///
/// Total over all variants: absent content becomes the empty string,
/// mapping fragments are reduced to their `"text"` field or their JSON
/// string form, and sequences are newline-joined.
pub fn normalize_output(raw: &RawOutput) -> String {
    match raw {
        RawOutput::Absent => String::new(),
        RawOutput::Text(text) => text.clone(),
        RawOutput::Object(map) => fragment_text(map),
        RawOutput::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                RawPart::Text(text) => text.clone(),
                RawPart::Fragment(map) => fragment_text(map),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn fragment_text(map: &serde_json::Map<String, Value>) -> String {
    match map.get("text") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => Value::Object(map.clone()).to_string(),
    }
}

/// Parse provider output into a JSON value, repairing if necessary.
///
/// An already-parsed mapping is returned unchanged. Otherwise the brace
/// slice of the normalized text is tried, then one repair completion, and
/// finally the sentinel object. This function never fails.
pub async fn parse_or_repair(
    raw: RawOutput,
    repair_provider: &dyn Provider,
    repair_model: &str,
) -> Value {
    if let RawOutput::Object(map) = raw {
        return Value::Object(map);
    }

    let raw_text = normalize_output(&raw);
    if let Some(value) = brace_slice_parse(&raw_text) {
        return value;
    }

    debug!(len = raw_text.len(), "strict parse failed, attempting repair");
    match repair(&raw_text, repair_provider, repair_model).await {
        Some(value) => value,
        None => {
            warn!("JSON repair failed, returning sentinel payload");
            sentinel(&raw_text)
        }
    }
}

/// Strict parse of the first-`{`-to-last-`}` slice.
fn brace_slice_parse(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

async fn repair(
    raw_text: &str,
    provider: &dyn Provider,
    model: &str,
) -> Option<Value> {
    let truncated: String = raw_text.chars().take(REPAIR_INPUT_LIMIT).collect();
    let request = CompletionRequest::new(
        model,
        vec![
            Message::system("You are a JSON fixer. Return ONLY valid JSON. No markdown."),
            Message::user(truncated),
        ],
    );

    let output = match provider.complete(&request).await {
        Ok(output) => output,
        Err(err) => {
            warn!(error = %err, "repair completion failed");
            return None;
        }
    };

    let cleaned = CODE_FENCE
        .replace_all(&normalize_output(&output), "")
        .trim()
        .to_string();

    if let Some(value) = brace_slice_parse(&cleaned) {
        return Some(value);
    }
    serde_json::from_str(&cleaned).ok()
}

fn sentinel(raw_text: &str) -> Value {
    let excerpt: String = raw_text.chars().take(SENTINEL_EXCERPT_LIMIT).collect();
    json!({
        "error": "JSON Parse Failed",
        "raw_output": format!("{excerpt}..."),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use acuity_providers::ProviderError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed output for every completion.
    struct CannedProvider {
        output: RawOutput,
        calls: AtomicUsize,
    }

    impl CannedProvider {
        fn text(text: &str) -> Self {
            Self {
                output: RawOutput::Text(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn id(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<RawOutput, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    fn object(pairs: &[(&str, Value)]) -> serde_json::Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_normalize_absent_is_empty() {
        assert_eq!(normalize_output(&RawOutput::Absent), "");
    }

    #[test]
    fn test_normalize_text_is_identity() {
        assert_eq!(
            normalize_output(&RawOutput::Text("hello".to_string())),
            "hello"
        );
    }

    #[test]
    fn test_normalize_object_prefers_text_field() {
        let map = object(&[("text", json!("inner")), ("kind", json!("note"))]);
        assert_eq!(normalize_output(&RawOutput::Object(map)), "inner");
    }

    #[test]
    fn test_normalize_object_without_text_field_stringifies() {
        let map = object(&[("status", json!("ok"))]);
        assert_eq!(
            normalize_output(&RawOutput::Object(map)),
            "{\"status\":\"ok\"}"
        );
    }

    #[test]
    fn test_normalize_parts_joins_with_newlines() {
        let parts = RawOutput::Parts(vec![
            RawPart::Text("first".to_string()),
            RawPart::Fragment(object(&[("text", json!("second"))])),
            RawPart::Fragment(object(&[("other", json!(1))])),
        ]);
        assert_eq!(
            normalize_output(&parts),
            "first\nsecond\n{\"other\":1}"
        );
    }

    #[test]
    fn test_normalize_non_string_text_field_stringifies() {
        let map = object(&[("text", json!(42))]);
        assert_eq!(normalize_output(&RawOutput::Object(map)), "42");
    }

    #[tokio::test]
    async fn test_parsed_mapping_is_returned_unchanged() {
        let provider = CannedProvider::text("unused");
        let map = object(&[("status", json!("ok"))]);

        let value = parse_or_repair(RawOutput::Object(map), &provider, "fixer").await;
        assert_eq!(value, json!({"status": "ok"}));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_brace_slice_extracts_embedded_json() {
        let provider = CannedProvider::text("unused");
        let raw = RawOutput::Text("Sure! Here it is: {\"a\": 1} Hope that helps.".to_string());

        let value = parse_or_repair(raw, &provider, "fixer").await;
        assert_eq!(value, json!({"a": 1}));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fenced_output_repairs_to_identical_object() {
        // The model wraps its answer in a markdown fence; the repair path
        // must produce the same object the unfenced string would.
        let provider = CannedProvider::text("```json\n{\"status\":\"ok\"}\n```");
        let raw = RawOutput::Text("not json at all".to_string());

        let repaired = parse_or_repair(raw, &provider, "fixer").await;
        assert_eq!(repaired, json!({"status": "ok"}));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repair_without_braces_parses_whole_string() {
        let provider = CannedProvider::text("```json\n[1, 2, 3]\n```");
        let raw = RawOutput::Text("still not json".to_string());

        let repaired = parse_or_repair(raw, &provider, "fixer").await;
        assert_eq!(repaired, json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_unrepairable_output_becomes_sentinel() {
        let provider = CannedProvider::text("I cannot fix this");
        let raw = RawOutput::Text("garbage with no structure".to_string());

        let value = parse_or_repair(raw, &provider, "fixer").await;
        assert_eq!(value["error"], "JSON Parse Failed");
        assert_eq!(
            value["raw_output"],
            "garbage with no structure..."
        );
    }

    #[tokio::test]
    async fn test_sentinel_truncates_long_output() {
        let provider = CannedProvider::text("nope");
        let long = "x".repeat(2000);
        let raw = RawOutput::Text(long);

        let value = parse_or_repair(raw, &provider, "fixer").await;
        let excerpt = value["raw_output"].as_str().unwrap();
        assert_eq!(excerpt.chars().count(), 503); // 500 chars + "..."
    }

    #[tokio::test]
    async fn test_repair_failure_error_becomes_sentinel() {
        struct FailingProvider;

        #[async_trait]
        impl Provider for FailingProvider {
            fn id(&self) -> &str {
                "failing"
            }

            async fn complete(
                &self,
                _request: &CompletionRequest,
            ) -> Result<RawOutput, ProviderError> {
                Err(ProviderError::Network("down".to_string()))
            }
        }

        let raw = RawOutput::Text("not json".to_string());
        let value = parse_or_repair(raw, &FailingProvider, "fixer").await;
        assert_eq!(value["error"], "JSON Parse Failed");
    }

    #[test]
    fn test_brace_slice_rejects_reversed_braces() {
        assert!(brace_slice_parse("} nothing {").is_none());
        assert!(brace_slice_parse("no braces at all").is_none());
    }
}
