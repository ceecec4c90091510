//! Field extraction from free-form job events.
//!
//! Webhook senders nest job data inconsistently, so identifiers are looked
//! up at the top level first, then under `payload`, then under `data`.

use serde_json::{Map, Value};

/// Default character budget for evidence passed to the text judge.
pub const EVIDENCE_MAX_CHARS: usize = 4000;

const SCOPES: [Option<&str>; 3] = [None, Some("payload"), Some("data")];

const CRITERIA_KEYS: [&str; 6] = ["criteria", "requirements", "spec", "task", "instructions", "prompt"];
const DELIVERABLE_KEYS: [&str; 5] = ["deliverable", "output", "result", "submission", "artifact"];

fn scope<'a>(event: &'a Value, name: Option<&str>) -> Option<&'a Map<String, Value>> {
    match name {
        None => event.as_object(),
        Some(key) => event.as_object()?.get(key)?.as_object(),
    }
}

/// Non-blank trimmed string.
fn pick_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-blank string, or a non-negative integer rendered in decimal.
fn pick_identifier(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::Number(n)) => n.as_u64().map(|n| n.to_string()),
        other => pick_string(other),
    }
}

fn find_scoped<F>(event: &Value, keys: &[&str], pick: F) -> Option<String>
where
    F: Fn(Option<&Value>) -> Option<String>,
{
    SCOPES
        .iter()
        .filter_map(|name| scope(event, *name))
        .flat_map(|map| keys.iter().map(move |key| map.get(*key)))
        .find_map(pick)
}

pub fn job_id(event: &Value) -> Option<String> {
    find_scoped(event, &["jobId", "job_id"], pick_identifier)
}

pub fn memo_id(event: &Value) -> Option<String> {
    find_scoped(event, &["memoId", "memo_id"], pick_identifier)
}

pub fn evaluator_address(event: &Value) -> Option<String> {
    find_scoped(event, &["evaluator", "evaluator_address"], pick_string)
}

/// Declared job types in lookup order: `jobType`/`job_type` at the top
/// level, under `payload`, under `data`, then `deliverable.type`.
pub fn job_type_hints(event: &Value) -> impl Iterator<Item = String> + '_ {
    let scoped = SCOPES
        .into_iter()
        .filter_map(move |name| scope(event, name))
        .flat_map(|map| ["jobType", "job_type"].into_iter().map(move |key| map.get(key)));
    let declared = std::iter::once(
        event
            .get("deliverable")
            .and_then(Value::as_object)
            .and_then(|d| d.get("type")),
    );
    scoped.chain(declared).filter_map(pick_string)
}

/// Top-level fields overlaid with `payload` (or else `data`) fields.
pub fn merged_payload(event: &Value) -> Map<String, Value> {
    let mut merged = event.as_object().cloned().unwrap_or_default();
    let nested = scope(event, Some("payload")).or_else(|| scope(event, Some("data")));
    if let Some(nested) = nested {
        for (key, value) in nested {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

pub fn criteria(event: &Value) -> Option<String> {
    let payload = merged_payload(event);
    CRITERIA_KEYS.iter().find_map(|key| pick_string(payload.get(*key)))
}

/// First non-null deliverable-like field.
pub fn deliverable(event: &Value) -> Option<Value> {
    let payload = merged_payload(event);
    DELIVERABLE_KEYS
        .iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| !value.is_null())
        .cloned()
}

/// Code found in a deliverable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedCode {
    pub code: Option<String>,
    pub language: Option<String>,
}

pub fn extract_code(event: &Value) -> ExtractedCode {
    match deliverable(event) {
        Some(Value::String(text)) => ExtractedCode {
            code: Some(text.trim().to_string()).filter(|code| !code.is_empty()),
            language: None,
        },
        Some(Value::Object(map)) => {
            let code = ["code", "source", "content", "snippet"]
                .iter()
                .find_map(|key| pick_string(map.get(*key)));
            match code {
                Some(code) => ExtractedCode {
                    code: Some(code),
                    language: pick_string(map.get("language")).or_else(|| pick_string(map.get("lang"))),
                },
                None => ExtractedCode::default(),
            }
        }
        _ => ExtractedCode::default(),
    }
}

/// Render a deliverable as judge evidence, truncated to `max_chars`.
pub fn format_evidence(deliverable: Option<&Value>, max_chars: usize) -> String {
    match deliverable {
        None | Some(Value::Null) => "<no deliverable provided>".to_string(),
        Some(Value::String(text)) => truncate(text, max_chars, "\n...<truncated>"),
        Some(other) => {
            let rendered = serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string());
            truncate(&rendered, max_chars, "\n...<truncated>")
        }
    }
}

/// Truncate on character boundaries, appending `marker` when cut.
pub fn truncate(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], marker),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_id_lookup_order() {
        assert_eq!(job_id(&json!({"jobId": " 42 "})).as_deref(), Some("42"));
        assert_eq!(job_id(&json!({"job_id": 7})).as_deref(), Some("7"));
        assert_eq!(
            job_id(&json!({"jobId": "", "payload": {"job_id": "9"}, "data": {"jobId": "10"}})).as_deref(),
            Some("9")
        );
        assert_eq!(job_id(&json!({"data": {"jobId": "10"}})).as_deref(), Some("10"));
        assert_eq!(job_id(&json!({"jobId": -1})), None);
        assert_eq!(job_id(&json!("string event")), None);
    }

    #[test]
    fn test_memo_and_evaluator() {
        let event = json!({"payload": {"memo_id": "5", "evaluator_address": "0xABC"}});
        assert_eq!(memo_id(&event).as_deref(), Some("5"));
        assert_eq!(evaluator_address(&event).as_deref(), Some("0xABC"));
        assert_eq!(evaluator_address(&json!({"evaluator": 12})), None);
    }

    #[test]
    fn test_job_type_hints_in_lookup_order() {
        let event = json!({
            "jobType": "review",
            "payload": {"job_type": "Code Review"},
            "data": {"jobType": "  "},
            "deliverable": {"type": "text"}
        });
        let hints: Vec<String> = job_type_hints(&event).collect();
        assert_eq!(hints, vec!["review", "Code Review", "text"]);
        assert_eq!(job_type_hints(&json!({})).count(), 0);
        assert_eq!(job_type_hints(&json!("code")).count(), 0);
    }

    #[test]
    fn test_merged_payload_prefers_nested_values() {
        let event = json!({"task": "outer", "payload": {"task": "inner"}, "data": {"task": "data"}});
        assert_eq!(criteria(&event).as_deref(), Some("inner"));

        let event = json!({"task": "outer", "data": {"requirements": "from data"}});
        assert_eq!(criteria(&event).as_deref(), Some("from data"));
    }

    #[test]
    fn test_deliverable_skips_null() {
        let event = json!({"deliverable": null, "output": {"text": "hi"}});
        assert_eq!(deliverable(&event), Some(json!({"text": "hi"})));
        assert_eq!(deliverable(&json!({})), None);
    }

    #[test]
    fn test_extract_code() {
        let string = extract_code(&json!({"deliverable": "  print('hi')  "}));
        assert_eq!(string.code.as_deref(), Some("print('hi')"));
        assert_eq!(string.language, None);

        let object = extract_code(&json!({"submission": {"source": "fn main() {}", "lang": "rust"}}));
        assert_eq!(object.code.as_deref(), Some("fn main() {}"));
        assert_eq!(object.language.as_deref(), Some("rust"));

        let none = extract_code(&json!({"deliverable": {"summary": "n/a", "language": "go"}}));
        assert_eq!(none, ExtractedCode::default());
    }

    #[test]
    fn test_format_evidence() {
        assert_eq!(format_evidence(None, 10), "<no deliverable provided>");
        assert_eq!(format_evidence(Some(&json!("short")), 10), "short");
        assert_eq!(
            format_evidence(Some(&json!("abcdefghijkl")), 5),
            "abcde\n...<truncated>"
        );
        assert_eq!(format_evidence(Some(&json!({"a": 1})), 100), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2, "..."), "hé...");
        assert_eq!(truncate("hé", 2, "..."), "hé");
    }
}
