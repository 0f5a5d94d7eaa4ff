//! Response normalizer: raw provider text -> JSON object -> record over the plan's fields.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::extraction::error::ExtractionError;
use crate::extraction::record::ExtractedRecord;
use crate::plans::PayerPlan;

/// Parses the provider's raw answer into a JSON object.
///
/// Tolerates markdown fences and chatter around the object. An empty object means
/// the model could not read the document at all.
pub fn parse_raw_response(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
    let text = strip_json_fences(raw);
    if text.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let value = match serde_json::from_str::<Value>(text) {
        Ok(v) => v,
        Err(first_err) => outermost_object(text)
            .and_then(|slice| serde_json::from_str::<Value>(slice).ok())
            .ok_or_else(|| ExtractionError::NotJson(first_err.to_string()))?,
    };

    match value {
        Value::Object(map) if map.is_empty() => Err(ExtractionError::UnreadableDocument),
        Value::Object(map) => Ok(map),
        other => Err(ExtractionError::NotJson(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Maps a raw object onto `plan`'s fields. Extra keys are dropped; missing or empty
/// values become the absence marker.
pub fn normalize_response(
    plan: PayerPlan,
    raw: &Map<String, Value>,
) -> Result<ExtractedRecord, ExtractionError> {
    let loose: HashMap<String, &Value> = raw
        .iter()
        .map(|(k, v)| (loose_key(k), v))
        .collect();

    if !plan
        .fields()
        .iter()
        .any(|&f| lookup_field(raw, &loose, f).is_some())
    {
        return Err(ExtractionError::WrongDocumentType {
            plan: plan.id().to_string(),
        });
    }

    Ok(ExtractedRecord::from_lookup(plan, |field| {
        lookup_field(raw, &loose, field).and_then(coerce_to_text)
    }))
}

fn lookup_field<'a>(
    raw: &'a Map<String, Value>,
    loose: &HashMap<String, &'a Value>,
    field: &str,
) -> Option<&'a Value> {
    raw.get(field)
        .or_else(|| loose.get(&loose_key(field)).copied())
}

/// Convenience for the common path: parse then normalize.
pub fn normalize_raw_text(plan: PayerPlan, raw: &str) -> Result<ExtractedRecord, ExtractionError> {
    let map = parse_raw_response(raw)?;
    normalize_response(plan, &map)
}

/// Text form of a JSON value, or `None` when it carries nothing.
fn coerce_to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(coerce_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Case, whitespace and punctuation-insensitive key ("policy_no" ~ "Policy No").
fn loose_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_single_known_field_fills_the_rest_with_absence() {
        let record = normalize_raw_text(PayerPlan::Qlm, r#"{"Patient Name": "John Doe"}"#).unwrap();
        assert_eq!(record.field_count(), 20);
        assert_eq!(record.get("Patient Name"), Some("John Doe"));
        let absent = record.fields().filter(|v| v.value.is_none()).count();
        assert_eq!(absent, 19);
    }

    #[test]
    fn test_key_set_always_equals_field_list() {
        let raw = object(json!({
            "Policy No": "A1",
            "Favourite Colour": "blue",
            "Employer": "Acme"
        }));
        for plan in PayerPlan::ALL {
            let record = normalize_response(plan, &raw).unwrap();
            let keys: Vec<_> = record.fields().map(|v| v.field).collect();
            assert_eq!(keys, plan.fields());
        }
    }

    #[test]
    fn test_empty_object_is_unreadable_document() {
        let err = parse_raw_response("{}").unwrap_err();
        assert!(matches!(err, ExtractionError::UnreadableDocument));
    }

    #[test]
    fn test_no_expected_field_is_wrong_document_type() {
        let raw = object(json!({"Invoice Number": "INV-1", "Total": "$12"}));
        let err = normalize_response(PayerPlan::Qlm, &raw).unwrap_err();
        assert!(matches!(err, ExtractionError::WrongDocumentType { .. }));
    }

    #[test]
    fn test_all_null_known_fields_is_a_valid_record() {
        let raw = object(json!({"Patient Name": null, "Policy No": null}));
        let record = normalize_response(PayerPlan::Qlm, &raw).unwrap();
        assert_eq!(record.present_count(), 0);
    }

    #[test]
    fn test_empty_and_blank_strings_become_absent_not_empty() {
        let raw = object(json!({"Patient Name": "", "Policy No": "   ", "Member ID": "M-1"}));
        let record = normalize_response(PayerPlan::Qlm, &raw).unwrap();
        for v in record.fields() {
            assert_ne!(v.value.as_deref(), Some(""));
        }
        assert_eq!(record.get("Patient Name"), None);
        assert_eq!(record.get("Policy No"), None);
        assert_eq!(record.get("Member ID"), Some("M-1"));
    }

    #[test]
    fn test_non_string_values_are_coerced_to_text() {
        let raw = object(json!({
            "Coinsurance": 20,
            "Pre-Authorization Required": true,
            "Exclusions": ["Cosmetic", "", "Dental"],
            "Policy No": {"number": "9"}
        }));
        let record = normalize_response(PayerPlan::Mch, &raw).unwrap();
        assert_eq!(record.get("Pre-Authorization Required"), Some("true"));
        assert_eq!(record.get("Exclusions"), Some("Cosmetic, Dental"));
        assert_eq!(record.get("Policy No"), Some(r#"{"number":"9"}"#));
        let qlm = normalize_response(PayerPlan::Qlm, &raw).unwrap();
        assert_eq!(qlm.get("Coinsurance"), Some("20"));
    }

    #[test]
    fn test_loosely_matching_keys_are_mapped() {
        let raw = object(json!({"policy_no": "P-9", "PATIENT NAME": "Ann Lee"}));
        let record = normalize_response(PayerPlan::Qlm, &raw).unwrap();
        assert_eq!(record.get("Policy No"), Some("P-9"));
        assert_eq!(record.get("Patient Name"), Some("Ann Lee"));
    }

    #[test]
    fn test_exact_key_wins_over_loose_key() {
        let raw = object(json!({"policy no": "loose", "Policy No": "exact"}));
        let record = normalize_response(PayerPlan::Mch, &raw).unwrap();
        assert_eq!(record.get("Policy No"), Some("exact"));
    }

    #[test]
    fn test_fenced_and_chatty_responses_parse() {
        let fenced = "```json\n{\"Policy No\": \"1\"}\n```";
        assert!(parse_raw_response(fenced).is_ok());
        let chatty = "Here is the data you asked for: {\"Policy No\": \"1\"} Let me know!";
        assert_eq!(parse_raw_response(chatty).unwrap()["Policy No"], "1");
    }

    #[test]
    fn test_empty_response_is_distinct_from_non_json() {
        assert!(matches!(
            parse_raw_response("  \n ").unwrap_err(),
            ExtractionError::EmptyResponse
        ));
        assert!(matches!(
            parse_raw_response("I cannot read this file").unwrap_err(),
            ExtractionError::NotJson(_)
        ));
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        match parse_raw_response(r#"["Policy No"]"#).unwrap_err() {
            ExtractionError::NotJson(msg) => assert!(msg.contains("an array")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
