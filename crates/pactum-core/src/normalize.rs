//! Normalization — converting loosely-structured engine output into the
//! strict [`AnalysisPayload`] schema.
//!
//! The engine's "result" may arrive as a native JSON object, a JSON-encoded
//! string, or a JSON string wrapped in a triple-backtick code fence. The
//! stages, in order:
//!
//! 1. an object is accepted as-is;
//! 2. a string has one leading/trailing fence (optional language tag)
//!    stripped, then is parsed as JSON — it must yield an object;
//! 3. anything else, or a parse failure, is an error — never silently
//!    swallowed.
//!
//! After the top-level object is obtained, `dates` and `risk_assessment`
//! values that are themselves strings get the same fence-strip + parse step
//! independently. A nested parse failure is non-fatal: the field keeps the
//! original string (see [`Loose`](crate::result::Loose)) and a data-quality
//! warning is logged.

use serde_json::Value;
use thiserror::Error;

use crate::result::AnalysisPayload;

/// Nested fields the engine is known to occasionally emit as JSON strings.
const NESTED_FIELDS: [&str; 2] = ["dates", "risk_assessment"];

#[derive(Debug, Error)]
pub enum NormalizeError {
  /// Output could not be turned into a JSON object at any stage. The
  /// orchestrator treats this as an engine failure.
  #[error("unparsable output")]
  Unparsable,

  /// The object does not fit the result schema.
  #[error("output does not match result schema: {0}")]
  Schema(#[source] serde_json::Error),

  #[error("confidence_score {0} is outside [0, 1]")]
  ConfidenceOutOfRange(f64),
}

/// Strip one leading/trailing triple-backtick fence, with an optional
/// language tag after the opening backticks. Unfenced input is returned
/// trimmed.
fn strip_code_fence(s: &str) -> &str {
  let trimmed = s.trim();
  let Some(inner) = trimmed
    .strip_prefix("```")
    .and_then(|rest| rest.strip_suffix("```"))
  else {
    return trimmed;
  };

  // Drop the language tag line (e.g. "json") if one is present.
  let inner = match inner.split_once('\n') {
    Some((tag, body))
      if tag
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
    {
      body
    }
    _ => inner,
  };
  inner.trim()
}

/// Normalize a raw engine output into a validated [`AnalysisPayload`].
pub fn normalize(raw: Value) -> Result<AnalysisPayload, NormalizeError> {
  let mut object = match raw {
    Value::Object(map) => Value::Object(map),
    Value::String(s) => {
      let parsed: Value = serde_json::from_str(strip_code_fence(&s))
        .map_err(|_| NormalizeError::Unparsable)?;
      if !parsed.is_object() {
        return Err(NormalizeError::Unparsable);
      }
      parsed
    }
    _ => return Err(NormalizeError::Unparsable),
  };

  // Nested fields that arrive as JSON strings get their own parse pass.
  // Failure here is best-effort: keep the string, log the loss.
  for field in NESTED_FIELDS {
    let Some(Value::String(s)) = object.get(field) else {
      continue;
    };
    match serde_json::from_str::<Value>(strip_code_fence(s)) {
      Ok(parsed) => {
        object[field] = parsed;
      }
      Err(err) => {
        tracing::warn!(field, %err, "nested field left as raw string");
      }
    }
  }

  let payload: AnalysisPayload =
    serde_json::from_value(object).map_err(NormalizeError::Schema)?;

  if !(0.0..=1.0).contains(&payload.confidence_score) {
    return Err(NormalizeError::ConfidenceOutOfRange(payload.confidence_score));
  }

  Ok(dedup_parties(payload))
}

/// Parties are a set of distinct names; drop duplicates, keep first-seen
/// order.
fn dedup_parties(mut payload: AnalysisPayload) -> AnalysisPayload {
  let mut seen = Vec::with_capacity(payload.parties.len());
  for party in payload.parties.drain(..) {
    if !seen.contains(&party) {
      seen.push(party);
    }
  }
  payload.parties = seen;
  payload
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::result::RiskLevel;

  fn valid_object() -> Value {
    json!({
      "summary": "A services agreement between Acme and Bolt.",
      "parties": ["Acme Corp", "Bolt LLC"],
      "dates": { "effective": "2024-01-01", "termination": "2026-01-01" },
      "obligations": [
        { "party": "Acme Corp", "text": "Pay invoices within 30 days." }
      ],
      "financial_terms": [{ "description": "$10,000/month retainer" }],
      "risk_assessment": {
        "risk_level": "Medium",
        "factors": ["auto-renewal"],
        "recommendations": ["add a termination-for-convenience clause"]
      },
      "confidence_score": 0.87,
      "unclear_sections": []
    })
  }

  #[test]
  fn accepts_a_native_object() {
    let payload = normalize(valid_object()).unwrap();
    assert_eq!(payload.parties, vec!["Acme Corp", "Bolt LLC"]);
    assert_eq!(
      payload.risk_assessment.as_parsed().unwrap().risk_level,
      RiskLevel::Medium
    );
  }

  #[test]
  fn fenced_json_equals_the_unwrapped_object() {
    let text = serde_json::to_string(&valid_object()).unwrap();
    let fenced = Value::String(format!("```json\n{text}\n```"));

    let from_fence = normalize(fenced).unwrap();
    let direct = normalize(valid_object()).unwrap();
    assert_eq!(
      serde_json::to_value(&from_fence).unwrap(),
      serde_json::to_value(&direct).unwrap()
    );
  }

  #[test]
  fn fence_without_language_tag_parses() {
    let text = serde_json::to_string(&valid_object()).unwrap();
    let fenced = Value::String(format!("```\n{text}\n```"));
    assert!(normalize(fenced).is_ok());
  }

  #[test]
  fn plain_json_string_parses() {
    let text = serde_json::to_string(&valid_object()).unwrap();
    assert!(normalize(Value::String(text)).is_ok());
  }

  #[test]
  fn unparsable_text_is_an_error_not_a_partial_payload() {
    let err = normalize(Value::String("the contract looks fine".into()))
      .unwrap_err();
    assert!(matches!(err, NormalizeError::Unparsable));

    let err = normalize(json!(42)).unwrap_err();
    assert!(matches!(err, NormalizeError::Unparsable));

    // A string that parses to a non-object is equally unparsable.
    let err = normalize(Value::String("[1, 2, 3]".into())).unwrap_err();
    assert!(matches!(err, NormalizeError::Unparsable));
  }

  #[test]
  fn nested_string_fields_are_parsed_independently() {
    let mut object = valid_object();
    object["dates"] =
      Value::String("```json\n{\"effective\": \"2025-06-01\"}\n```".into());
    object["risk_assessment"] =
      Value::String("{\"risk_level\": \"High\"}".into());

    let payload = normalize(object).unwrap();
    assert_eq!(
      payload.dates.as_parsed().unwrap().effective.as_deref(),
      Some("2025-06-01")
    );
    assert_eq!(
      payload.risk_assessment.as_parsed().unwrap().risk_level,
      RiskLevel::High
    );
  }

  #[test]
  fn nested_parse_failure_keeps_the_raw_string() {
    let mut object = valid_object();
    object["dates"] = Value::String("effective sometime in 2024".into());

    let payload = normalize(object).unwrap();
    assert!(payload.dates.as_parsed().is_none());
  }

  #[test]
  fn confidence_out_of_range_is_rejected() {
    let mut object = valid_object();
    object["confidence_score"] = json!(1.3);
    let err = normalize(object).unwrap_err();
    assert!(matches!(err, NormalizeError::ConfidenceOutOfRange(_)));
  }

  #[test]
  fn missing_mandatory_field_is_a_schema_error() {
    let mut object = valid_object();
    object.as_object_mut().unwrap().remove("summary");
    let err = normalize(object).unwrap_err();
    assert!(matches!(err, NormalizeError::Schema(_)));
  }

  #[test]
  fn duplicate_parties_are_deduplicated_in_order() {
    let mut object = valid_object();
    object["parties"] = json!(["Acme Corp", "Bolt LLC", "Acme Corp"]);
    let payload = normalize(object).unwrap();
    assert_eq!(payload.parties, vec!["Acme Corp", "Bolt LLC"]);
  }

  #[test]
  fn strip_code_fence_edge_cases() {
    assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
    assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("  {} "), "{}");
    // An unterminated fence is left alone (and will fail JSON parsing).
    assert_eq!(strip_code_fence("```json\n{}"), "```json\n{}");
  }
}
