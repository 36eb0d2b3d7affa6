//! The result schema sent with every run so the engine constrains its final
//! output to the shape [`pactum_core::result::AnalysisPayload`] expects.

use serde_json::{Value, json};

pub fn result_schema() -> Value {
  json!({
    "type": "object",
    "required": ["summary", "parties", "risk_assessment", "confidence_score"],
    "properties": {
      "summary":  { "type": "string" },
      "parties":  { "type": "array", "items": { "type": "string" } },
      "dates": {
        "type": "object",
        "properties": {
          "effective":   { "type": ["string", "null"] },
          "termination": { "type": ["string", "null"] },
          "renewal":     { "type": ["string", "null"] }
        }
      },
      "obligations": {
        "type": "array",
        "items": {
          "type": "object",
          "required": ["party", "text"],
          "properties": {
            "party": { "type": "string" },
            "text":  { "type": "string" }
          }
        }
      },
      "financial_terms": { "type": "array" },
      "risk_assessment": {
        "type": "object",
        "required": ["risk_level"],
        "properties": {
          "risk_level":      { "enum": ["Low", "Medium", "High"] },
          "factors":         { "type": "array", "items": { "type": "string" } },
          "recommendations": { "type": "array", "items": { "type": "string" } }
        }
      },
      "confidence_score": { "type": "number", "minimum": 0, "maximum": 1 },
      "unclear_sections": { "type": "array" }
    }
  })
}
