//! AnalysisResult — the strict schema a normalized engine output must fit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A field that may arrive structured or, when the engine emitted a nested
/// JSON string that failed to parse, degrade to the original raw string
/// (best-effort, logged as a data-quality event — see [`crate::normalize`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loose<T> {
  Parsed(T),
  Raw(String),
}

impl<T: Default> Default for Loose<T> {
  fn default() -> Self {
    Loose::Parsed(T::default())
  }
}

impl<T> Loose<T> {
  pub fn as_parsed(&self) -> Option<&T> {
    match self {
      Loose::Parsed(t) => Some(t),
      Loose::Raw(_) => None,
    }
  }
}

/// Key contract dates; each optional, stored as the engine's own strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractDates {
  #[serde(default)]
  pub effective:   Option<String>,
  #[serde(default)]
  pub termination: Option<String>,
  #[serde(default)]
  pub renewal:     Option<String>,
}

/// A single obligation, attributed to one of the contract parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
  pub party: String,
  pub text:  String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
  #[serde(alias = "low")]
  Low,
  #[serde(alias = "medium")]
  Medium,
  #[serde(alias = "high")]
  High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
  pub risk_level:      RiskLevel,
  #[serde(default)]
  pub factors:         Vec<String>,
  #[serde(default)]
  pub recommendations: Vec<String>,
}

/// The normalized analysis payload.
///
/// `summary`, `parties`, `risk_assessment`, and `confidence_score` are
/// mandatory; everything else defaults to empty when the engine omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPayload {
  pub summary:          String,
  /// Distinct party names, in the order the engine produced them.
  pub parties:          Vec<String>,
  #[serde(default)]
  pub dates:            Loose<ContractDates>,
  #[serde(default)]
  pub obligations:      Vec<Obligation>,
  /// Free-form per the engine's prompt; not interpreted by the core.
  #[serde(default)]
  pub financial_terms:  Vec<serde_json::Value>,
  pub risk_assessment:  Loose<RiskAssessment>,
  /// In `[0, 1]`; enforced at normalization time.
  pub confidence_score: f64,
  #[serde(default)]
  pub unclear_sections: Vec<serde_json::Value>,
}

impl AnalysisPayload {
  /// Obligations whose `party` does not appear in `parties`, as
  /// `(index, party)` pairs.
  ///
  /// A payload with any such obligation must not be persisted for a
  /// `completed` job; the orchestrator routes it into consistency
  /// clarifications instead.
  pub fn unknown_obligation_parties(&self) -> Vec<(usize, String)> {
    self
      .obligations
      .iter()
      .enumerate()
      .filter(|(_, o)| !self.parties.iter().any(|p| p == &o.party))
      .map(|(i, o)| (i, o.party.clone()))
      .collect()
  }

  pub fn is_consistent(&self) -> bool {
    self.unknown_obligation_parties().is_empty()
  }
}

/// A persisted analysis result. The store is append-capable; the "current"
/// result for a document is the newest row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
  pub result_id:   Uuid,
  pub document_id: Uuid,
  pub job_id:      Uuid,
  pub owner:       String,
  pub payload:     AnalysisPayload,
  /// User-toggleable; does not affect lifecycle.
  pub starred:     bool,
  pub created_at:  DateTime<Utc>,
}

/// Input for persisting a result. Id, `starred`, and timestamp are
/// store-assigned.
#[derive(Debug, Clone)]
pub struct NewResult {
  pub document_id: Uuid,
  pub job_id:      Uuid,
  pub owner:       String,
  pub payload:     AnalysisPayload,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn payload(parties: &[&str], obligations: &[(&str, &str)]) -> AnalysisPayload {
    AnalysisPayload {
      summary:          "test".into(),
      parties:          parties.iter().map(|s| s.to_string()).collect(),
      dates:            Loose::default(),
      obligations:      obligations
        .iter()
        .map(|(p, t)| Obligation { party: p.to_string(), text: t.to_string() })
        .collect(),
      financial_terms:  vec![],
      risk_assessment:  Loose::Parsed(RiskAssessment {
        risk_level:      RiskLevel::Low,
        factors:         vec![],
        recommendations: vec![],
      }),
      confidence_score: 0.9,
      unclear_sections: vec![],
    }
  }

  #[test]
  fn consistent_when_all_obligation_parties_are_listed() {
    let p = payload(&["Acme", "Bolt"], &[("Acme", "pay"), ("Bolt", "deliver")]);
    assert!(p.is_consistent());
    assert!(p.unknown_obligation_parties().is_empty());
  }

  #[test]
  fn unknown_parties_are_reported_with_indices() {
    let p = payload(&["Acme"], &[("Acme", "pay"), ("Ghost", "haunt"), ("Acme", "x")]);
    assert!(!p.is_consistent());
    assert_eq!(p.unknown_obligation_parties(), vec![(1, "Ghost".to_string())]);
  }

  #[test]
  fn empty_obligations_are_trivially_consistent() {
    assert!(payload(&[], &[]).is_consistent());
  }

  #[test]
  fn loose_deserializes_structured_and_raw() {
    let parsed: Loose<ContractDates> =
      serde_json::from_value(serde_json::json!({ "effective": "2024-01-01" }))
        .unwrap();
    assert_eq!(
      parsed.as_parsed().unwrap().effective.as_deref(),
      Some("2024-01-01")
    );

    let raw: Loose<ContractDates> =
      serde_json::from_value(serde_json::json!("not structured")).unwrap();
    assert!(raw.as_parsed().is_none());
  }

  #[test]
  fn risk_level_accepts_both_cases() {
    let a: RiskLevel = serde_json::from_str("\"High\"").unwrap();
    let b: RiskLevel = serde_json::from_str("\"high\"").unwrap();
    assert_eq!(a, b);
  }
}
