//! Wire types for the engine's JSON protocol and the mapping from a run
//! response to an [`EngineOutcome`].

use pactum_core::engine::{EngineClarification, EngineOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct StartRunRequest<'a> {
  /// Base64-encoded document bytes.
  pub document: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub filename: Option<&'a str>,
  /// The result schema the run's final output must satisfy.
  pub schema:   &'a Value,
}

#[derive(Debug, Serialize)]
pub struct ResumeRunRequest {
  pub answers: Vec<WireAnswer>,
}

#[derive(Debug, Serialize)]
pub struct WireAnswer {
  pub clarification_ref: String,
  pub response:          String,
}

#[derive(Debug, Deserialize)]
pub struct RunResponse {
  pub status:         String,
  #[serde(default)]
  pub run_id:         Option<String>,
  #[serde(default)]
  pub output:         Option<Value>,
  #[serde(default)]
  pub clarifications: Vec<WireClarification>,
  #[serde(default)]
  pub error:          Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireClarification {
  pub id:       String,
  pub question: String,
  #[serde(default)]
  pub options:  Vec<String>,
  #[serde(default)]
  pub category: Option<String>,
}

/// Map a decoded run response onto the three-outcome contract.
///
/// A state that is neither paused nor complete is an unexpected-state
/// failure, never silently retried.
pub fn outcome_from_response(response: RunResponse) -> EngineOutcome {
  match response.status.as_str() {
    "complete" | "completed" => match response.output {
      Some(output) => EngineOutcome::Completed { run_ref: response.run_id, output },
      None => EngineOutcome::Failed {
        message: "engine reported completion without an output".into(),
      },
    },
    "needs_clarification" => {
      let Some(run_ref) = response.run_id else {
        return EngineOutcome::Failed {
          message: "engine paused without a run id".into(),
        };
      };
      if response.clarifications.is_empty() {
        return EngineOutcome::Failed {
          message: "engine paused without any questions".into(),
        };
      }
      EngineOutcome::NeedsClarification {
        run_ref,
        questions: response
          .clarifications
          .into_iter()
          .map(|c| EngineClarification {
            engine_ref: c.id,
            question:   c.question,
            options:    c.options,
            category:   c.category,
          })
          .collect(),
      }
    }
    "failed" => EngineOutcome::Failed {
      message: response
        .error
        .unwrap_or_else(|| "engine reported failure".into()),
    },
    other => EngineOutcome::Failed {
      message: format!("unexpected engine state {other:?}"),
    },
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn response(value: Value) -> RunResponse {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn complete_with_output_maps_to_completed() {
    let outcome = outcome_from_response(response(json!({
      "status": "complete",
      "run_id": "run-1",
      "output": { "summary": "ok" }
    })));
    assert!(matches!(
      outcome,
      EngineOutcome::Completed { run_ref: Some(ref r), .. } if r == "run-1"
    ));
  }

  #[test]
  fn complete_without_output_is_a_failure() {
    let outcome =
      outcome_from_response(response(json!({ "status": "complete" })));
    assert!(matches!(outcome, EngineOutcome::Failed { .. }));
  }

  #[test]
  fn pause_maps_questions_through() {
    let outcome = outcome_from_response(response(json!({
      "status": "needs_clarification",
      "run_id": "run-2",
      "clarifications": [
        { "id": "c-1", "question": "Which party?", "options": ["Acme", "Bolt"] },
        { "id": "c-2", "question": "Confirm the effective date." }
      ]
    })));
    let EngineOutcome::NeedsClarification { run_ref, questions } = outcome
    else {
      panic!("expected a pause");
    };
    assert_eq!(run_ref, "run-2");
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].engine_ref, "c-1");
    assert_eq!(questions[0].options, vec!["Acme", "Bolt"]);
    assert!(questions[1].options.is_empty());
  }

  #[test]
  fn pause_without_run_id_or_questions_is_a_failure() {
    let no_run = outcome_from_response(response(json!({
      "status": "needs_clarification",
      "clarifications": [{ "id": "c-1", "question": "?" }]
    })));
    assert!(matches!(no_run, EngineOutcome::Failed { .. }));

    let no_questions = outcome_from_response(response(json!({
      "status": "needs_clarification",
      "run_id": "run-3"
    })));
    assert!(matches!(no_questions, EngineOutcome::Failed { .. }));
  }

  #[test]
  fn reported_failure_carries_the_message() {
    let outcome = outcome_from_response(response(json!({
      "status": "failed",
      "error": "model quota exhausted"
    })));
    assert!(matches!(
      outcome,
      EngineOutcome::Failed { ref message } if message == "model quota exhausted"
    ));
  }

  #[test]
  fn unknown_state_is_an_unexpected_state_failure() {
    let outcome = outcome_from_response(response(json!({
      "status": "daydreaming",
      "run_id": "run-4"
    })));
    assert!(matches!(
      outcome,
      EngineOutcome::Failed { ref message } if message.contains("daydreaming")
    ));
  }
}
