//! HTTP-backed [`AnalysisEngine`] adapter.
//!
//! Talks to an external reasoning service over a small JSON protocol:
//! `POST {base}/v1/runs` starts a run over a document, `POST
//! {base}/v1/runs/{id}/resume` re-enters a paused run with human answers.
//! Everything that can go wrong at this boundary — transport errors,
//! timeouts, malformed responses, unknown run states — is folded into
//! [`EngineOutcome::Failed`]; the orchestrator never sees a transport error
//! type.

mod protocol;
mod schema;

use std::{path::Path, time::Duration};

use base64::Engine as _;
use pactum_core::engine::{AnalysisEngine, ClarificationAnswer, EngineOutcome};
use thiserror::Error;

use crate::protocol::{
  ResumeRunRequest, RunResponse, StartRunRequest, WireAnswer,
  outcome_from_response,
};

/// Default wall-clock bound for a single engine call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
enum CallError {
  #[error("engine call timed out after {0:?}")]
  Timeout(Duration),

  #[error("engine transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("failed to read document: {0}")]
  Document(#[from] std::io::Error),
}

/// An [`AnalysisEngine`] reached over HTTP.
#[derive(Clone)]
pub struct HttpEngine {
  http:     reqwest::Client,
  base_url: String,
  timeout:  Duration,
}

impl HttpEngine {
  /// `base_url` without a trailing slash, e.g. `http://engine:9300`.
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
    Self {
      http: reqwest::Client::new(),
      base_url: base_url.into().trim_end_matches('/').to_owned(),
      timeout,
    }
  }

  async fn post_run(
    &self,
    url: String,
    body: serde_json::Value,
  ) -> Result<RunResponse, CallError> {
    let request = self.http.post(&url).json(&body).send();
    let response = tokio::time::timeout(self.timeout, request)
      .await
      .map_err(|_| CallError::Timeout(self.timeout))??
      .error_for_status()?;

    let decoded: RunResponse =
      tokio::time::timeout(self.timeout, response.json())
        .await
        .map_err(|_| CallError::Timeout(self.timeout))??;
    Ok(decoded)
  }
}

impl AnalysisEngine for HttpEngine {
  async fn invoke(&self, document: &Path) -> EngineOutcome {
    let bytes = match tokio::fs::read(document).await {
      Ok(bytes) => bytes,
      Err(err) => {
        let err = CallError::from(err);
        tracing::warn!(%err, "engine invoke failed before the call");
        return EngineOutcome::Failed { message: err.to_string() };
      }
    };

    let body = serde_json::to_value(StartRunRequest {
      document: &base64::engine::general_purpose::STANDARD.encode(&bytes),
      filename: document.file_name().and_then(|n| n.to_str()),
      schema:   &schema::result_schema(),
    })
    .unwrap_or_default();

    let url = format!("{}/v1/runs", self.base_url);
    match self.post_run(url, body).await {
      Ok(response) => outcome_from_response(response),
      Err(err) => {
        tracing::warn!(%err, "engine invoke failed");
        EngineOutcome::Failed { message: err.to_string() }
      }
    }
  }

  async fn resume(
    &self,
    run_ref: &str,
    answers: &[ClarificationAnswer],
  ) -> EngineOutcome {
    let body = serde_json::to_value(ResumeRunRequest {
      answers: answers
        .iter()
        .map(|a| WireAnswer {
          clarification_ref: a.engine_ref.clone(),
          response:          a.response.clone(),
        })
        .collect(),
    })
    .unwrap_or_default();

    let url = format!("{}/v1/runs/{run_ref}/resume", self.base_url);
    match self.post_run(url, body).await {
      Ok(response) => outcome_from_response(response),
      Err(err) => {
        tracing::warn!(%err, run_ref, "engine resume failed");
        EngineOutcome::Failed { message: err.to_string() }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Accept connections and never answer them.
  async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let mut held = Vec::new();
      loop {
        let Ok((socket, _)) = listener.accept().await else { break };
        held.push(socket);
      }
    });
    format!("http://{addr}")
  }

  #[tokio::test]
  async fn a_silent_engine_times_out_into_a_failed_outcome() {
    let engine =
      HttpEngine::new(silent_server().await, Duration::from_millis(100));

    let outcome = engine.resume("run-1", &[]).await;
    let EngineOutcome::Failed { message } = outcome else {
      panic!("expected a failure outcome");
    };
    assert!(message.contains("timed out after"), "{message}");
  }

  #[tokio::test]
  async fn an_unreachable_document_fails_before_any_call() {
    let engine =
      HttpEngine::new(silent_server().await, Duration::from_millis(100));

    let outcome =
      engine.invoke(Path::new("/nonexistent/contract.pdf")).await;
    let EngineOutcome::Failed { message } = outcome else {
      panic!("expected a failure outcome");
    };
    assert!(message.contains("failed to read document"), "{message}");
  }
}
