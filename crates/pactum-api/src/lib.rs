//! JSON REST API for Pactum.
//!
//! Exposes an axum [`Router`] backed by a
//! [`pactum_orchestrator::Orchestrator`] over any store, engine, and blob
//! backend. Auth, CORS, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", pactum_api::api_router(orchestrator.clone()))
//! ```

pub mod clarifications;
pub mod documents;
pub mod error;
pub mod jobs;
pub mod results;

use axum::{
  Router,
  routing::{get, post},
};
use pactum_core::{
  blob::BlobStore, engine::AnalysisEngine, store::AnalysisStore,
};
use pactum_orchestrator::Orchestrator;

pub use error::ApiError;

/// Build a fully-materialised API router for `ctx`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, E, B>(ctx: Orchestrator<S, E, B>) -> Router<()>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  Router::new()
    // Documents
    .route("/documents", post(documents::upload::<S, E, B>))
    .route(
      "/documents/{id}/result",
      get(results::get_one::<S, E, B>).delete(results::delete::<S, E, B>),
    )
    .route("/documents/{id}/result/star", post(results::star::<S, E, B>))
    // Results
    .route("/results", get(results::list::<S, E, B>))
    // Jobs
    .route("/jobs/{id}", get(jobs::get_one::<S, E, B>))
    .route("/jobs/{id}/clarifications", get(jobs::clarifications::<S, E, B>))
    // Clarifications
    .route(
      "/clarifications/{id}/resolve",
      post(clarifications::resolve::<S, E, B>),
    )
    .with_state(ctx)
}
