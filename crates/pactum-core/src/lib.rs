//! Core types and trait definitions for the Pactum contract-analysis backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod blob;
pub mod clarification;
pub mod document;
pub mod engine;
pub mod error;
pub mod job;
pub mod normalize;
pub mod result;
pub mod store;

pub use error::ResolveError;
