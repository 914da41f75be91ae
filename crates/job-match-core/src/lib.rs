//! # Job Match Core
//!
//! Pure matching logic for Job Match: data models, the document builder,
//! the embedding trait, the vector index abstraction, facet aggregation,
//! context formatting, answer-generation strategies, and the query
//! orchestrator.
//!
//! This crate contains no sqlx, HTTP client, or filesystem I/O. Concrete
//! SQLite storage, network embedding providers, and the LLM client live in
//! the `job-match` app crate.

pub mod aggregate;
pub mod context;
pub mod document;
pub mod embedding;
pub mod generator;
pub mod models;
pub mod orchestrator;
pub mod store;
