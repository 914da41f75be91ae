//! # Job Match
//!
//! Semantic matching of a résumé against a catalog of job postings.
//!
//! Postings are rendered into dense documents, embedded and stored in a
//! SQLite-backed vector index. A query embeds the résumé, retrieves the
//! nearest postings, aggregates them into facets (roles, skills, companies,
//! salary ranges, benefits, employment-type counts) and answers the user's
//! question with an LLM or a deterministic rule-based fallback.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Dataset    │──▶│  Document   │──▶│  SQLite   │
//! │  CSV/JSONL  │   │ Build+Embed │   │  vectors  │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │
//!                                   ┌──────▼──────┐
//!                                   │ Aggregator  │
//!                                   └──────┬──────┘
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │(jobmatch)│       │  server  │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! jobmatch init
//! jobmatch index build --dataset ./data/jobs.csv
//! jobmatch resume set alice ./alice.txt
//! jobmatch query "What roles am I eligible for?" --user alice
//! jobmatch serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`dataset`] | CSV / JSON Lines posting loader |
//! | [`migrate`] | Database open and schema migrations |
//! | [`sqlite_store`] | SQLite vector index |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Chat-completions answer generator |
//! | [`resume`] | Résumé storage |
//! | [`index_cmd`] | `index build` |
//! | [`query_cmd`] | `query` and `search` |
//! | [`stats`] | `status` |
//! | [`server`] | HTTP server |
//!
//! Pure matching logic (document builder, aggregator, orchestrator) lives in
//! the `job-match-core` crate.

pub mod config;
pub mod dataset;
pub mod embedding;
pub mod index_cmd;
pub mod llm;
pub mod migrate;
pub mod query_cmd;
pub mod resume;
pub mod server;
pub mod sqlite_store;
pub mod stats;
