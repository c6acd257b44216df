//! LinkedIn profile ingestion and LLM scoring service.
//!
//! Profiles and companies are scraped through Cassidy workflows, normalized,
//! stored in SQLite or Supabase and scored asynchronously by an OpenAI-compatible
//! model. The `ops` module holds the tooling that runs against a deployment.

pub mod cli;
pub mod clients;
pub mod core;
pub mod error;
pub mod ingest;
pub mod linkedin;
pub mod ops;
pub mod scoring;
pub mod store;
pub mod timestamp;
pub mod types;
pub mod utils;
pub mod web;

pub use error::{AppError, AppResult};
pub use web::{build_rocket, start_web_server};
