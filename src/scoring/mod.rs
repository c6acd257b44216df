// src/scoring/mod.rs
//! Asynchronous LLM scoring of stored profiles.

pub mod engine;
pub mod parser;
pub mod prompt;

pub use engine::ScoringEngine;
pub use parser::parse_result;
