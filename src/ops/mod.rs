// src/ops/mod.rs
//! Operational tooling run from the CLI.

pub mod cleanup;
pub mod migrate;
pub mod monitor;
pub mod poller;
pub mod repair;
pub mod smoke;

pub use poller::JobPoller;
pub use repair::RowAccess;
