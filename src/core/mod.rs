// src/core/mod.rs
//! Configuration and the client for deployed instances

pub mod config_manager;
pub mod service_client;

pub use config_manager::{ConfigManager, StorageBackend};
pub use service_client::ServiceClient;
