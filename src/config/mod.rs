// src/config/mod.rs
pub mod discovery;

pub use discovery::{DiscoveryConfig, ENV_CONFIG_PATH};
