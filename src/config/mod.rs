//! Configuration module - typed settings and loading

pub mod loader;
pub mod types;

pub use loader::load_config;
pub use types::{AppConfig, AppSettings, HyperliquidConfig, TrackerConfig};
