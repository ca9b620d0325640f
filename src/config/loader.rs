//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{ClientError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Direct overrides (MIN_POSITION_USD, REFRESH_INTERVAL, DATA_FILE_PATH)
/// 2. Environment variables (prefixed with APP_)
/// 3. Configuration file (TOML format)
/// 4. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    // Add default config file if it exists
    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    // Add environment variables with APP_ prefix
    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    let mut config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Bare-name variables take precedence over everything else
fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Ok(v) = std::env::var("MIN_POSITION_USD") {
        config.tracker.min_position_usd = v
            .parse()
            .map_err(|_| ClientError::Configuration(format!("invalid MIN_POSITION_USD: {v}")))?;
    }
    if let Ok(v) = std::env::var("REFRESH_INTERVAL") {
        config.tracker.refresh_interval_ms = v
            .parse()
            .map_err(|_| ClientError::Configuration(format!("invalid REFRESH_INTERVAL: {v}")))?;
    }
    if let Ok(v) = std::env::var("DATA_FILE_PATH") {
        config.settings.state_file = v;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Process environment is shared; run these one at a time
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn test_defaults_without_file() {
        let _env = ENV_LOCK.lock().unwrap();
        let config = load_config(None).expect("default config should load");
        assert!(config.hyperliquid.api_url.contains("hyperliquid"));
        assert_eq!(config.tracker.fresh_wallet_max_age_days, 7);
    }

    #[test]
    fn test_bare_env_names_override_defaults() {
        let _env = ENV_LOCK.lock().unwrap();
        std::env::set_var("MIN_POSITION_USD", "750000");
        std::env::set_var("DATA_FILE_PATH", "override.json");
        let config = load_config(None).expect("config with overrides should load");
        std::env::remove_var("MIN_POSITION_USD");
        std::env::remove_var("DATA_FILE_PATH");

        assert_eq!(
            config.tracker.min_position_usd,
            rust_decimal::Decimal::from(750_000)
        );
        assert_eq!(config.settings.state_file, "override.json");
    }

    #[test]
    fn test_unparseable_override_is_rejected() {
        let _env = ENV_LOCK.lock().unwrap();
        std::env::set_var("REFRESH_INTERVAL", "soon");
        let result = load_config(None);
        std::env::remove_var("REFRESH_INTERVAL");
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }
}
