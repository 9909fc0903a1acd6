/// Configuration utilities - loading, reloading, and access helpers
///
/// This module provides utility functions for working with the configuration system:
/// - Loading configuration from disk
/// - Hot-reloading configuration at runtime
/// - Thread-safe access helpers
use super::schemas::Config;
use crate::paths;
use once_cell::sync::OnceCell;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::RwLock;

/// Global configuration instance.
///
/// This is the single source of truth for all configuration values.
/// Access it using the helper functions below.
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

fn config_file_path() -> String {
    paths::get_config_path().to_string_lossy().into_owned()
}

/// Load configuration from the platform data directory and initialize CONFIG.
///
/// Should be called once at startup. If the config file doesn't exist,
/// defaults from the schema definitions are used.
pub fn load_config() -> Result<(), String> {
    load_config_from_path(&config_file_path())
}

/// Load configuration from a specific file path.
pub fn load_config_from_path(path: &str) -> Result<(), String> {
    let config = if std::path::Path::new(path).exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

        toml::from_str::<Config>(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))?
    } else {
        eprintln!("Config file '{}' not found, using default values", path);
        Config::default()
    };

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(())
}

/// Reload configuration from the platform data directory.
///
/// Allows hot-reloading configuration changes without restarting. The
/// configuration is atomically replaced, so concurrent reads stay consistent.
pub fn reload_config() -> Result<(), String> {
    reload_config_from_path(&config_file_path())
}

/// Reload configuration from a specific file path.
pub fn reload_config_from_path(path: &str) -> Result<(), String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

    let new_config = toml::from_str::<Config>(&contents)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))?;

    if let Some(config_lock) = CONFIG.get() {
        let mut config = config_lock
            .write()
            .map_err(|e| format!("Failed to acquire config write lock: {}", e))?;
        *config = new_config;
        Ok(())
    } else {
        Err("Config not initialized. Call load_config() first.".to_string())
    }
}

/// Execute a function with read access to the configuration.
///
/// This is the recommended way to read configuration values. The closure
/// receives an immutable reference to the Config.
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let config_lock = CONFIG
        .get()
        .expect("Config not initialized. Call load_config() first.");

    let config = config_lock
        .read()
        .expect("Failed to acquire config read lock");

    f(&config)
}

/// Get a clone of the entire configuration.
///
/// Useful when config values need to be held across await points.
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

/// Save the current configuration to disk.
pub fn save_config(path: Option<&str>) -> Result<(), String> {
    let owned_path = config_file_path();
    let path = path.unwrap_or(&owned_path);

    let config_str = with_config(|cfg| {
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
    })?;

    std::fs::write(path, config_str)
        .map_err(|e| format!("Failed to write config file '{}': {}", path, e))?;

    Ok(())
}

/// Check if configuration has been initialized.
pub fn is_config_initialized() -> bool {
    CONFIG.get().is_some()
}

/// Load the signer keypair from `credentials.signer_keypair_path`.
///
/// The file is expected to hold the JSON byte-array format produced by the
/// Solana CLI (`solana-keygen new`).
pub fn get_signer_keypair() -> Result<Keypair, String> {
    let path = with_config(|cfg| cfg.credentials.signer_keypair_path.clone());

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read signer keypair '{}': {}", path, e))?;

    let bytes: Vec<u8> = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse signer keypair '{}': {}", path, e))?;

    Keypair::try_from(bytes.as_slice()).map_err(|e| format!("Invalid signer keypair '{}': {}", path, e))
}

/// Convenience wrapper returning just the signer's base58 public key.
pub fn get_signer_pubkey() -> Result<String, String> {
    Ok(get_signer_keypair()?.pubkey().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_tier_floor() {
        let config = Config::default();
        assert_eq!(config.tiers.min_entry_score, 60.0);
        assert_eq!(config.discovery.pool_limit, 300);
    }

    #[test]
    fn default_config_serializes_with_section_headers() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[tiers]"));
        assert!(toml_str.contains("[discovery]"));
        assert!(toml_str.contains("[risk_gate]"));
    }
}
