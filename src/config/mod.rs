/// Configuration module - organized config system with zero repetition
///
/// # Architecture
///
/// - `macros.rs` - The `config_struct!` macro for defining configs with embedded defaults
/// - `schemas.rs` - All configuration structures defined once with defaults
/// - `utils.rs` - Loading, reloading, and access utilities
///
/// # Usage
///
/// ## Loading configuration at startup:
/// ```
/// use copytrader_core::config::load_config;
///
/// fn main() -> Result<(), String> {
///     load_config()?;
///     Ok(())
/// }
/// ```
///
/// ## Accessing configuration (one-liner):
/// ```
/// use copytrader_core::config::with_config;
///
/// let min_score = with_config(|cfg| cfg.tiers.min_entry_score);
/// ```
///
/// ## Hot-reloading configuration:
/// ```
/// use copytrader_core::config::reload_config;
///
/// reload_config()?;
/// ```
// Export the macro
#[macro_use]
mod macros;

// Export schemas (all config structures)
pub mod schemas;

// Export utilities (loading, reloading, access)
pub mod utils;

pub use schemas::{
    Config, CredentialsConfig, DiscoveryConfig, IntervalsConfig, LoggingConfig, PolicyConfig,
    ProviderConfig, RiskGateConfig, SlippageConfig, TakeProfitConfig, TierBand, TierConfig,
};

pub use utils::{
    get_config_clone, get_signer_keypair, get_signer_pubkey, is_config_initialized, load_config,
    load_config_from_path, reload_config, reload_config_from_path, save_config, with_config,
    CONFIG,
};
