//! Configuration loading
//!
//! The configuration is compiled in from `bridge.toml` (checked by the build
//! script) and parsed at boot.

use defmt::*;

use chembridge_core::config::parse_config;
use chembridge_core::BridgeConfig;

/// Embedded configuration
/// Edit bridge.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../bridge.toml");

/// Parse the embedded configuration, falling back to defaults
pub fn load_config() -> BridgeConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!(
                "Config: device=0x{:02X} poll={}s timeout={}ms control={}",
                config.device_address,
                config.poll_interval_s,
                config.response_timeout_ms,
                config.control_enabled
            );
            config
        }
        Err(e) => {
            error!("Invalid bridge.toml ({:?}), using defaults", e);
            BridgeConfig::default()
        }
    }
}
