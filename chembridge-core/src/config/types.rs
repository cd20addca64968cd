//! Configuration type definitions

use chembridge_hal::UartConfig;
use chembridge_protocol::frame::{is_device_address, DEFAULT_DEVICE_ADDRESS};

use crate::link::DEFAULT_COMMS_LOST_THRESHOLD_MS;

pub const POLL_INTERVAL_MIN_S: u32 = 5;
pub const POLL_INTERVAL_MAX_S: u32 = 300;
pub const RESPONSE_TIMEOUT_MIN_MS: u32 = 1_000;
pub const RESPONSE_TIMEOUT_MAX_MS: u32 = 30_000;
pub const COMMAND_RATE_LIMIT_MAX_MS: u32 = 60_000;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value has the wrong type or cannot be parsed
    InvalidValue,
    /// Key not recognized in its section
    UnknownKey,
    /// Device address outside 144..=158
    DeviceAddress,
    /// Poll interval outside 5..=300 s
    PollInterval,
    /// Response timeout outside 1..=30 s
    ResponseTimeout,
    /// Comms-lost threshold shorter than the poll interval
    CommsLostThreshold,
    /// Command rate limit above 60 s
    CommandRateLimit,
    /// Serial settings unusable
    Serial,
}

/// Bridge configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    /// IntelliChem bus address (144..=158)
    pub device_address: u8,
    /// Seconds between status requests
    pub poll_interval_s: u32,
    /// How long to wait for a status response
    pub response_timeout_ms: u32,
    /// Silence before the device is reported as lost
    pub comms_lost_threshold_ms: u64,
    /// Accept operator intents
    pub control_enabled: bool,
    /// Minimum spacing between accepted setting changes; 0 disables the limit
    pub command_rate_limit_ms: u32,
    /// Bridge task wait on the state queue before housekeeping
    pub state_wait_ms: u32,
    /// Serial line settings
    pub uart: UartConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device_address: DEFAULT_DEVICE_ADDRESS,
            poll_interval_s: 30,
            response_timeout_ms: 5_000,
            comms_lost_threshold_ms: DEFAULT_COMMS_LOST_THRESHOLD_MS,
            control_enabled: true,
            command_rate_limit_ms: 2_000,
            state_wait_ms: 1_000,
            uart: UartConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Poll interval in milliseconds
    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_s as u64 * 1_000
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_device_address(self.device_address) {
            return Err(ConfigError::DeviceAddress);
        }
        if !(POLL_INTERVAL_MIN_S..=POLL_INTERVAL_MAX_S).contains(&self.poll_interval_s) {
            return Err(ConfigError::PollInterval);
        }
        if !(RESPONSE_TIMEOUT_MIN_MS..=RESPONSE_TIMEOUT_MAX_MS).contains(&self.response_timeout_ms)
        {
            return Err(ConfigError::ResponseTimeout);
        }
        if self.comms_lost_threshold_ms < self.poll_interval_ms() {
            return Err(ConfigError::CommsLostThreshold);
        }
        if self.command_rate_limit_ms > COMMAND_RATE_LIMIT_MAX_MS {
            return Err(ConfigError::CommandRateLimit);
        }
        if self.uart.baudrate == 0 {
            return Err(ConfigError::Serial);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BridgeConfig::default();
        assert_eq!(config.device_address, 144);
        assert_eq!(config.poll_interval_ms(), 30_000);
        assert_eq!(config.response_timeout_ms, 5_000);
        assert_eq!(config.comms_lost_threshold_ms, 30_000);
        assert!(config.control_enabled);
        assert_eq!(config.command_rate_limit_ms, 2_000);
        assert_eq!(config.uart.baudrate, 9600);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_address_range() {
        let mut config = BridgeConfig::default();
        config.device_address = 158;
        assert_eq!(config.validate(), Ok(()));
        config.device_address = 159;
        assert_eq!(config.validate(), Err(ConfigError::DeviceAddress));
        config.device_address = 16;
        assert_eq!(config.validate(), Err(ConfigError::DeviceAddress));
    }

    #[test]
    fn test_poll_interval_range() {
        let mut config = BridgeConfig::default();
        config.poll_interval_s = 4;
        assert_eq!(config.validate(), Err(ConfigError::PollInterval));
        config.poll_interval_s = 301;
        assert_eq!(config.validate(), Err(ConfigError::PollInterval));
        config.poll_interval_s = 5;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_threshold_must_cover_a_poll() {
        let config = BridgeConfig {
            poll_interval_s: 60,
            ..BridgeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::CommsLostThreshold));
    }

    #[test]
    fn test_rate_limit_range() {
        let mut config = BridgeConfig::default();
        config.command_rate_limit_ms = 0;
        assert_eq!(config.validate(), Ok(()));
        config.command_rate_limit_ms = 60_001;
        assert_eq!(config.validate(), Err(ConfigError::CommandRateLimit));
    }
}
