//! Minimal configuration file parser
//!
//! Handles only the subset of TOML used by `bridge.toml`:
//! - `[section]` headers (`intellichem`, `serial`, `bridge`)
//! - `key = value` pairs (string, integer, boolean)
//! - Comments (`# ...`), including trailing comments outside strings
//!
//! Keys not given keep their default value. The result is validated before
//! it is returned.

use chembridge_hal::uart::{DataBits, Parity, StopBits};

use super::types::{BridgeConfig, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Intellichem,
    Serial,
    Bridge,
}

/// Parse configuration text into a validated [`BridgeConfig`]
pub fn parse_config(input: &str) -> Result<BridgeConfig, ConfigError> {
    let mut config = BridgeConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            section = parse_section_header(line)?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ConfigError::InvalidValue)?;
        apply_value(&mut config, section, key, value)?;
    }

    config.validate()?;
    Ok(config)
}

fn parse_section_header(line: &str) -> Result<Section, ConfigError> {
    let name = line
        .strip_prefix('[')
        .and_then(|rest| rest.split('#').next())
        .map(str::trim)
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or(ConfigError::InvalidSection)?;

    match name.trim() {
        "intellichem" => Ok(Section::Intellichem),
        "serial" => Ok(Section::Serial),
        "bridge" => Ok(Section::Bridge),
        _ => Err(ConfigError::InvalidSection),
    }
}

fn apply_value(
    config: &mut BridgeConfig,
    section: Section,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    match (section, key) {
        (Section::Intellichem, "address") => config.device_address = parse_int(value)?,
        (Section::Intellichem, "poll_interval") => config.poll_interval_s = parse_int(value)?,
        (Section::Intellichem, "timeout") => {
            let seconds: u32 = parse_int(value)?;
            config.response_timeout_ms = seconds.saturating_mul(1_000);
        }

        (Section::Serial, "baudrate") => config.uart.baudrate = parse_int(value)?,
        (Section::Serial, "databits") => {
            config.uart.data_bits = match parse_int::<u8>(value)? {
                7 => DataBits::Seven,
                8 => DataBits::Eight,
                _ => return Err(ConfigError::Serial),
            }
        }
        (Section::Serial, "parity") => {
            config.uart.parity = match parse_string(value)? {
                "none" | "N" => Parity::None,
                "even" | "E" => Parity::Even,
                "odd" | "O" => Parity::Odd,
                _ => return Err(ConfigError::Serial),
            }
        }
        (Section::Serial, "stopbits") => {
            config.uart.stop_bits = match parse_int::<u8>(value)? {
                1 => StopBits::One,
                2 => StopBits::Two,
                _ => return Err(ConfigError::Serial),
            }
        }

        (Section::Bridge, "control_enabled") => config.control_enabled = parse_bool(value)?,
        (Section::Bridge, "comms_lost_threshold") => {
            let seconds: u64 = parse_int(value)?;
            config.comms_lost_threshold_ms = seconds.saturating_mul(1_000);
        }
        (Section::Bridge, "state_wait_ms") => config.state_wait_ms = parse_int(value)?,
        (Section::Bridge, "command_rate_limit_ms") => {
            config.command_rate_limit_ms = parse_int(value)?
        }

        _ => return Err(ConfigError::UnknownKey),
    }
    Ok(())
}

/// Split `key = value`, dropping a trailing comment outside quotes
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    let value = match value.find('#') {
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Strip surrounding quotes; bare words are accepted as-is
fn parse_string(value: &str) -> Result<&str, ConfigError> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else if value.contains('"') {
        Err(ConfigError::InvalidValue)
    } else {
        Ok(value)
    }
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# IntelliChem bridge
[intellichem]
address = 145
poll_interval = 15   # seconds
timeout = 3

[serial]
baudrate = 9600
databits = 8
parity = "none"
stopbits = 1

[bridge]
control_enabled = false
comms_lost_threshold = 45
state_wait_ms = 500
command_rate_limit_ms = 0
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.device_address, 145);
        assert_eq!(config.poll_interval_s, 15);
        assert_eq!(config.response_timeout_ms, 3_000);
        assert_eq!(config.uart.baudrate, 9600);
        assert_eq!(config.uart.parity, Parity::None);
        assert!(!config.control_enabled);
        assert_eq!(config.comms_lost_threshold_ms, 45_000);
        assert_eq!(config.state_wait_ms, 500);
        assert_eq!(config.command_rate_limit_ms, 0);
    }

    #[test]
    fn test_empty_input_gives_defaults() {
        assert_eq!(parse_config(""), Ok(BridgeConfig::default()));
        assert_eq!(
            parse_config("# nothing here\n\n"),
            Ok(BridgeConfig::default())
        );
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = parse_config("[intellichem]\naddress = 150\n").unwrap();
        assert_eq!(config.device_address, 150);
        assert_eq!(config.poll_interval_s, 30);
        assert!(config.control_enabled);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert_eq!(
            parse_config("[intellichem]\naddress = 16\n"),
            Err(ConfigError::DeviceAddress)
        );
        assert_eq!(
            parse_config("[intellichem]\npoll_interval = 2\n"),
            Err(ConfigError::PollInterval)
        );
        assert_eq!(
            parse_config("[intellichem]\ntimeout = 0\n"),
            Err(ConfigError::ResponseTimeout)
        );
        assert_eq!(
            parse_config("[bridge]\ncommand_rate_limit_ms = 90000\n"),
            Err(ConfigError::CommandRateLimit)
        );
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(
            parse_config("[mqtt]\nhost = \"x\"\n"),
            Err(ConfigError::InvalidSection)
        );
        assert_eq!(
            parse_config("[intellichem\n"),
            Err(ConfigError::InvalidSection)
        );
        assert_eq!(
            parse_config("[intellichem]\naddress = lots\n"),
            Err(ConfigError::InvalidValue)
        );
        assert_eq!(
            parse_config("[bridge]\ncontrol_enabled = yes\n"),
            Err(ConfigError::InvalidValue)
        );
        assert_eq!(
            parse_config("[bridge]\nverbose = true\n"),
            Err(ConfigError::UnknownKey)
        );
        assert_eq!(parse_config("address = 144\n"), Err(ConfigError::UnknownKey));
        assert_eq!(
            parse_config("[serial]\nparity = \"mark\"\n"),
            Err(ConfigError::Serial)
        );
    }

    #[test]
    fn test_key_value_comments() {
        assert_eq!(parse_key_value("a = 1 # note"), Some(("a", "1")));
        assert_eq!(
            parse_key_value("a = \"x # y\""),
            Some(("a", "\"x # y\""))
        );
        assert_eq!(parse_key_value("a ="), None);
        assert_eq!(parse_key_value("no equals"), None);
    }
}
