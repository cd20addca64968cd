//! Operator intents
//!
//! An intent is a `(name, value)` pair as it arrives from the supervisory
//! network, e.g. `("ph_setpoint", "7.4")` from a `.../set/ph_setpoint` topic.
//! Parsing maps it onto a [`Command`] and applies the same range checks as
//! the configuration builder, so invalid input never reaches the bus queue.

use heapless::String;

use chembridge_protocol::SettingsError;

use crate::command::Command;

/// Maximum intent name length
pub const MAX_INTENT_NAME_LEN: usize = 24;

/// Maximum intent value length
pub const MAX_INTENT_VALUE_LEN: usize = 16;

/// Why an intent was not turned into a queued command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IntentError {
    /// Control is switched off in the configuration
    ControlDisabled,
    /// Name is not a known intent
    UnknownIntent,
    /// Value is not a number where one is required
    InvalidValue,
    /// Value parsed but lies outside the protocol range
    OutOfRange(SettingsError),
    /// Name or value too long to hold
    TooLong,
    /// Command queue full; the intent was dropped
    QueueFull,
    /// A setting change arrived too soon after the previous one
    RateLimited,
}

impl From<SettingsError> for IntentError {
    fn from(e: SettingsError) -> Self {
        IntentError::OutOfRange(e)
    }
}

/// An owned intent, for carrying across an async boundary
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OperatorIntent {
    pub name: String<MAX_INTENT_NAME_LEN>,
    pub value: String<MAX_INTENT_VALUE_LEN>,
}

impl OperatorIntent {
    pub fn new(name: &str, value: &str) -> Result<Self, IntentError> {
        Ok(Self {
            name: String::try_from(name.trim()).map_err(|_| IntentError::TooLong)?,
            value: String::try_from(value.trim()).map_err(|_| IntentError::TooLong)?,
        })
    }

    pub fn to_command(&self) -> Result<Command, IntentError> {
        parse_intent(&self.name, &self.value)
    }
}

/// Map a `(name, value)` pair to a range-checked [`Command`]
pub fn parse_intent(name: &str, value: &str) -> Result<Command, IntentError> {
    let value = value.trim();
    let command = match name.trim() {
        "ph_setpoint" => Command::SetPhSetpoint(parse_float(value)?),
        "orp_setpoint" => Command::SetOrpSetpoint(parse_integer(value)?),
        "ph_dosing" | "ph_dosing_enabled" => Command::SetPhDosingEnabled(parse_switch(value)),
        "orp_dosing" | "orp_dosing_enabled" => Command::SetOrpDosingEnabled(parse_switch(value)),
        "calcium_hardness" => Command::SetCalciumHardness(parse_integer(value)?),
        "cyanuric_acid" => {
            let ppm: u16 = parse_integer(value)?;
            // Anything past u8 is out of range rather than malformed
            let ppm = u8::try_from(ppm).map_err(|_| SettingsError::CyanuricAcid)?;
            Command::SetCyanuricAcid(ppm)
        }
        "alkalinity" => Command::SetAlkalinity(parse_integer(value)?),
        "request_status" => Command::RequestStatusNow,
        _ => return Err(IntentError::UnknownIntent),
    };

    command.validate()?;
    Ok(command)
}

/// Switch values: ON, 1, true, yes (any case) enable; anything else disables
fn parse_switch(value: &str) -> bool {
    ["on", "1", "true", "yes"]
        .iter()
        .any(|accepted| value.eq_ignore_ascii_case(accepted))
}

fn parse_float(value: &str) -> Result<f32, IntentError> {
    let parsed: f32 = value.parse().map_err(|_| IntentError::InvalidValue)?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(IntentError::InvalidValue)
    }
}

/// Integers may arrive as decimals ("650.0"); the fraction is truncated
fn parse_integer(value: &str) -> Result<u16, IntentError> {
    if let Ok(parsed) = value.parse::<u16>() {
        return Ok(parsed);
    }

    let parsed = parse_float(value)?;
    if parsed < 0.0 {
        return Err(IntentError::InvalidValue);
    }
    // Saturates; oversized values then fail the range check
    Ok(parsed as u16)
}
