//! Commands for the bus task
//!
//! A [`Command`] is what crosses the command queue: a single operator intent,
//! already range-checked at the edge. The bus task merges it onto its staged
//! [`Settings`] and transmits the result.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use chembridge_protocol::settings::{
    validate_alkalinity, validate_calcium_hardness, validate_cyanuric_acid,
    validate_orp_setpoint, validate_ph_setpoint,
};
use chembridge_protocol::{Settings, SettingsError};

/// Command sent from the bridge task to the bus task
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Command {
    SetPhSetpoint(f32),
    /// mV
    SetOrpSetpoint(u16),
    SetPhDosingEnabled(bool),
    SetOrpDosingEnabled(bool),
    /// ppm
    SetCalciumHardness(u16),
    /// ppm
    SetCyanuricAcid(u8),
    /// ppm
    SetAlkalinity(u16),
    /// Poll the device immediately
    RequestStatusNow,
}

impl Command {
    /// Range-check the command value
    pub fn validate(&self) -> Result<(), SettingsError> {
        match *self {
            Command::SetPhSetpoint(value) => validate_ph_setpoint(value),
            Command::SetOrpSetpoint(value) => validate_orp_setpoint(value),
            Command::SetCalciumHardness(value) => validate_calcium_hardness(value),
            Command::SetCyanuricAcid(value) => validate_cyanuric_acid(value),
            Command::SetAlkalinity(value) => validate_alkalinity(value),
            Command::SetPhDosingEnabled(_)
            | Command::SetOrpDosingEnabled(_)
            | Command::RequestStatusNow => Ok(()),
        }
    }

    /// Whether the command results in a configuration write
    pub fn is_config_change(&self) -> bool {
        !matches!(self, Command::RequestStatusNow)
    }

    /// Merge the command onto `current`, returning the settings to transmit
    ///
    /// `current` is left untouched; the result is fully validated.
    pub fn apply(&self, current: &Settings) -> Result<Settings, SettingsError> {
        self.validate()?;

        let mut next = *current;
        match *self {
            Command::SetPhSetpoint(value) => next.ph_setpoint = value,
            Command::SetOrpSetpoint(value) => next.orp_setpoint = value,
            Command::SetPhDosingEnabled(enabled) => next.set_ph_dosing_enabled(enabled),
            Command::SetOrpDosingEnabled(enabled) => next.set_orp_dosing_enabled(enabled),
            Command::SetCalciumHardness(value) => next.calcium_hardness = value,
            Command::SetCyanuricAcid(value) => next.cyanuric_acid = value,
            Command::SetAlkalinity(value) => next.alkalinity = value,
            Command::RequestStatusNow => {}
        }

        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chembridge_protocol::settings::TANK_LEVEL_MAX;

    #[test]
    fn test_apply_setpoint() {
        let current = Settings::default();
        let next = Command::SetPhSetpoint(7.4).apply(&current).unwrap();
        assert_eq!(next.ph_setpoint, 7.4);
        assert_eq!(next.orp_setpoint, current.orp_setpoint);
        assert_eq!(current.ph_setpoint, 7.2);
    }

    #[test]
    fn test_apply_rejects_out_of_range() {
        let current = Settings::default();
        assert_eq!(
            Command::SetPhSetpoint(6.9).apply(&current),
            Err(SettingsError::PhSetpoint)
        );
        assert_eq!(
            Command::SetOrpSetpoint(900).apply(&current),
            Err(SettingsError::OrpSetpoint)
        );
        assert_eq!(
            Command::SetCalciumHardness(10).apply(&current),
            Err(SettingsError::CalciumHardness)
        );
        assert_eq!(
            Command::SetCyanuricAcid(211).apply(&current),
            Err(SettingsError::CyanuricAcid)
        );
        assert_eq!(
            Command::SetAlkalinity(1000).apply(&current),
            Err(SettingsError::Alkalinity)
        );
    }

    #[test]
    fn test_apply_dosing_switch() {
        let current = Settings {
            orp_tank_level: 0,
            ..Settings::default()
        };

        let next = Command::SetOrpDosingEnabled(true).apply(&current).unwrap();
        assert_eq!(next.orp_tank_level, TANK_LEVEL_MAX);

        let next = Command::SetPhDosingEnabled(false).apply(&next).unwrap();
        assert_eq!(next.ph_tank_level, 0);
        assert_eq!(next.orp_tank_level, TANK_LEVEL_MAX);
    }

    #[test]
    fn test_apply_rejects_invalid_staged_settings() {
        // A stale device report can carry values the device accepts but we do not
        let current = Settings {
            calcium_hardness: 0,
            ..Settings::default()
        };
        assert_eq!(
            Command::SetPhSetpoint(7.3).apply(&current),
            Err(SettingsError::CalciumHardness)
        );
    }

    #[test]
    fn test_request_status_is_not_config() {
        assert!(!Command::RequestStatusNow.is_config_change());
        assert!(Command::SetAlkalinity(100).is_config_change());
        assert_eq!(Command::RequestStatusNow.validate(), Ok(()));
    }
}
