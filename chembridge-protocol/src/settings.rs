//! Configuration command (action 146)
//!
//! [`Settings`] stages everything the device accepts in one configuration
//! write. Every field is range-checked before any byte is built, and a failed
//! check names the offending field.

use crate::frame::{Frame, FrameError, ACTION_CONFIG_COMMAND, CONTROLLER_ADDRESS};
use crate::state::DeviceState;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed configuration payload length
pub const CONFIG_PAYLOAD_LENGTH: usize = 21;

pub const PH_SETPOINT_MIN: f32 = 7.0;
pub const PH_SETPOINT_MAX: f32 = 7.6;
pub const ORP_SETPOINT_MIN: u16 = 400;
pub const ORP_SETPOINT_MAX: u16 = 800;
pub const TANK_LEVEL_MAX: u8 = 7;
pub const CALCIUM_HARDNESS_MIN: u16 = 25;
pub const CALCIUM_HARDNESS_MAX: u16 = 800;
pub const CYANURIC_ACID_MAX: u8 = 210;
pub const ALKALINITY_MIN: u16 = 25;
pub const ALKALINITY_MAX: u16 = 800;

/// Byte offsets within the configuration payload
mod offset {
    pub const PH_SETPOINT: usize = 0;
    pub const ORP_SETPOINT: usize = 2;
    pub const PH_TANK_LEVEL: usize = 4;
    pub const ORP_TANK_LEVEL: usize = 5;
    pub const CALCIUM: usize = 6;
    pub const CYANURIC_ACID: usize = 9;
    pub const ALKALINITY_HIGH: usize = 10;
    pub const ALKALINITY_LOW: usize = 12;
}

/// A settings field that failed range validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    PhSetpoint,
    OrpSetpoint,
    PhTankLevel,
    OrpTankLevel,
    CalciumHardness,
    CyanuricAcid,
    Alkalinity,
}

impl SettingsError {
    /// Operator-facing name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            SettingsError::PhSetpoint => "ph_setpoint",
            SettingsError::OrpSetpoint => "orp_setpoint",
            SettingsError::PhTankLevel => "ph_tank_level",
            SettingsError::OrpTankLevel => "orp_tank_level",
            SettingsError::CalciumHardness => "calcium_hardness",
            SettingsError::CyanuricAcid => "cyanuric_acid",
            SettingsError::Alkalinity => "alkalinity",
        }
    }
}

/// Outbound configuration record
///
/// Tank levels double as dosing switches: 0 disables dosing for that channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Settings {
    pub ph_setpoint: f32,
    /// mV
    pub orp_setpoint: u16,
    pub ph_tank_level: u8,
    pub orp_tank_level: u8,
    /// ppm
    pub calcium_hardness: u16,
    /// ppm
    pub cyanuric_acid: u8,
    /// ppm
    pub alkalinity: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ph_setpoint: 7.2,
            orp_setpoint: 650,
            ph_tank_level: TANK_LEVEL_MAX,
            orp_tank_level: TANK_LEVEL_MAX,
            calcium_hardness: 300,
            cyanuric_acid: 30,
            alkalinity: 80,
        }
    }
}

pub fn validate_ph_setpoint(value: f32) -> Result<(), SettingsError> {
    if (PH_SETPOINT_MIN..=PH_SETPOINT_MAX).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::PhSetpoint)
    }
}

pub fn validate_orp_setpoint(value: u16) -> Result<(), SettingsError> {
    if (ORP_SETPOINT_MIN..=ORP_SETPOINT_MAX).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OrpSetpoint)
    }
}

pub fn validate_calcium_hardness(value: u16) -> Result<(), SettingsError> {
    if (CALCIUM_HARDNESS_MIN..=CALCIUM_HARDNESS_MAX).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::CalciumHardness)
    }
}

pub fn validate_cyanuric_acid(value: u8) -> Result<(), SettingsError> {
    if value <= CYANURIC_ACID_MAX {
        Ok(())
    } else {
        Err(SettingsError::CyanuricAcid)
    }
}

pub fn validate_alkalinity(value: u16) -> Result<(), SettingsError> {
    if (ALKALINITY_MIN..=ALKALINITY_MAX).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::Alkalinity)
    }
}

impl Settings {
    /// Settings matching what the device last reported
    ///
    /// Tank levels are copied as decoded (0..=6), so a device that reports a
    /// full tank is written back one step lower.
    pub fn from_state(state: &DeviceState) -> Self {
        Self {
            ph_setpoint: state.ph.setpoint,
            orp_setpoint: state.orp.setpoint as u16,
            ph_tank_level: state.ph.tank_level,
            orp_tank_level: state.orp.tank_level,
            calcium_hardness: state.calcium_hardness,
            cyanuric_acid: state.cyanuric_acid,
            alkalinity: state.alkalinity,
        }
    }

    /// Check every field against its protocol range
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_ph_setpoint(self.ph_setpoint)?;
        validate_orp_setpoint(self.orp_setpoint)?;
        if self.ph_tank_level > TANK_LEVEL_MAX {
            return Err(SettingsError::PhTankLevel);
        }
        if self.orp_tank_level > TANK_LEVEL_MAX {
            return Err(SettingsError::OrpTankLevel);
        }
        validate_calcium_hardness(self.calcium_hardness)?;
        validate_cyanuric_acid(self.cyanuric_acid)?;
        validate_alkalinity(self.alkalinity)
    }

    pub fn ph_dosing_enabled(&self) -> bool {
        self.ph_tank_level > 0
    }

    pub fn orp_dosing_enabled(&self) -> bool {
        self.orp_tank_level > 0
    }

    /// Enable or disable pH dosing through the tank level
    ///
    /// Enabling keeps a nonzero level and otherwise assumes a full tank.
    pub fn set_ph_dosing_enabled(&mut self, enabled: bool) {
        self.ph_tank_level = dosing_tank_level(self.ph_tank_level, enabled);
    }

    /// Enable or disable ORP dosing through the tank level
    pub fn set_orp_dosing_enabled(&mut self, enabled: bool) {
        self.orp_tank_level = dosing_tank_level(self.orp_tank_level, enabled);
    }

    /// Build the 21-byte configuration payload
    pub fn to_payload(&self) -> Result<[u8; CONFIG_PAYLOAD_LENGTH], SettingsError> {
        self.validate()?;

        let mut payload = [0u8; CONFIG_PAYLOAD_LENGTH];
        let ph = (self.ph_setpoint * 100.0 + 0.5) as u16;
        payload[offset::PH_SETPOINT..offset::PH_SETPOINT + 2].copy_from_slice(&ph.to_be_bytes());
        payload[offset::ORP_SETPOINT..offset::ORP_SETPOINT + 2]
            .copy_from_slice(&self.orp_setpoint.to_be_bytes());
        payload[offset::PH_TANK_LEVEL] = self.ph_tank_level;
        payload[offset::ORP_TANK_LEVEL] = self.orp_tank_level;
        payload[offset::CALCIUM..offset::CALCIUM + 2]
            .copy_from_slice(&self.calcium_hardness.to_be_bytes());
        payload[offset::CYANURIC_ACID] = self.cyanuric_acid;

        // Alkalinity is split around a reserved byte
        let [alk_high, alk_low] = self.alkalinity.to_be_bytes();
        payload[offset::ALKALINITY_HIGH] = alk_high;
        payload[offset::ALKALINITY_LOW] = alk_low;

        Ok(payload)
    }

    /// Build the framed configuration command for the device at `device_address`
    pub fn to_frame(&self, device_address: u8) -> Result<Frame, ConfigCommandError> {
        let payload = self.to_payload()?;
        let frame = Frame::new(
            device_address,
            CONTROLLER_ADDRESS,
            ACTION_CONFIG_COMMAND,
            &payload,
        )?;
        Ok(frame)
    }
}

fn dosing_tank_level(current: u8, enabled: bool) -> u8 {
    match (enabled, current) {
        (false, _) => 0,
        (true, 0) => TANK_LEVEL_MAX,
        (true, level) => level,
    }
}

/// Errors from building a framed configuration command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigCommandError {
    Settings(SettingsError),
    Frame(FrameError),
}

impl From<SettingsError> for ConfigCommandError {
    fn from(e: SettingsError) -> Self {
        ConfigCommandError::Settings(e)
    }
}

impl From<FrameError> for ConfigCommandError {
    fn from(e: FrameError) -> Self {
        ConfigCommandError::Frame(e)
    }
}
