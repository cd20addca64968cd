//! Decoded device snapshot
//!
//! A [`DeviceState`] is produced whole by the status parser and replaced
//! wholesale on every successful parse. All types are `Copy` so the snapshot
//! can cross task boundaries through a channel or a copy-only lock.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dosing activity of one chemical channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DosingStatus {
    Dosing,
    #[default]
    Monitoring,
    Mixing,
}

impl DosingStatus {
    /// Decode a 2-bit status field, clamping out-of-range values to `Mixing`
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => DosingStatus::Dosing,
            1 => DosingStatus::Monitoring,
            _ => DosingStatus::Mixing,
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            DosingStatus::Dosing => 0,
            DosingStatus::Monitoring => 1,
            DosingStatus::Mixing => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DosingStatus::Dosing => "Dosing",
            DosingStatus::Monitoring => "Monitoring",
            DosingStatus::Mixing => "Mixing",
        }
    }
}

/// Water balance reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WaterChemistry {
    #[default]
    Ok,
    Corrosive,
    Scaling,
}

impl WaterChemistry {
    /// Decode the status byte, clamping out-of-range values to `Scaling`
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => WaterChemistry::Ok,
            1 => WaterChemistry::Corrosive,
            _ => WaterChemistry::Scaling,
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            WaterChemistry::Ok => 0,
            WaterChemistry::Corrosive => 1,
            WaterChemistry::Scaling => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WaterChemistry::Ok => "OK",
            WaterChemistry::Corrosive => "Corrosive",
            WaterChemistry::Scaling => "Scaling",
        }
    }
}

/// One measured chemical (pH or ORP)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChemicalChannel {
    /// Current reading (pH units or mV)
    pub level: f32,
    /// Target reading (pH units or mV)
    pub setpoint: f32,
    /// Current dose time in seconds
    pub dose_time: u16,
    /// Dose volume in mL
    pub dose_volume: u16,
    /// Tank level, 0 (empty or no tank) to 6
    pub tank_level: u8,
    pub dosing_status: DosingStatus,
    /// Dosing right now with a configured doser
    pub is_dosing: bool,
}

impl ChemicalChannel {
    /// Highest internal tank level
    pub const TANK_LEVEL_MAX: u8 = 6;

    /// Tank level as a percentage of full
    pub fn tank_level_percent(&self) -> f32 {
        self.tank_level as f32 / Self::TANK_LEVEL_MAX as f32 * 100.0
    }
}

/// Alarm flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alarms {
    /// No water flow
    pub flow: bool,
    pub ph_tank_empty: bool,
    pub orp_tank_empty: bool,
    pub probe_fault: bool,
}

impl Alarms {
    pub const FLOW: u8 = 0x01;
    pub const PH_TANK_EMPTY: u8 = 0x20;
    pub const ORP_TANK_EMPTY: u8 = 0x40;
    pub const PROBE_FAULT: u8 = 0x80;

    pub fn from_bits(bits: u8) -> Self {
        Self {
            flow: bits & Self::FLOW != 0,
            ph_tank_empty: bits & Self::PH_TANK_EMPTY != 0,
            orp_tank_empty: bits & Self::ORP_TANK_EMPTY != 0,
            probe_fault: bits & Self::PROBE_FAULT != 0,
        }
    }

    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.flow {
            bits |= Self::FLOW;
        }
        if self.ph_tank_empty {
            bits |= Self::PH_TANK_EMPTY;
        }
        if self.orp_tank_empty {
            bits |= Self::ORP_TANK_EMPTY;
        }
        if self.probe_fault {
            bits |= Self::PROBE_FAULT;
        }
        bits
    }

    /// Any alarm active
    pub fn any(&self) -> bool {
        self.bits() != 0
    }
}

/// Warning flags plus the water balance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Warnings {
    pub ph_lockout: bool,
    pub ph_daily_limit: bool,
    pub orp_daily_limit: bool,
    pub invalid_setup: bool,
    /// Device cannot reach the chlorinator
    pub chlorinator_comm_error: bool,
    pub water_chemistry: WaterChemistry,
}

impl Warnings {
    pub const PH_LOCKOUT: u8 = 0x01;
    pub const PH_DAILY_LIMIT: u8 = 0x02;
    pub const ORP_DAILY_LIMIT: u8 = 0x04;
    pub const INVALID_SETUP: u8 = 0x08;
    pub const CHLORINATOR_COMM: u8 = 0x10;

    /// Decode the warning bitfield and the separate water chemistry byte
    pub fn from_raw(bits: u8, water_chemistry: u8) -> Self {
        Self {
            ph_lockout: bits & Self::PH_LOCKOUT != 0,
            ph_daily_limit: bits & Self::PH_DAILY_LIMIT != 0,
            orp_daily_limit: bits & Self::ORP_DAILY_LIMIT != 0,
            invalid_setup: bits & Self::INVALID_SETUP != 0,
            chlorinator_comm_error: bits & Self::CHLORINATOR_COMM != 0,
            water_chemistry: WaterChemistry::from_raw(water_chemistry),
        }
    }

    /// Warning bitfield, without the water chemistry status
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.ph_lockout {
            bits |= Self::PH_LOCKOUT;
        }
        if self.ph_daily_limit {
            bits |= Self::PH_DAILY_LIMIT;
        }
        if self.orp_daily_limit {
            bits |= Self::ORP_DAILY_LIMIT;
        }
        if self.invalid_setup {
            bits |= Self::INVALID_SETUP;
        }
        if self.chlorinator_comm_error {
            bits |= Self::CHLORINATOR_COMM;
        }
        bits
    }

    /// Any warning active, including unbalanced water
    pub fn any(&self) -> bool {
        self.bits() != 0 || self.water_chemistry != WaterChemistry::Ok
    }
}

/// Device firmware version, displayed as `major.minor` with a 3-digit minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

/// Longest firmware version rendering: "255.255"
pub const FIRMWARE_VERSION_MAX_LEN: usize = 7;

impl FirmwareVersion {
    pub fn render(&self) -> heapless::String<FIRMWARE_VERSION_MAX_LEN> {
        let mut out = heapless::String::new();
        // Always fits
        let _ = fmt::write(&mut out, format_args!("{}", self));
        out
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.major, self.minor)
    }
}

/// Complete device snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceState {
    /// Bus address the status came from
    pub address: u8,
    pub ph: ChemicalChannel,
    pub orp: ChemicalChannel,
    /// Langelier Saturation Index
    pub lsi: f32,
    /// ppm
    pub calcium_hardness: u16,
    /// ppm
    pub cyanuric_acid: u8,
    /// ppm
    pub alkalinity: u16,
    /// ppm, reported in steps of 50
    pub salt_level: u16,
    /// Water temperature, as configured on the device (usually Fahrenheit)
    pub temperature: u8,
    pub firmware: FirmwareVersion,
    pub alarms: Alarms,
    pub warnings: Warnings,
    /// Inverse of the flow alarm
    pub flow_detected: bool,
    pub comms_lost: bool,
    /// Milliseconds since boot when this snapshot was decoded
    pub last_update_ms: u64,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            address: crate::frame::DEFAULT_DEVICE_ADDRESS,
            ph: ChemicalChannel {
                setpoint: 7.2,
                ..ChemicalChannel::default()
            },
            orp: ChemicalChannel {
                setpoint: 650.0,
                ..ChemicalChannel::default()
            },
            lsi: 0.0,
            calcium_hardness: 0,
            cyanuric_acid: 0,
            alkalinity: 0,
            salt_level: 0,
            temperature: 0,
            firmware: FirmwareVersion::default(),
            alarms: Alarms::default(),
            warnings: Warnings::default(),
            flow_detected: true,
            comms_lost: false,
            last_update_ms: 0,
        }
    }
}
