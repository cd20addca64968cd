//! Status response decoding
//!
//! The status response (action 18) carries a fixed 41-byte payload mixing
//! big-endian integers, scaled values, and bitfields. Decoding either yields a
//! complete [`DeviceState`] or a typed error; there is no partial result.

use crate::frame::{is_device_address, Frame, FrameError, ACTION_STATUS_RESPONSE, CONTROLLER_ADDRESS};
use crate::state::{
    Alarms, ChemicalChannel, DeviceState, DosingStatus, FirmwareVersion, Warnings,
};

/// Minimum status payload length
pub const STATUS_PAYLOAD_LENGTH: usize = 41;

/// Byte offsets within the status payload
pub mod offset {
    pub const PH_LEVEL: usize = 0;
    pub const ORP_LEVEL: usize = 2;
    pub const PH_SETPOINT: usize = 4;
    pub const ORP_SETPOINT: usize = 6;
    pub const PH_DOSE_TIME: usize = 10;
    pub const ORP_DOSE_TIME: usize = 14;
    pub const PH_DOSE_VOLUME: usize = 16;
    pub const ORP_DOSE_VOLUME: usize = 18;
    pub const PH_TANK_LEVEL: usize = 20;
    pub const ORP_TANK_LEVEL: usize = 21;
    pub const LSI: usize = 22;
    pub const CALCIUM: usize = 23;
    pub const CYANURIC_ACID: usize = 26;
    pub const ALKALINITY: usize = 27;
    pub const SALT: usize = 29;
    pub const TEMPERATURE: usize = 31;
    pub const ALARMS: usize = 32;
    pub const WARNINGS: usize = 33;
    pub const DOSING_STATUS: usize = 34;
    pub const STATUS_FLAGS: usize = 35;
    pub const FIRMWARE_MINOR: usize = 36;
    pub const FIRMWARE_MAJOR: usize = 37;
    pub const WATER_CHEMISTRY: usize = 38;
}

/// Status flag: device lost contact with its own peripherals
pub const STATUS_COMMS_LOST: u8 = 0x80;

/// Salt level is reported in units of this many ppm
pub const SALT_SCALE: u16 = 50;

// Dosing status byte, low to high: pH doser type, ORP doser type,
// pH status, ORP status (2 bits each)
const DOSING_PH_TYPE_MASK: u8 = 0x03;
const DOSING_ORP_TYPE_SHIFT: u8 = 2;
const DOSING_PH_STATUS_SHIFT: u8 = 4;
const DOSING_ORP_STATUS_SHIFT: u8 = 6;
const TWO_BITS: u8 = 0x03;

/// Errors that can occur while decoding a status response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusError {
    /// Payload shorter than [`STATUS_PAYLOAD_LENGTH`]
    PayloadTooShort(usize),
    /// Frame is not a status response
    UnexpectedAction(u8),
    /// Source address is not a valid device address
    InvalidSource(u8),
}

/// Decode a validated status response frame
pub fn parse_status(frame: &Frame, now_ms: u64) -> Result<DeviceState, StatusError> {
    if frame.action() != ACTION_STATUS_RESPONSE {
        return Err(StatusError::UnexpectedAction(frame.action()));
    }

    let source = frame.source();
    if !is_device_address(source) {
        return Err(StatusError::InvalidSource(source));
    }

    parse_payload(frame.payload(), source, now_ms)
}

/// Decode a status payload reported by the device at `address`
pub fn parse_payload(payload: &[u8], address: u8, now_ms: u64) -> Result<DeviceState, StatusError> {
    if payload.len() < STATUS_PAYLOAD_LENGTH {
        return Err(StatusError::PayloadTooShort(payload.len()));
    }

    let dosing = payload[offset::DOSING_STATUS];
    let ph_doser_type = dosing & DOSING_PH_TYPE_MASK;
    let orp_doser_type = (dosing >> DOSING_ORP_TYPE_SHIFT) & TWO_BITS;
    let ph_status = DosingStatus::from_raw((dosing >> DOSING_PH_STATUS_SHIFT) & TWO_BITS);
    let orp_status = DosingStatus::from_raw((dosing >> DOSING_ORP_STATUS_SHIFT) & TWO_BITS);

    let ph = ChemicalChannel {
        level: be16(payload, offset::PH_LEVEL) as f32 / 100.0,
        setpoint: be16(payload, offset::PH_SETPOINT) as f32 / 100.0,
        dose_time: be16(payload, offset::PH_DOSE_TIME),
        dose_volume: be16(payload, offset::PH_DOSE_VOLUME),
        tank_level: decode_tank_level(payload[offset::PH_TANK_LEVEL]),
        dosing_status: ph_status,
        is_dosing: ph_status == DosingStatus::Dosing && ph_doser_type != 0,
    };

    let orp = ChemicalChannel {
        level: be16(payload, offset::ORP_LEVEL) as f32,
        setpoint: be16(payload, offset::ORP_SETPOINT) as f32,
        dose_time: be16(payload, offset::ORP_DOSE_TIME),
        dose_volume: be16(payload, offset::ORP_DOSE_VOLUME),
        tank_level: decode_tank_level(payload[offset::ORP_TANK_LEVEL]),
        dosing_status: orp_status,
        is_dosing: orp_status == DosingStatus::Dosing && orp_doser_type != 0,
    };

    let alarms = Alarms::from_bits(payload[offset::ALARMS]);

    Ok(DeviceState {
        address,
        ph,
        orp,
        lsi: decode_lsi(payload[offset::LSI]),
        calcium_hardness: be16(payload, offset::CALCIUM),
        cyanuric_acid: payload[offset::CYANURIC_ACID],
        alkalinity: be16(payload, offset::ALKALINITY),
        salt_level: payload[offset::SALT] as u16 * SALT_SCALE,
        temperature: payload[offset::TEMPERATURE],
        firmware: FirmwareVersion {
            major: payload[offset::FIRMWARE_MAJOR],
            minor: payload[offset::FIRMWARE_MINOR],
        },
        alarms,
        warnings: Warnings::from_raw(
            payload[offset::WARNINGS],
            payload[offset::WATER_CHEMISTRY],
        ),
        flow_detected: !alarms.flow,
        comms_lost: payload[offset::STATUS_FLAGS] & STATUS_COMMS_LOST != 0,
        last_update_ms: now_ms,
    })
}

/// Build the status payload that would decode to `state`
///
/// Used to simulate the device on the bench and in tests. Fields that do not
/// survive the wire encoding (sub-step fractions, salt below 50 ppm steps)
/// are rounded; `last_update_ms` is not encoded.
pub fn encode_status_payload(state: &DeviceState) -> [u8; STATUS_PAYLOAD_LENGTH] {
    let mut payload = [0u8; STATUS_PAYLOAD_LENGTH];

    put_be16(&mut payload, offset::PH_LEVEL, scale_hundredths(state.ph.level));
    put_be16(&mut payload, offset::ORP_LEVEL, round_u16(state.orp.level));
    put_be16(&mut payload, offset::PH_SETPOINT, scale_hundredths(state.ph.setpoint));
    put_be16(&mut payload, offset::ORP_SETPOINT, round_u16(state.orp.setpoint));
    put_be16(&mut payload, offset::PH_DOSE_TIME, state.ph.dose_time);
    put_be16(&mut payload, offset::ORP_DOSE_TIME, state.orp.dose_time);
    put_be16(&mut payload, offset::PH_DOSE_VOLUME, state.ph.dose_volume);
    put_be16(&mut payload, offset::ORP_DOSE_VOLUME, state.orp.dose_volume);
    payload[offset::PH_TANK_LEVEL] = encode_tank_level(state.ph.tank_level);
    payload[offset::ORP_TANK_LEVEL] = encode_tank_level(state.orp.tank_level);
    payload[offset::LSI] = encode_lsi(state.lsi);
    put_be16(&mut payload, offset::CALCIUM, state.calcium_hardness);
    payload[offset::CYANURIC_ACID] = state.cyanuric_acid;
    put_be16(&mut payload, offset::ALKALINITY, state.alkalinity);
    payload[offset::SALT] = (state.salt_level / SALT_SCALE).min(u8::MAX as u16) as u8;
    payload[offset::TEMPERATURE] = state.temperature;
    payload[offset::ALARMS] = state.alarms.bits();
    payload[offset::WARNINGS] = state.warnings.bits();
    payload[offset::WATER_CHEMISTRY] = state.warnings.water_chemistry.to_raw();
    payload[offset::FIRMWARE_MAJOR] = state.firmware.major;
    payload[offset::FIRMWARE_MINOR] = state.firmware.minor;

    // A doser type is only recorded for channels that are actively dosing
    let ph_type = u8::from(state.ph.is_dosing);
    let orp_type = u8::from(state.orp.is_dosing);
    payload[offset::DOSING_STATUS] = ph_type
        | (orp_type << DOSING_ORP_TYPE_SHIFT)
        | (state.ph.dosing_status.to_raw() << DOSING_PH_STATUS_SHIFT)
        | (state.orp.dosing_status.to_raw() << DOSING_ORP_STATUS_SHIFT);

    if state.comms_lost {
        payload[offset::STATUS_FLAGS] |= STATUS_COMMS_LOST;
    }

    payload
}

/// Frame a status response from the device at `state.address`
pub fn encode_status_frame(state: &DeviceState) -> Result<Frame, FrameError> {
    Frame::new(
        CONTROLLER_ADDRESS,
        state.address,
        ACTION_STATUS_RESPONSE,
        &encode_status_payload(state),
    )
}

fn be16(payload: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([payload[at], payload[at + 1]])
}

fn put_be16(payload: &mut [u8], at: usize, value: u16) {
    payload[at..at + 2].copy_from_slice(&value.to_be_bytes());
}

/// Protocol value 0 means no tank; 1..=7 map to 0..=6
fn decode_tank_level(raw: u8) -> u8 {
    raw.saturating_sub(1)
}

fn encode_tank_level(level: u8) -> u8 {
    level.min(ChemicalChannel::TANK_LEVEL_MAX) + 1
}

/// High bit carries the sign; the magnitude is `256 - byte`, not two's complement
fn decode_lsi(raw: u8) -> f32 {
    if raw & 0x80 != 0 {
        (256 - raw as u16) as f32 / -100.0
    } else {
        raw as f32 / 100.0
    }
}

fn encode_lsi(lsi: f32) -> u8 {
    if lsi < 0.0 {
        let magnitude = round_u16(-lsi * 100.0).clamp(1, 128);
        (256 - magnitude) as u8
    } else {
        round_u16(lsi * 100.0).min(0x7F) as u8
    }
}

fn scale_hundredths(value: f32) -> u16 {
    round_u16(value * 100.0)
}

/// Round half up; negative values saturate to 0
fn round_u16(value: f32) -> u16 {
    (value + 0.5) as u16
}
