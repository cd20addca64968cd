//! Pentair IntelliChem RS-485 protocol
//!
//! This crate implements the wire protocol spoken by the IntelliChem
//! pool-chemistry controller on its RS-485 bus. The bridge acts as the bus
//! controller: it polls the device for status and sends configuration
//! commands.
//!
//! # Protocol Overview
//!
//! All messages use the same binary frame format:
//! ```text
//! ┌──────────┬───────┬─────┬──────┬─────┬────────┬─────┬─────────┬──────────┐
//! │ PREAMBLE │ START │ SUB │ DEST │ SRC │ ACTION │ LEN │ PAYLOAD │ CHECKSUM │
//! │ FF 00 FF │ A5    │ 00  │ 1B   │ 1B  │ 1B     │ 1B  │ 0–53B   │ 2B (BE)  │
//! └──────────┴───────┴─────┴──────┴─────┴────────┴─────┴─────────┴──────────┘
//! ```
//!
//! The checksum is the 16-bit wrapping sum of the header and payload bytes;
//! the preamble is not included.
//!
//! # Layers
//!
//! - [`frame`]: stateless build/validate/extract functions over byte slices
//! - [`buffer`]: resynchronizing accumulator turning a noisy byte stream into frames
//! - [`state`]: the decoded device snapshot
//! - [`status`]: status-response payload decoding
//! - [`settings`]: validated settings and the config-command payload

#![no_std]
#![deny(unsafe_code)]

pub mod buffer;
pub mod frame;
pub mod settings;
pub mod state;
pub mod status;

pub use buffer::{BufferStats, PacketBuffer, PACKET_BUFFER_CAPACITY};
pub use frame::{
    Frame, FrameError, ACTION_CONFIG_COMMAND, ACTION_STATUS_REQUEST, ACTION_STATUS_RESPONSE,
    CONTROLLER_ADDRESS, DEFAULT_DEVICE_ADDRESS, DEVICE_ADDRESS_MAX, DEVICE_ADDRESS_MIN,
    MAX_FRAME_SIZE, MIN_FRAME_SIZE,
};
pub use settings::{ConfigCommandError, Settings, SettingsError, CONFIG_PAYLOAD_LENGTH};
pub use state::{
    Alarms, ChemicalChannel, DeviceState, DosingStatus, FirmwareVersion, Warnings, WaterChemistry,
};
pub use status::{
    encode_status_frame, encode_status_payload, parse_payload, parse_status, StatusError,
    STATUS_PAYLOAD_LENGTH,
};
