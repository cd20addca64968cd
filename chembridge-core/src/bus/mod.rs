//! RS-485 bus engine
//!
//! [`BusTask`] owns the serial port, the direction line and the packet
//! buffer. It is synchronous: the firmware task calls [`BusTask::service`]
//! on a short tick and [`BusTask::execute`] for every command it receives,
//! then logs the returned reports. Command results go back to the bridge.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod transceiver;

pub use transceiver::{BusTask, TX_DONE_TIMEOUT_MS, TX_SETTLE_MS};

use chembridge_hal::SerialError;

use crate::command::Command;
use chembridge_protocol::{
    ConfigCommandError, DeviceState, FrameError, Settings, SettingsError, StatusError,
};

/// Bus transaction phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusPhase {
    /// Nothing outstanding
    #[default]
    Idle,
    /// A frame is about to go out
    TransmitPending,
    /// Status request sent, waiting for the response
    AwaitingResponse,
}

/// Bus errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Serial port failure
    Serial(SerialError),
    /// Frame could not be built
    Frame(FrameError),
    /// Command rejected before transmission
    Rejected(SettingsError),
}

impl From<SerialError> for BusError {
    fn from(e: SerialError) -> Self {
        BusError::Serial(e)
    }
}

impl From<FrameError> for BusError {
    fn from(e: FrameError) -> Self {
        BusError::Frame(e)
    }
}

impl From<SettingsError> for BusError {
    fn from(e: SettingsError) -> Self {
        BusError::Rejected(e)
    }
}

impl From<ConfigCommandError> for BusError {
    fn from(e: ConfigCommandError) -> Self {
        match e {
            ConfigCommandError::Settings(e) => BusError::Rejected(e),
            ConfigCommandError::Frame(e) => BusError::Frame(e),
        }
    }
}

/// Bus counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusStats {
    /// Status requests transmitted
    pub polls_sent: u32,
    /// Configuration commands transmitted
    pub commands_sent: u32,
    /// Status responses parsed
    pub responses_received: u32,
    /// Status responses that failed to decode
    pub parse_failures: u32,
    /// Receive faults (overrun, framing, parity, buffer full)
    pub hardware_errors: u32,
    /// Failed writes and transmit-complete timeouts
    pub tx_errors: u32,
    /// States discarded because the bridge fell behind
    pub states_dropped: u32,
    /// Polls that got no response in time
    pub response_timeouts: u32,
    /// Commands refused by validation
    pub commands_rejected: u32,
}

/// One frame put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transmission {
    pub bytes: usize,
    /// False if the transmit-complete wait timed out; the line was released anyway
    pub completed: bool,
}

/// Result of a successfully handled command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandOutcome {
    /// Out-of-schedule status request sent
    StatusRequested(Transmission),
    /// Configuration command sent with these settings
    ConfigSent(Settings, Transmission),
}

/// A command paired with what became of it
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandResult {
    pub command: Command,
    pub result: Result<CommandOutcome, BusError>,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// What a single service call did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceReport {
    /// Bytes drained from the serial port
    pub bytes_received: usize,
    /// Receive fault; input was flushed and the buffer cleared
    pub serial_error: Option<SerialError>,
    /// Most recent state parsed during this call
    pub state: Option<DeviceState>,
    /// States parsed during this call
    pub states_parsed: u8,
    /// Older states discarded from the full state queue
    pub states_dropped: u8,
    /// Last decode failure seen during this call
    pub parse_error: Option<StatusError>,
    /// Valid frames that were not a status response from our device
    pub frames_ignored: u8,
    /// The outstanding poll timed out
    pub response_timeout: bool,
    /// Scheduled poll sent during this call
    pub poll: Option<Result<Transmission, BusError>>,
}

impl ServiceReport {
    /// Whether anything happened worth logging
    pub fn is_quiet(&self) -> bool {
        self.bytes_received == 0
            && self.serial_error.is_none()
            && self.state.is_none()
            && self.parse_error.is_none()
            && self.frames_ignored == 0
            && !self.response_timeout
            && self.poll.is_none()
    }
}
