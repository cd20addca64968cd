//! Board-agnostic logic for the IntelliChem RS-485 bridge
//!
//! This crate contains everything between the serial port and the
//! supervisory network that does not depend on a specific board:
//!
//! - Bus engine: polling, configuration writes, response decoding
//! - Bridge engine: publication, operator intents, comms-lost detection
//! - Connection state machine for the upstream transport
//! - Commands and operator intent parsing
//! - Queues and the last-known-state cell shared by the two tasks
//! - Configuration types and the `bridge.toml` parser
//!
//! Nothing here logs. Every engine call returns a report describing what
//! happened; the firmware decides what to log.

#![no_std]
#![deny(unsafe_code)]

pub mod bridge;
pub mod bus;
pub mod command;
pub mod config;
pub mod intent;
pub mod link;
pub mod shared;
pub mod traits;

pub use bridge::{Bridge, BridgeStats, PublishOutcome, StateReport};
pub use bus::{
    BusError, BusPhase, BusStats, BusTask, CommandOutcome, CommandResult, ServiceReport,
};
pub use command::Command;
pub use config::{BridgeConfig, ConfigError};
pub use intent::{parse_intent, IntentError, OperatorIntent};
pub use shared::{CommandQueue, LastState, ResultQueue, StateQueue};
pub use traits::{PublishError, StatePublisher};
