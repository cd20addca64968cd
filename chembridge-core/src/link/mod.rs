//! Supervisory link health
//!
//! Connection state toward the network and communication health toward the
//! device.

pub mod connection;
pub mod monitor;

pub use connection::{Connection, ConnectionEvent, ConnectionState};
pub use monitor::{CommsMonitor, CommsStatus, DEFAULT_COMMS_LOST_THRESHOLD_MS};
