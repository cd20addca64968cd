//! Embassy async tasks
//!
//! The bus task owns the serial port; the bridge task owns the publisher.
//! They only meet through the queues in `channels`.

pub mod bridge;
pub mod bus;

pub use bridge::bridge_task;
pub use bus::bus_task;
