//! RP2040-specific HAL for the chembridge bridge
//!
//! Implements the shared `chembridge-hal` traits over embassy-rp:
//!
//! - Buffered UART halves as [`SerialTx`](chembridge_hal::SerialTx) and
//!   [`SerialRx`](chembridge_hal::SerialRx)
//! - A GPIO output as the transceiver driver-enable line

#![no_std]

pub mod gpio;
pub mod serial;

pub use gpio::DriverEnable;
pub use serial::{uart_config, Rs485Rx, Rs485Tx};
