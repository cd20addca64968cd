//! Chembridge Hardware Abstraction Layer
//!
//! This crate defines the hardware seams the bus engine needs: a half-duplex
//! serial port and the transceiver direction line. Chip-specific crates
//! implement them, and host tests implement them with in-memory mocks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  chembridge-core (bus / bridge engines) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  chembridge-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ chembridge-   │       │  test mocks   │
//! │ hal-rp2040    │       │  (host only)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital output (RS-485 DE/RE line)
//! - [`uart::SerialTx`], [`uart::SerialRx`] - Serial communication

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod uart;

pub use gpio::{DirectionControl, OutputPin};
pub use uart::{wait_until_idle, SerialError, SerialRx, SerialTx, UartConfig};
