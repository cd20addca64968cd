//! Mock bus hardware shared by the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal::delay::DelayNs;

use chembridge_core::{BridgeConfig, BusTask, LastState, StateQueue};
use chembridge_hal::{DirectionControl, OutputPin, SerialError, SerialRx, SerialTx};
use chembridge_protocol::{encode_status_frame, DeviceState};

/// Everything the mocks see and do
#[derive(Default)]
pub struct Wire {
    /// Frames written, one entry per write
    pub sent: Vec<Vec<u8>>,
    /// Bytes waiting to be read
    pub incoming: VecDeque<u8>,
    /// Errors returned by the next reads, ahead of any data
    pub rx_errors: VecDeque<SerialError>,
    pub flushes: u32,
    pub fail_write: bool,
    pub stall_tx_done: bool,
    /// Driver-enable level
    pub de_high: bool,
    /// Driver-enable level seen by each write
    pub de_during_writes: Vec<bool>,
    pub delay_ns: u64,
}

pub type SharedWire = Rc<RefCell<Wire>>;

pub struct MockTx(pub SharedWire);

impl SerialTx for MockTx {
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), SerialError> {
        let mut wire = self.0.borrow_mut();
        let de = wire.de_high;
        wire.de_during_writes.push(de);
        if wire.fail_write {
            return Err(SerialError::Write);
        }
        wire.sent.push(data.to_vec());
        Ok(())
    }

    fn wait_tx_done(&mut self, _timeout_ms: u32) -> Result<(), SerialError> {
        if self.0.borrow().stall_tx_done {
            Err(SerialError::Timeout)
        } else {
            Ok(())
        }
    }
}

pub struct MockRx(pub SharedWire);

impl SerialRx for MockRx {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let mut wire = self.0.borrow_mut();
        if let Some(e) = wire.rx_errors.pop_front() {
            return Err(e);
        }
        let n = buf.len().min(wire.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(wire.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn flush_input(&mut self) {
        let mut wire = self.0.borrow_mut();
        wire.incoming.clear();
        wire.flushes += 1;
    }
}

pub struct MockPin(pub SharedWire);

impl OutputPin for MockPin {
    fn set_high(&mut self) {
        self.0.borrow_mut().de_high = true;
    }

    fn set_low(&mut self) {
        self.0.borrow_mut().de_high = false;
    }

    fn is_set_high(&self) -> bool {
        self.0.borrow().de_high
    }
}

pub struct MockDelay(pub SharedWire);

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().delay_ns += ns as u64;
    }
}

pub type TestBus<'a> = BusTask<'a, NoopRawMutex, MockTx, MockRx, MockPin, MockDelay>;

pub fn new_bus<'a>(
    wire: &SharedWire,
    config: &BridgeConfig,
    states: &'a StateQueue<NoopRawMutex>,
    last_state: &'a LastState<NoopRawMutex>,
) -> TestBus<'a> {
    BusTask::new(
        MockTx(wire.clone()),
        MockRx(wire.clone()),
        DirectionControl::new(MockPin(wire.clone())),
        MockDelay(wire.clone()),
        config,
        states,
        last_state,
    )
}

/// A device report with settings inside every accepted range
pub fn sample_state() -> DeviceState {
    let mut state = DeviceState::default();
    state.ph.level = 7.4;
    state.ph.setpoint = 7.3;
    state.ph.tank_level = 5;
    state.orp.level = 700.0;
    state.orp.setpoint = 720.0;
    state.orp.tank_level = 4;
    state.calcium_hardness = 350;
    state.cyanuric_acid = 40;
    state.alkalinity = 90;
    state.temperature = 82;
    state
}

/// Queue a status response from the device for the next read
pub fn respond(wire: &SharedWire, state: &DeviceState) {
    let frame = encode_status_frame(state).unwrap();
    wire.borrow_mut().incoming.extend(frame.as_bytes().iter().copied());
}
