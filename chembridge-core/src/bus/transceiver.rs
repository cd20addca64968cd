//! Bus transaction engine

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::TrySendError;
use embedded_hal::delay::DelayNs;

use chembridge_hal::{DirectionControl, OutputPin, SerialRx, SerialTx};
use chembridge_protocol::{
    parse_status, DeviceState, Frame, PacketBuffer, Settings, ACTION_STATUS_RESPONSE,
};

use super::{
    BusError, BusPhase, BusStats, CommandOutcome, CommandResult, ServiceReport, Transmission,
};
use crate::command::Command;
use crate::config::BridgeConfig;
use crate::shared::{LastState, StateQueue};

/// Transceiver switch-over time on either side of a transmission
pub const TX_SETTLE_MS: u32 = 1;

/// Upper bound on waiting for the last byte to leave the UART
pub const TX_DONE_TIMEOUT_MS: u32 = 100;

/// Bytes drained from the serial port per read
const RX_CHUNK: usize = 64;

/// Bus task engine
///
/// Drives one IntelliChem on a half-duplex RS-485 line: periodic status
/// polls, configuration writes, and decoding of everything heard in between.
pub struct BusTask<'a, M, TX, RX, P, D>
where
    M: RawMutex,
{
    tx: TX,
    rx: RX,
    direction: DirectionControl<P>,
    delay: D,
    device_address: u8,
    poll_interval_ms: u64,
    response_timeout_ms: u64,
    states: &'a StateQueue<M>,
    last_state: &'a LastState<M>,
    buffer: PacketBuffer,
    /// Settings a partial command is merged onto
    settings: Settings,
    phase: BusPhase,
    /// `None` until the first poll
    next_poll_ms: Option<u64>,
    poll_sent_ms: u64,
    stats: BusStats,
}

impl<'a, M, TX, RX, P, D> BusTask<'a, M, TX, RX, P, D>
where
    M: RawMutex,
    TX: SerialTx,
    RX: SerialRx,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(
        tx: TX,
        rx: RX,
        direction: DirectionControl<P>,
        delay: D,
        config: &BridgeConfig,
        states: &'a StateQueue<M>,
        last_state: &'a LastState<M>,
    ) -> Self {
        Self {
            tx,
            rx,
            direction,
            delay,
            device_address: config.device_address,
            poll_interval_ms: config.poll_interval_ms(),
            response_timeout_ms: config.response_timeout_ms as u64,
            states,
            last_state,
            buffer: PacketBuffer::new(),
            settings: Settings::default(),
            phase: BusPhase::Idle,
            next_poll_ms: None,
            poll_sent_ms: 0,
            stats: BusStats::default(),
        }
    }

    /// Run one pass: drain input, decode, check the response timeout, poll if due
    ///
    /// Never waits for the bus beyond the bounded transmit sequence.
    pub fn service(&mut self, now_ms: u64) -> ServiceReport {
        let mut report = ServiceReport::default();

        self.receive(&mut report);
        self.decode(now_ms, &mut report);

        if self.phase == BusPhase::AwaitingResponse
            && now_ms.saturating_sub(self.poll_sent_ms) >= self.response_timeout_ms
        {
            self.phase = BusPhase::Idle;
            self.stats.response_timeouts = self.stats.response_timeouts.saturating_add(1);
            report.response_timeout = true;
        }

        if self.next_poll_ms.map_or(true, |due| now_ms >= due) {
            self.next_poll_ms = Some(now_ms + self.poll_interval_ms);
            report.poll = Some(self.send_status_request(now_ms));
        }

        report
    }

    /// Execute a command taken from the command queue
    ///
    /// Configuration commands are merged onto the staged settings, validated
    /// as a whole and transmitted at once. `RequestStatusNow` polls without
    /// moving the regular poll schedule.
    pub fn handle_command(
        &mut self,
        command: Command,
        now_ms: u64,
    ) -> Result<CommandOutcome, BusError> {
        if !command.is_config_change() {
            let sent = self.send_status_request(now_ms)?;
            return Ok(CommandOutcome::StatusRequested(sent));
        }

        let next = match command.apply(&self.settings) {
            Ok(next) => next,
            Err(e) => {
                self.stats.commands_rejected = self.stats.commands_rejected.saturating_add(1);
                return Err(e.into());
            }
        };
        let frame = next.to_frame(self.device_address)?;

        let sent = self.transmit(&frame)?;
        self.settings = next;
        self.stats.commands_sent = self.stats.commands_sent.saturating_add(1);
        Ok(CommandOutcome::ConfigSent(next, sent))
    }

    /// [`handle_command`](Self::handle_command), keeping the command with its result
    pub fn execute(&mut self, command: Command, now_ms: u64) -> CommandResult {
        CommandResult {
            command,
            result: self.handle_command(command, now_ms),
        }
    }

    fn send_status_request(&mut self, now_ms: u64) -> Result<Transmission, BusError> {
        let frame = Frame::status_request(self.device_address);
        let sent = self.transmit(&frame)?;

        self.stats.polls_sent = self.stats.polls_sent.saturating_add(1);
        self.phase = BusPhase::AwaitingResponse;
        self.poll_sent_ms = now_ms;
        Ok(sent)
    }

    /// Put one frame on the wire
    ///
    /// The direction line is always released, whatever the outcome.
    fn transmit(&mut self, frame: &Frame) -> Result<Transmission, BusError> {
        let resume = self.phase;
        self.phase = BusPhase::TransmitPending;

        self.direction.drive();
        self.delay.delay_ms(TX_SETTLE_MS);

        let written = self.tx.write_blocking(frame.as_bytes());
        let completed = match written {
            Ok(()) => self.tx.wait_tx_done(TX_DONE_TIMEOUT_MS).is_ok(),
            Err(_) => false,
        };

        self.delay.delay_ms(TX_SETTLE_MS);
        self.direction.release();

        self.phase = resume;

        if let Err(e) = written {
            self.stats.tx_errors = self.stats.tx_errors.saturating_add(1);
            return Err(BusError::Serial(e));
        }
        if !completed {
            self.stats.tx_errors = self.stats.tx_errors.saturating_add(1);
        }

        Ok(Transmission {
            bytes: frame.len(),
            completed,
        })
    }

    fn receive(&mut self, report: &mut ServiceReport) {
        let mut chunk = [0u8; RX_CHUNK];
        loop {
            match self.rx.read_available(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    self.buffer.push(&chunk[..n]);
                    report.bytes_received += n;
                }
                Err(e) => {
                    if e.is_receive_fault() {
                        self.rx.flush_input();
                        self.buffer.clear();
                    }
                    self.stats.hardware_errors = self.stats.hardware_errors.saturating_add(1);
                    report.serial_error = Some(e);
                    break;
                }
            }
        }
    }

    fn decode(&mut self, now_ms: u64, report: &mut ServiceReport) {
        while let Some(frame) = self.buffer.next_frame() {
            if frame.action() != ACTION_STATUS_RESPONSE || frame.source() != self.device_address {
                report.frames_ignored = report.frames_ignored.saturating_add(1);
                continue;
            }

            match parse_status(&frame, now_ms) {
                Ok(state) => {
                    self.stats.responses_received =
                        self.stats.responses_received.saturating_add(1);
                    if self.phase == BusPhase::AwaitingResponse {
                        self.phase = BusPhase::Idle;
                    }

                    self.last_state.store(state);
                    self.settings = Settings::from_state(&state);
                    if self.deliver(state) {
                        report.states_dropped = report.states_dropped.saturating_add(1);
                    }

                    report.states_parsed = report.states_parsed.saturating_add(1);
                    report.state = Some(state);
                }
                Err(e) => {
                    self.stats.parse_failures = self.stats.parse_failures.saturating_add(1);
                    report.parse_error = Some(e);
                }
            }
        }
    }

    /// Push a state without waiting; the oldest queued state makes room
    ///
    /// Returns true if a state was discarded.
    fn deliver(&mut self, state: DeviceState) -> bool {
        let Err(TrySendError::Full(state)) = self.states.try_send(state) else {
            return false;
        };

        let _ = self.states.try_receive();
        self.stats.states_dropped = self.stats.states_dropped.saturating_add(1);
        if self.states.try_send(state).is_err() {
            self.stats.states_dropped = self.stats.states_dropped.saturating_add(1);
        }
        true
    }

    pub fn stats(&self) -> &BusStats {
        &self.stats
    }

    pub fn buffer(&self) -> &PacketBuffer {
        &self.buffer
    }

    pub fn phase(&self) -> BusPhase {
        self.phase
    }

    /// Settings the next command will be merged onto
    pub fn staged_settings(&self) -> &Settings {
        &self.settings
    }

    /// Time the next scheduled poll is due, if one has been scheduled
    pub fn next_poll_ms(&self) -> Option<u64> {
        self.next_poll_ms
    }
}
