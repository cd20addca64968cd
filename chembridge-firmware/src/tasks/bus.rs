//! RS-485 bus task
//!
//! Wakes on a short tick or on a command from the bridge, runs the bus engine
//! and logs whatever it reports. Command results are passed back to the
//! bridge for publication.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Instant, Timer};

use chembridge_core::bus::Transmission;
use chembridge_core::{
    BridgeConfig, BusError, BusTask, CommandOutcome, CommandResult, ServiceReport,
};
use chembridge_hal::DirectionControl;
use chembridge_hal_rp2040::{DriverEnable, Rs485Rx, Rs485Tx};

use crate::channels::{COMMAND_QUEUE, LAST_STATE, RESULT_QUEUE, STATE_QUEUE};

/// Bus engine bound to the RP2040 UART
pub type Rs485Bus =
    BusTask<'static, CriticalSectionRawMutex, Rs485Tx, Rs485Rx, DriverEnable, Delay>;

/// Service tick when no command is pending
const SERVICE_TICK_MS: u64 = 10;

/// Interval between statistics dumps
const DIAGNOSTICS_INTERVAL_MS: u64 = 60_000;

/// Assemble the bus engine from the split UART and the DE pin
pub fn build_bus(
    tx: BufferedUartTx,
    rx: BufferedUartRx,
    de: DriverEnable,
    config: &BridgeConfig,
) -> Rs485Bus {
    BusTask::new(
        Rs485Tx::new(tx),
        Rs485Rx::new(rx),
        DirectionControl::new(de),
        Delay,
        config,
        &STATE_QUEUE,
        &LAST_STATE,
    )
}

/// Bus task
///
/// Never blocks on the line longer than one transmit sequence, so commands
/// from the bridge are picked up within a tick.
#[embassy_executor::task]
pub async fn bus_task(mut bus: Rs485Bus) {
    info!("Bus task started");

    let mut next_diagnostics = DIAGNOSTICS_INTERVAL_MS;

    loop {
        match select(
            COMMAND_QUEUE.receive(),
            Timer::after_millis(SERVICE_TICK_MS),
        )
        .await
        {
            Either::First(command) => {
                let result = bus.execute(command, now_ms());
                log_command(&result);
                if RESULT_QUEUE.try_send(result).is_err() {
                    warn!("Result queue full, {:?} result not published", result.command);
                }
            }
            Either::Second(()) => {}
        }

        let now = now_ms();
        let report = bus.service(now);
        if !report.is_quiet() {
            log_service(&report);
        }

        if now >= next_diagnostics {
            next_diagnostics = now + DIAGNOSTICS_INTERVAL_MS;
            log_diagnostics(&bus);
        }
    }
}

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

fn log_command(result: &CommandResult) {
    let command = result.command;
    match result.result {
        Ok(CommandOutcome::StatusRequested(sent)) => {
            debug!("Status requested ({} bytes)", sent.bytes);
            warn_incomplete(sent);
        }
        Ok(CommandOutcome::ConfigSent(settings, sent)) => {
            info!(
                "Config sent: pH={} ORP={} tanks={}/{} CH={} CYA={} TA={}",
                settings.ph_setpoint,
                settings.orp_setpoint,
                settings.ph_tank_level,
                settings.orp_tank_level,
                settings.calcium_hardness,
                settings.cyanuric_acid,
                settings.alkalinity
            );
            warn_incomplete(sent);
        }
        Err(BusError::Rejected(e)) => {
            warn!("Command {:?} rejected: {} out of range", command, e.field());
        }
        Err(e) => {
            error!("Command {:?} failed: {:?}", command, e);
        }
    }
}

fn warn_incomplete(sent: Transmission) {
    if !sent.completed {
        warn!("Transmit did not complete in time, line released");
    }
}

fn log_service(report: &ServiceReport) {
    if let Some(e) = report.serial_error {
        warn!("Receive fault {:?}, input flushed", e);
    }

    if let Some(state) = &report.state {
        debug!(
            "Status: pH={} ORP={} temp={} ({} parsed)",
            state.ph.level, state.orp.level, state.temperature, report.states_parsed
        );
    }

    if report.states_dropped > 0 {
        warn!("State queue full, dropped {} old state(s)", report.states_dropped);
    }

    if let Some(e) = report.parse_error {
        warn!("Bad status response: {:?}", e);
    }

    if report.frames_ignored > 0 {
        trace!("Ignored {} frame(s) from other traffic", report.frames_ignored);
    }

    if report.response_timeout {
        warn!("No response to status request");
    }

    match report.poll {
        Some(Ok(sent)) => {
            trace!("Poll sent ({} bytes)", sent.bytes);
            warn_incomplete(sent);
        }
        Some(Err(e)) => error!("Poll failed: {:?}", e),
        None => {}
    }
}

fn log_diagnostics(bus: &Rs485Bus) {
    let stats = bus.stats();
    let buffer = bus.buffer().stats();
    info!(
        "Bus: polls={} cmds={} rx={} timeouts={} parse_fail={} hw_err={} tx_err={} dropped={} rejected={}",
        stats.polls_sent,
        stats.commands_sent,
        stats.responses_received,
        stats.response_timeouts,
        stats.parse_failures,
        stats.hardware_errors,
        stats.tx_errors,
        stats.states_dropped,
        stats.commands_rejected
    );
    info!(
        "Buffer: packets={} bytes={} bad_checksum={} overflows={} resyncs={} phase={:?}",
        buffer.packets_received,
        buffer.bytes_received,
        buffer.invalid_checksums,
        buffer.overflows,
        buffer.resyncs,
        bus.phase()
    );
}
