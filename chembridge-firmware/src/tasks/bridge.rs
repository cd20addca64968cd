//! Bridge task
//!
//! Publishes parsed states and command results, turns operator intents into
//! commands for the bus and flags the device as lost when it goes quiet.

use defmt::*;
use embassy_futures::select::{select, select4, Either, Either4};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Instant, Timer};

use chembridge_core::link::ConnectionEvent;
use chembridge_core::{Bridge, OperatorIntent, PublishOutcome, StateReport};

use crate::channels::{
    CONNECTION_EVENTS, INTENT_CHANNEL, LAST_STATE, RESULT_QUEUE, STATE_QUEUE,
};
use crate::publisher::LogPublisher;

/// Bridge engine publishing to the log
pub type LogBridge = Bridge<'static, CriticalSectionRawMutex, LogPublisher>;

/// Interval between statistics dumps
const DIAGNOSTICS_INTERVAL_MS: u64 = 60_000;

/// Bridge task
///
/// Each wait is bounded by `state_wait_ms` so the comms-lost check runs even
/// when nothing arrives.
#[embassy_executor::task]
pub async fn bridge_task(mut bridge: LogBridge, state_wait_ms: u32) {
    info!(
        "Bridge task started (control {})",
        if bridge.control_enabled() { "enabled" } else { "disabled" }
    );

    let mut next_diagnostics = DIAGNOSTICS_INTERVAL_MS;

    loop {
        match select4(
            STATE_QUEUE.receive(),
            INTENT_CHANNEL.receive(),
            select(CONNECTION_EVENTS.receive(), RESULT_QUEUE.receive()),
            Timer::after_millis(state_wait_ms as u64),
        )
        .await
        {
            Either4::First(state) => {
                let report = bridge.handle_state(&state, now_ms());
                log_state_report(report);
            }
            Either4::Second(intent) => handle_intent(&mut bridge, &intent),
            Either4::Third(Either::First(event)) => handle_connection_event(&mut bridge, event),
            Either4::Third(Either::Second(result)) => {
                log_publish(bridge.handle_command_result(&result));
            }
            Either4::Fourth(()) => {}
        }

        let now = now_ms();
        if let Some(outcome) = bridge.tick(now) {
            warn!("Device silent, republished last state as comms lost");
            log_publish(outcome);
        }

        if now >= next_diagnostics {
            next_diagnostics = now + DIAGNOSTICS_INTERVAL_MS;
            log_diagnostics(&bridge);
        }
    }
}

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

fn handle_intent(bridge: &mut LogBridge, intent: &OperatorIntent) {
    match bridge.handle_intent(&intent.name, &intent.value, now_ms()) {
        Ok(command) => info!("Intent {}={} queued as {:?}", intent.name, intent.value, command),
        Err(e) => warn!("Intent {}={} rejected: {:?}", intent.name, intent.value, e),
    }
}

fn handle_connection_event(bridge: &mut LogBridge, event: ConnectionEvent) {
    if let Some(state) = bridge.handle_connection_event(event) {
        info!("Connection: {:?} -> {:?}", event, state);
    }
}

fn log_state_report(report: StateReport) {
    if report.comms_restored {
        info!("Device responding again");
    }
    log_publish(report.outcome);
}

fn log_publish(outcome: PublishOutcome) {
    match outcome {
        PublishOutcome::Published => {}
        PublishOutcome::SkippedOffline => debug!("Transport offline, state not published"),
        PublishOutcome::Failed(e) => warn!("Publish failed: {:?}", e),
    }
}

fn log_diagnostics(bridge: &LogBridge) {
    let stats = bridge.stats();
    info!(
        "Bridge: published={} results={} skipped={} failed={} reconnects={} accepted={} rejected={} dropped={} link={:?} comms={:?}",
        stats.states_published,
        stats.results_published,
        stats.states_skipped_offline,
        stats.publish_failures,
        stats.reconnections,
        stats.intents_accepted,
        stats.intents_rejected,
        stats.commands_dropped,
        bridge.connection_state(),
        bridge.comms_status()
    );

    match LAST_STATE.load() {
        Some(state) => info!(
            "Last state: pH={} ORP={}mV temp={}F stale={}",
            state.ph.level,
            state.orp.level,
            state.temperature,
            state.comms_lost
        ),
        None => info!("Last state: none received yet"),
    }
}
