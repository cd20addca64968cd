//! Bridge task engine
//!
//! Sits between the bus task and the supervisory network. States coming off
//! the state queue are handed to a [`StatePublisher`] while the transport is
//! up; operator intents are validated, rate limited and queued for the bus
//! task, whose results come back to be published the same way.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use embassy_sync::blocking_mutex::raw::RawMutex;

use chembridge_protocol::DeviceState;

use crate::bus::CommandResult;
use crate::command::Command;
use crate::config::BridgeConfig;
use crate::intent::{parse_intent, IntentError};
use crate::link::{CommsMonitor, CommsStatus, Connection, ConnectionEvent, ConnectionState};
use crate::shared::CommandQueue;
use crate::traits::{PublishError, StatePublisher};

/// Bridge counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BridgeStats {
    pub states_published: u32,
    pub publish_failures: u32,
    /// States received while the transport was down
    pub states_skipped_offline: u32,
    pub intents_accepted: u32,
    /// Intents refused by parsing, validation, the rate limit or the control switch
    pub intents_rejected: u32,
    /// Valid commands lost to a full command queue
    pub commands_dropped: u32,
    pub reconnections: u32,
    pub results_published: u32,
}

/// What happened to a state handed to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishOutcome {
    Published,
    /// Transport unavailable; nothing was attempted
    SkippedOffline,
    Failed(PublishError),
}

/// Result of handling one fresh state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateReport {
    pub outcome: PublishOutcome,
    /// This state ended a comms-lost period
    pub comms_restored: bool,
}

/// Bridge engine
pub struct Bridge<'a, M: RawMutex, P> {
    publisher: P,
    commands: &'a CommandQueue<M>,
    connection: Connection,
    monitor: CommsMonitor,
    control_enabled: bool,
    command_rate_limit_ms: u64,
    /// When the last setting change was queued
    last_command_ms: Option<u64>,
    stats: BridgeStats,
}

impl<'a, M: RawMutex, P: StatePublisher> Bridge<'a, M, P> {
    pub fn new(
        publisher: P,
        config: &BridgeConfig,
        commands: &'a CommandQueue<M>,
        now_ms: u64,
    ) -> Self {
        Self {
            publisher,
            commands,
            connection: Connection::new(),
            monitor: CommsMonitor::new(config.comms_lost_threshold_ms, now_ms),
            control_enabled: config.control_enabled,
            command_rate_limit_ms: config.command_rate_limit_ms as u64,
            last_command_ms: None,
            stats: BridgeStats::default(),
        }
    }

    /// Forward a state taken off the state queue
    pub fn handle_state(&mut self, state: &DeviceState, now_ms: u64) -> StateReport {
        let comms_restored = self.monitor.state_received(state, now_ms);
        StateReport {
            outcome: self.publish(state),
            comms_restored,
        }
    }

    /// Periodic housekeeping, called after every bounded wait
    ///
    /// Returns the outcome of the comms-lost republish when the device has
    /// just gone quiet.
    pub fn tick(&mut self, now_ms: u64) -> Option<PublishOutcome> {
        let stale = self.monitor.check(now_ms)?;
        Some(self.publish(&stale))
    }

    /// Validate an operator intent and queue the resulting command
    ///
    /// Setting changes closer together than the configured rate limit are
    /// refused. Status requests are never limited.
    pub fn handle_intent(
        &mut self,
        name: &str,
        value: &str,
        now_ms: u64,
    ) -> Result<Command, IntentError> {
        let result = if self.control_enabled {
            parse_intent(name, value).and_then(|command| self.check_rate(command, now_ms))
        } else {
            Err(IntentError::ControlDisabled)
        };

        match result {
            Ok(command) => {
                self.submit(command)?;
                if command.is_config_change() {
                    self.last_command_ms = Some(now_ms);
                }
                Ok(command)
            }
            Err(e) => {
                self.stats.intents_rejected = self.stats.intents_rejected.saturating_add(1);
                Err(e)
            }
        }
    }

    fn check_rate(&self, command: Command, now_ms: u64) -> Result<Command, IntentError> {
        match self.last_command_ms {
            Some(last)
                if command.is_config_change()
                    && now_ms.saturating_sub(last) < self.command_rate_limit_ms =>
            {
                Err(IntentError::RateLimited)
            }
            _ => Ok(command),
        }
    }

    /// Queue an already validated command without waiting
    pub fn submit(&mut self, command: Command) -> Result<(), IntentError> {
        if self.commands.try_send(command).is_err() {
            self.stats.commands_dropped = self.stats.commands_dropped.saturating_add(1);
            return Err(IntentError::QueueFull);
        }
        self.stats.intents_accepted = self.stats.intents_accepted.saturating_add(1);
        Ok(())
    }

    /// Publish what the bus task did with a command
    pub fn handle_command_result(&mut self, result: &CommandResult) -> PublishOutcome {
        if !self.connection.is_available() {
            return PublishOutcome::SkippedOffline;
        }

        match self.publisher.publish_command_result(result) {
            Ok(()) => {
                self.stats.results_published = self.stats.results_published.saturating_add(1);
                PublishOutcome::Published
            }
            Err(e) => {
                self.stats.publish_failures = self.stats.publish_failures.saturating_add(1);
                PublishOutcome::Failed(e)
            }
        }
    }

    /// Apply a transport event, returning the new connection state if it changed
    pub fn handle_connection_event(&mut self, event: ConnectionEvent) -> Option<ConnectionState> {
        let changed = self.connection.handle(event);
        self.stats.reconnections = self.connection.reconnections();
        changed
    }

    fn publish(&mut self, state: &DeviceState) -> PublishOutcome {
        if !self.connection.is_available() {
            self.stats.states_skipped_offline = self.stats.states_skipped_offline.saturating_add(1);
            return PublishOutcome::SkippedOffline;
        }

        match self.publisher.publish_state(state) {
            Ok(()) => {
                self.stats.states_published = self.stats.states_published.saturating_add(1);
                PublishOutcome::Published
            }
            Err(e) => {
                self.stats.publish_failures = self.stats.publish_failures.saturating_add(1);
                PublishOutcome::Failed(e)
            }
        }
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn comms_status(&self) -> CommsStatus {
        self.monitor.status()
    }

    pub fn control_enabled(&self) -> bool {
        self.control_enabled
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }
}
