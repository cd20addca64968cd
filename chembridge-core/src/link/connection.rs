//! Supervisory network connection state machine
//!
//! Transport code reports what happened as [`ConnectionEvent`]s; the bridge
//! folds them through [`ConnectionState::transition`] and only forwards
//! states while the broker session is up.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionState {
    /// No network link
    #[default]
    Disconnected,
    /// Network association in progress
    NetworkConnecting,
    /// Network up, broker not yet contacted
    NetworkConnected,
    /// Broker session being established
    BrokerConnecting,
    /// Ready to publish
    BrokerConnected,
    /// Transport failure; waits for a retry
    Error,
}

/// Events reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionEvent {
    /// Network association started
    NetworkStart,
    /// Network link up (address acquired)
    NetworkUp,
    /// Network link lost
    NetworkDown,
    /// Broker connection attempt started
    BrokerStart,
    /// Broker session established
    BrokerUp,
    /// Broker session closed
    BrokerDown,
    /// Unrecoverable transport error
    Failure,
    /// Retry after an error
    Retry,
}

impl ConnectionState {
    /// Whether states can be published right now
    pub fn is_available(&self) -> bool {
        matches!(self, ConnectionState::BrokerConnected)
    }

    /// Whether the network link itself is up
    pub fn network_up(&self) -> bool {
        matches!(
            self,
            ConnectionState::NetworkConnected
                | ConnectionState::BrokerConnecting
                | ConnectionState::BrokerConnected
        )
    }

    /// Process an event and return the next state
    pub fn transition(self, event: ConnectionEvent) -> Self {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self, event) {
            // Losing the network drops everything above it
            (_, NetworkDown) => Disconnected,
            (_, Failure) => Error,

            (Disconnected, NetworkStart) => NetworkConnecting,
            (Disconnected, NetworkUp) => NetworkConnected,
            (NetworkConnecting, NetworkUp) => NetworkConnected,

            (NetworkConnected, BrokerStart) => BrokerConnecting,
            (NetworkConnected, BrokerUp) => BrokerConnected,
            (BrokerConnecting, BrokerUp) => BrokerConnected,
            (BrokerConnecting, BrokerDown) => NetworkConnected,
            (BrokerConnected, BrokerDown) => NetworkConnected,

            (Error, Retry) => Disconnected,

            // Default: stay in current state
            _ => self,
        }
    }
}

/// Connection state plus reconnect bookkeeping
#[derive(Debug, Clone, Copy, Default)]
pub struct Connection {
    state: ConnectionState,
    /// Broker sessions established after the first
    reconnections: u32,
    ever_connected: bool,
}

impl Connection {
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnections: 0,
            ever_connected: false,
        }
    }

    /// Apply an event, returning the new state if it changed
    pub fn handle(&mut self, event: ConnectionEvent) -> Option<ConnectionState> {
        let next = self.state.transition(event);
        if next == self.state {
            return None;
        }

        if next == ConnectionState::BrokerConnected {
            if self.ever_connected {
                self.reconnections = self.reconnections.saturating_add(1);
            }
            self.ever_connected = true;
        }

        self.state = next;
        Some(next)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_available(&self) -> bool {
        self.state.is_available()
    }

    pub fn reconnections(&self) -> u32 {
        self.reconnections
    }
}
