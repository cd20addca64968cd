//! Inter-task communication channels
//!
//! The three queues and the last-known-state cell are the only state shared
//! by the bus and bridge tasks. Intents and connection events are the bridge's
//! inputs from the network side.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use chembridge_core::link::ConnectionEvent;
use chembridge_core::{CommandQueue, LastState, OperatorIntent, ResultQueue, StateQueue};

/// Channel capacity for operator intents
const INTENT_CHANNEL_SIZE: usize = 4;

/// Channel capacity for transport connection events
const CONNECTION_CHANNEL_SIZE: usize = 4;

/// Parsed device states (bus task to bridge task)
pub static STATE_QUEUE: StateQueue<CriticalSectionRawMutex> = Channel::new();

/// Validated commands (bridge task to bus task)
pub static COMMAND_QUEUE: CommandQueue<CriticalSectionRawMutex> = Channel::new();

/// Executed commands and their outcome (bus task to bridge task)
pub static RESULT_QUEUE: ResultQueue<CriticalSectionRawMutex> = Channel::new();

/// Most recently parsed device state
pub static LAST_STATE: LastState<CriticalSectionRawMutex> = LastState::new();

/// Operator intents from the supervisory network
pub static INTENT_CHANNEL: Channel<CriticalSectionRawMutex, OperatorIntent, INTENT_CHANNEL_SIZE> =
    Channel::new();

/// Transport connectivity changes
pub static CONNECTION_EVENTS: Channel<
    CriticalSectionRawMutex,
    ConnectionEvent,
    CONNECTION_CHANNEL_SIZE,
> = Channel::new();
