//! State shared between the bus and bridge tasks
//!
//! Four things cross the task boundary: the state queue and the result queue
//! (bus to bridge), the command queue (bridge to bus) and the last known
//! state. All are generic over the raw mutex so the firmware can place them in statics
//! with `CriticalSectionRawMutex` while host tests use `NoopRawMutex`.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;

use chembridge_protocol::DeviceState;

use crate::bus::CommandResult;
use crate::command::Command;

/// State queue depth; only the latest state matters
pub const STATE_QUEUE_DEPTH: usize = 2;

/// Command queue depth
pub const COMMAND_QUEUE_DEPTH: usize = 4;

/// Result queue depth
pub const RESULT_QUEUE_DEPTH: usize = 4;

/// Parsed device states, bus task to bridge task
pub type StateQueue<M> = Channel<M, DeviceState, STATE_QUEUE_DEPTH>;

/// Validated commands, bridge task to bus task
pub type CommandQueue<M> = Channel<M, Command, COMMAND_QUEUE_DEPTH>;

/// Executed commands, bus task to bridge task
pub type ResultQueue<M> = Channel<M, CommandResult, RESULT_QUEUE_DEPTH>;

/// Most recently parsed device state
///
/// The lock is held only long enough to copy the value in or out.
pub struct LastState<M: RawMutex> {
    inner: Mutex<M, Cell<Option<DeviceState>>>,
}

impl<M: RawMutex> LastState<M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(None)),
        }
    }

    pub fn store(&self, state: DeviceState) {
        self.inner.lock(|cell| cell.set(Some(state)));
    }

    pub fn load(&self) -> Option<DeviceState> {
        self.inner.lock(|cell| cell.get())
    }
}

impl<M: RawMutex> Default for LastState<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn test_last_state_copy_in_out() {
        let last: LastState<NoopRawMutex> = LastState::new();
        assert_eq!(last.load(), None);

        let mut state = DeviceState::default();
        state.temperature = 84;
        last.store(state);

        let mut copy = last.load().unwrap();
        copy.temperature = 0;
        assert_eq!(last.load().unwrap().temperature, 84);
    }

    #[test]
    fn test_queue_depths() {
        let states: StateQueue<NoopRawMutex> = Channel::new();
        assert!(states.try_send(DeviceState::default()).is_ok());
        assert!(states.try_send(DeviceState::default()).is_ok());
        assert!(states.try_send(DeviceState::default()).is_err());

        let commands: CommandQueue<NoopRawMutex> = Channel::new();
        for _ in 0..COMMAND_QUEUE_DEPTH {
            assert!(commands.try_send(Command::RequestStatusNow).is_ok());
        }
        assert!(commands.try_send(Command::RequestStatusNow).is_err());

        let results: ResultQueue<NoopRawMutex> = Channel::new();
        let result = CommandResult {
            command: Command::RequestStatusNow,
            result: Err(crate::bus::BusError::Serial(chembridge_hal::SerialError::Timeout)),
        };
        for _ in 0..RESULT_QUEUE_DEPTH {
            assert!(results.try_send(result).is_ok());
        }
        assert!(results.try_send(result).is_err());
    }
}
