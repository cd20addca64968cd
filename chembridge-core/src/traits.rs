//! Collaborator traits
//!
//! The bridge hands device states and command results to whatever carries
//! them to the supervisory network. The firmware ships a log-only
//! implementation.

use chembridge_protocol::DeviceState;

use crate::bus::CommandResult;

/// Publication failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// Transport not connected
    NotConnected,
    /// Message did not fit the outgoing buffer
    Encoding,
    /// Transport accepted the call but the publish failed
    Transport,
}

/// Publishes device states upstream
pub trait StatePublisher {
    fn publish_state(&mut self, state: &DeviceState) -> Result<(), PublishError>;

    /// Report whether an operator command reached the device
    fn publish_command_result(&mut self, result: &CommandResult) -> Result<(), PublishError>;
}

impl<T: StatePublisher + ?Sized> StatePublisher for &mut T {
    fn publish_state(&mut self, state: &DeviceState) -> Result<(), PublishError> {
        (**self).publish_state(state)
    }

    fn publish_command_result(&mut self, result: &CommandResult) -> Result<(), PublishError> {
        (**self).publish_command_result(result)
    }
}
