//! GPIO pin abstractions
//!
//! RS-485 transceivers have a driver-enable line (DE, usually tied to /RE)
//! that must be asserted while transmitting and released afterwards so the
//! bus can be heard again. Both directions can never be active at once.

/// Digital output pin
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;
}

/// Transceiver direction control
///
/// Wraps an optional DE pin. Boards with an auto-direction transceiver have
/// no pin, in which case driving and releasing are no-ops.
pub struct DirectionControl<P> {
    pin: Option<P>,
    driving: bool,
}

impl<P: OutputPin> DirectionControl<P> {
    /// Direction control on a dedicated DE pin, starting in receive mode
    pub fn new(mut pin: P) -> Self {
        pin.set_low();
        Self {
            pin: Some(pin),
            driving: false,
        }
    }

    /// Direction control for an auto-direction transceiver
    pub fn automatic() -> Self {
        Self {
            pin: None,
            driving: false,
        }
    }

    /// Assert the driver: the bus is ours until [`Self::release`]
    pub fn drive(&mut self) {
        if let Some(pin) = self.pin.as_mut() {
            pin.set_high();
        }
        self.driving = true;
    }

    /// Release the bus back to receive mode
    pub fn release(&mut self) {
        if let Some(pin) = self.pin.as_mut() {
            pin.set_low();
        }
        self.driving = false;
    }

    /// Whether the transceiver is currently driving the bus
    pub fn is_driving(&self) -> bool {
        self.driving
    }

    /// Whether a physical DE pin is being controlled
    pub fn has_pin(&self) -> bool {
        self.pin.is_some()
    }

    /// Access the underlying pin (mainly for tests)
    pub fn pin(&self) -> Option<&P> {
        self.pin.as_ref()
    }
}
