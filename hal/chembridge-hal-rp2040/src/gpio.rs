//! Driver-enable output

use chembridge_hal::OutputPin;
use embassy_rp::gpio::Output;

/// RS-485 driver-enable (DE, /RE tied) pin
pub struct DriverEnable {
    pin: Output<'static>,
}

impl DriverEnable {
    pub fn new(pin: Output<'static>) -> Self {
        Self { pin }
    }
}

impl OutputPin for DriverEnable {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}
