//! Log-only state publisher
//!
//! Used when no network transport is built in: every state and command result
//! is written to the defmt log instead.

use defmt::*;

use chembridge_core::{CommandResult, PublishError, StatePublisher};
use chembridge_protocol::DeviceState;

pub struct LogPublisher {
    published: u32,
}

impl LogPublisher {
    pub const fn new() -> Self {
        Self { published: 0 }
    }
}

impl StatePublisher for LogPublisher {
    fn publish_state(&mut self, state: &DeviceState) -> Result<(), PublishError> {
        self.published = self.published.wrapping_add(1);

        info!(
            "State #{}: pH={} (set {}) ORP={}mV (set {}) temp={}F LSI={}",
            self.published,
            state.ph.level,
            state.ph.setpoint,
            state.orp.level,
            state.orp.setpoint,
            state.temperature,
            state.lsi
        );
        info!(
            "  tanks pH={}% ORP={}% CH={} CYA={} TA={} salt={} fw={}",
            state.ph.tank_level_percent(),
            state.orp.tank_level_percent(),
            state.calcium_hardness,
            state.cyanuric_acid,
            state.alkalinity,
            state.salt_level,
            state.firmware.render().as_str()
        );

        if state.comms_lost {
            warn!("  device not responding, values are stale");
        }
        if state.alarms.any() {
            warn!("  alarms: {:?}", state.alarms);
        }
        if state.warnings.any() {
            warn!("  warnings: {:?}", state.warnings);
        }
        if !state.flow_detected {
            warn!("  no flow");
        }

        Ok(())
    }

    fn publish_command_result(&mut self, result: &CommandResult) -> Result<(), PublishError> {
        if result.is_success() {
            info!("Command {:?}: success", result.command);
        } else {
            warn!("Command {:?}: failed ({:?})", result.command, result.result);
        }
        Ok(())
    }
}
