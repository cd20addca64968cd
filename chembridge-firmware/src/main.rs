//! Chembridge - IntelliChem RS-485 Bridge Firmware
//!
//! Main firmware binary for RP2040 boards with an RS-485 transceiver.
//! Polls a Pentair IntelliChem controller over the half-duplex bus, publishes
//! its state and forwards validated setting changes back to it.
//!
//! Without a network transport the bridge runs in log-only mode: the link is
//! reported up at boot and every state goes to the defmt log.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Uart};
use embassy_time::Instant;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use chembridge_core::link::ConnectionEvent;
use chembridge_core::Bridge;
use chembridge_hal_rp2040::{uart_config, DriverEnable};
use chembridge_protocol::frame::MIN_FRAME_SIZE;

use crate::channels::{COMMAND_QUEUE, CONNECTION_EVENTS};
use crate::config::load_config;
use crate::publisher::LogPublisher;

mod channels;
mod config;
mod publisher;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Chembridge firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();

    // RS-485 transceiver: UART0 on GPIO0 (TX) / GPIO1 (RX), DE on GPIO2
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config(&config.uart));
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    // Receiver enabled, driver off until we transmit
    let de = DriverEnable::new(Output::new(p.PIN_2, Level::Low));

    info!(
        "RS-485 initialized: {} baud ({}ms per poll frame), device 0x{:02X}",
        config.uart.baudrate,
        config.uart.transmit_time_ms(MIN_FRAME_SIZE),
        config.device_address
    );

    let bus = tasks::bus::build_bus(tx, rx, de, &config);
    let bridge = Bridge::new(
        LogPublisher::new(),
        &config,
        &COMMAND_QUEUE,
        Instant::now().as_millis(),
    );

    // Spawn tasks
    spawner.spawn(tasks::bus_task(bus)).unwrap();
    spawner
        .spawn(tasks::bridge_task(bridge, config.state_wait_ms))
        .unwrap();

    // Log-only transport: the link is up as soon as we are
    for event in [
        ConnectionEvent::NetworkStart,
        ConnectionEvent::NetworkUp,
        ConnectionEvent::BrokerStart,
        ConnectionEvent::BrokerUp,
    ] {
        CONNECTION_EVENTS.send(event).await;
    }

    info!("All tasks spawned, bridge running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
