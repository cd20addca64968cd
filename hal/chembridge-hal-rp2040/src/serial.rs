//! Buffered UART halves for the RS-485 bus
//!
//! The UART runs interrupt-driven into embassy-rp's ring buffers; these
//! wrappers expose the non-blocking, error-classifying view the bus engine
//! expects.

use chembridge_hal::uart::{DataBits, Parity, StopBits};
use chembridge_hal::{wait_until_idle, SerialError, SerialRx, SerialTx, UartConfig};
use embassy_rp::uart::{self, BufferedUartRx, BufferedUartTx};
use embassy_time::Instant;
use embedded_io::{Read, ReadReady, Write};

/// Upper bound on reads while discarding input
const FLUSH_MAX_READS: usize = 16;

/// Translate the line settings into an embassy-rp UART config
pub fn uart_config(config: &UartConfig) -> uart::Config {
    let mut cfg = uart::Config::default();
    cfg.baudrate = config.baudrate;
    cfg.data_bits = match config.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    cfg.parity = match config.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    cfg.stop_bits = match config.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    cfg
}

fn map_error(e: uart::Error) -> SerialError {
    match e {
        uart::Error::Overrun => SerialError::Overrun,
        uart::Error::Parity => SerialError::Parity,
        // A break is a framing error held low
        _ => SerialError::Framing,
    }
}

/// Transmit half
pub struct Rs485Tx {
    tx: BufferedUartTx,
}

impl Rs485Tx {
    pub fn new(tx: BufferedUartTx) -> Self {
        Self { tx }
    }
}

impl SerialTx for Rs485Tx {
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), SerialError> {
        self.tx.write_all(data).map_err(|_| SerialError::Write)
    }

    fn wait_tx_done(&mut self, timeout_ms: u32) -> Result<(), SerialError> {
        // The TX interrupt refills the FIFO before it runs dry, so BUSY stays
        // set until the ring buffer and the shift register are both empty.
        let tx = &self.tx;
        wait_until_idle(|| tx.busy(), || Instant::now().as_millis(), timeout_ms)
    }
}

/// Receive half
pub struct Rs485Rx {
    rx: BufferedUartRx,
}

impl Rs485Rx {
    pub fn new(rx: BufferedUartRx) -> Self {
        Self { rx }
    }
}

impl SerialRx for Rs485Rx {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        if buf.is_empty() || !self.rx.read_ready().map_err(map_error)? {
            return Ok(0);
        }
        self.rx.read(buf).map_err(map_error)
    }

    fn flush_input(&mut self) {
        let mut scratch = [0u8; 32];
        for _ in 0..FLUSH_MAX_READS {
            match self.rx.read_ready() {
                Ok(true) => {
                    let _ = self.rx.read(&mut scratch);
                }
                Ok(false) => break,
                // Reading the error clears it; keep draining
                Err(_) => {}
            }
        }
    }
}
