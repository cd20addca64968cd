//! UART serial communication abstractions
//!
//! The RS-485 bus is half-duplex: the same pair of wires carries both
//! directions, so transmit and receive are separate traits and the caller
//! sequences them around the direction line (see [`crate::gpio`]).

/// Errors reported by a serial port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// Hardware FIFO overrun, bytes were lost
    Overrun,
    /// Stop bit not found where expected
    Framing,
    /// Parity check failed
    Parity,
    /// Driver receive buffer full, bytes were lost
    BufferFull,
    /// Transmission did not complete in time
    Timeout,
    /// Write rejected or only partially accepted
    Write,
}

impl SerialError {
    /// Whether this error leaves the receive path in an unknown, torn state
    ///
    /// Torn receive state is recovered by flushing the hardware input and
    /// clearing any partially assembled frame.
    pub fn is_receive_fault(&self) -> bool {
        matches!(
            self,
            SerialError::Overrun | SerialError::Framing | SerialError::Parity | SerialError::BufferFull
        )
    }
}

/// UART transmitter
pub trait SerialTx {
    /// Write data to the UART
    ///
    /// Returns once every byte has been handed to the peripheral.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), SerialError>;

    /// Wait until the last byte has physically left the shift register
    ///
    /// Must give up with [`SerialError::Timeout`] after `timeout_ms`.
    fn wait_tx_done(&mut self, timeout_ms: u32) -> Result<(), SerialError>;
}

/// UART receiver
pub trait SerialRx {
    /// Copy whatever bytes are already available into `buf`
    ///
    /// Never waits for more data. Returns `Ok(0)` when nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// Discard everything pending in the hardware/driver receive path
    fn flush_input(&mut self);
}

/// Spin until `busy` reports idle, giving up once `timeout_ms` has passed on `now_ms`
///
/// Building block for [`SerialTx::wait_tx_done`]. `busy` must stay true while
/// any byte is still queued anywhere between the driver and the line.
pub fn wait_until_idle(
    mut busy: impl FnMut() -> bool,
    mut now_ms: impl FnMut() -> u64,
    timeout_ms: u32,
) -> Result<(), SerialError> {
    let deadline = now_ms().saturating_add(timeout_ms as u64);
    while busy() {
        if now_ms() >= deadline {
            return Err(SerialError::Timeout);
        }
    }
    Ok(())
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    /// IntelliChem bus default: 9600 8N1
    fn default() -> Self {
        Self {
            baudrate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl UartConfig {
    /// Time on the wire for `bytes` bytes, rounded up to whole milliseconds
    pub fn transmit_time_ms(&self, bytes: usize) -> u32 {
        let bits_per_byte = 1 + self.data_bits.count()
            + if self.parity == Parity::None { 0 } else { 1 }
            + self.stop_bits.count();
        let total_bits = bytes as u32 * bits_per_byte;
        (total_bits * 1000).div_ceil(self.baudrate.max(1))
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

impl DataBits {
    fn count(&self) -> u32 {
        match self {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    fn count(&self) -> u32 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_9600_8n1() {
        let config = UartConfig::default();
        assert_eq!(config.baudrate, 9600);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
    }

    #[test]
    fn test_transmit_time() {
        let config = UartConfig::default();
        // 11 bytes * 10 bits = 110 bits at 9600 baud = 11.46ms
        assert_eq!(config.transmit_time_ms(11), 12);
        assert_eq!(config.transmit_time_ms(0), 0);
    }

    #[test]
    fn test_wait_until_idle_returns_when_drained() {
        let mut polls = 0;
        let result = wait_until_idle(
            || {
                polls += 1;
                polls < 4
            },
            || 0,
            100,
        );
        assert_eq!(result, Ok(()));
        assert_eq!(polls, 4);
    }

    #[test]
    fn test_wait_until_idle_bounded_by_deadline() {
        let mut clock = 0u64;
        let result = wait_until_idle(
            || true,
            || {
                clock += 10;
                clock
            },
            100,
        );
        assert_eq!(result, Err(SerialError::Timeout));
        // First reading sets the deadline at 110; gives up on the reading that reaches it
        assert_eq!(clock, 110);
    }

    #[test]
    fn test_receive_fault_classification() {
        assert!(SerialError::Overrun.is_receive_fault());
        assert!(SerialError::BufferFull.is_receive_fault());
        assert!(SerialError::Parity.is_receive_fault());
        assert!(!SerialError::Timeout.is_receive_fault());
        assert!(!SerialError::Write.is_receive_fault());
    }
}
