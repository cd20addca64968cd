//! Frame encoding and validation for the IntelliChem RS-485 protocol.
//!
//! Frame format:
//! - PREAMBLE (3 bytes): `FF 00 FF`, not covered by the checksum
//! - START (1 byte): `0xA5`
//! - SUB (1 byte): `0x00`
//! - DEST (1 byte): destination address
//! - SRC (1 byte): source address
//! - ACTION (1 byte): message purpose
//! - LENGTH (1 byte): payload length
//! - PAYLOAD (LENGTH bytes)
//! - CHECKSUM (2 bytes): big-endian 16-bit wrapping sum of START..=PAYLOAD
//!
//! The free functions here are stateless and operate on byte slices. The
//! field accessors assume a structurally valid frame; use [`Frame`] when the
//! bytes come from the wire.

use heapless::Vec;

/// Frame preamble, precedes every header
pub const PREAMBLE: [u8; 3] = [0xFF, 0x00, 0xFF];

/// Header start marker
pub const HEADER_START: u8 = 0xA5;

/// Header sub marker
pub const HEADER_SUB: u8 = 0x00;

pub const PREAMBLE_LENGTH: usize = 3;
pub const HEADER_LENGTH: usize = 6;
pub const CHECKSUM_LENGTH: usize = 2;

/// Smallest possible frame: preamble + header + empty payload + checksum
pub const MIN_FRAME_SIZE: usize = PREAMBLE_LENGTH + HEADER_LENGTH + CHECKSUM_LENGTH;

/// Largest frame the bus is expected to carry; longer length fields are noise
pub const MAX_FRAME_SIZE: usize = 64;

/// Largest payload that fits in [`MAX_FRAME_SIZE`]
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - MIN_FRAME_SIZE;

/// Byte offsets within a frame
pub mod offset {
    pub const START: usize = 3;
    pub const SUB: usize = 4;
    pub const DEST: usize = 5;
    pub const SRC: usize = 6;
    pub const ACTION: usize = 7;
    pub const LENGTH: usize = 8;
    pub const PAYLOAD: usize = 9;
}

/// Address the bridge uses on the bus (it plays the controller role)
pub const CONTROLLER_ADDRESS: u8 = 16;

/// Lowest address an IntelliChem may be configured with
pub const DEVICE_ADDRESS_MIN: u8 = 144;

/// Highest address an IntelliChem may be configured with
pub const DEVICE_ADDRESS_MAX: u8 = 158;

/// Factory default IntelliChem address
pub const DEFAULT_DEVICE_ADDRESS: u8 = 144;

/// Controller asks the IntelliChem for its status
pub const ACTION_STATUS_REQUEST: u8 = 210;

/// IntelliChem status report
pub const ACTION_STATUS_RESPONSE: u8 = 18;

/// Controller writes setpoints and water chemistry to the IntelliChem
pub const ACTION_CONFIG_COMMAND: u8 = 146;

/// Errors that can occur during frame building or validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload cannot be described by the length field or exceeds the frame limit
    PayloadTooLarge,
    /// Output buffer too small for encoding
    BufferTooSmall,
    /// Fewer bytes than the header declares
    Incomplete,
    /// Preamble or start marker missing
    InvalidStructure,
    /// Checksum mismatch
    InvalidChecksum,
}

/// Whether `addr` is a valid IntelliChem address
pub fn is_device_address(addr: u8) -> bool {
    (DEVICE_ADDRESS_MIN..=DEVICE_ADDRESS_MAX).contains(&addr)
}

/// Total frame length for a given payload length
pub const fn total_length(payload_len: u8) -> usize {
    MIN_FRAME_SIZE + payload_len as usize
}

/// 16-bit wrapping sum of header and payload bytes
pub fn checksum(header_and_payload: &[u8]) -> u16 {
    header_and_payload
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16))
}

/// Encode a frame into `buf`
///
/// Returns the number of bytes written.
pub fn build(
    buf: &mut [u8],
    dest: u8,
    src: u8,
    action: u8,
    payload: &[u8],
) -> Result<usize, FrameError> {
    let payload_len = u8::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge)?;
    let frame_len = total_length(payload_len);
    if buf.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }

    buf[..PREAMBLE_LENGTH].copy_from_slice(&PREAMBLE);
    buf[offset::START] = HEADER_START;
    buf[offset::SUB] = HEADER_SUB;
    buf[offset::DEST] = dest;
    buf[offset::SRC] = src;
    buf[offset::ACTION] = action;
    buf[offset::LENGTH] = payload_len;
    buf[offset::PAYLOAD..offset::PAYLOAD + payload.len()].copy_from_slice(payload);

    let sum = checksum(&buf[PREAMBLE_LENGTH..offset::PAYLOAD + payload.len()]);
    buf[frame_len - CHECKSUM_LENGTH..frame_len].copy_from_slice(&sum.to_be_bytes());

    Ok(frame_len)
}

/// Verify the trailing checksum
///
/// Fails closed: short buffers and length fields that overrun the buffer are
/// rejected without reading past the end.
pub fn validate_checksum(bytes: &[u8]) -> bool {
    if bytes.len() < MIN_FRAME_SIZE {
        return false;
    }

    let payload_len = bytes[offset::LENGTH];
    let frame_len = total_length(payload_len);
    if bytes.len() < frame_len {
        return false;
    }

    let calculated = checksum(&bytes[PREAMBLE_LENGTH..offset::PAYLOAD + payload_len as usize]);
    let received = u16::from_be_bytes([bytes[frame_len - 2], bytes[frame_len - 1]]);
    calculated == received
}

/// Check the preamble and header start marker, independent of the checksum
pub fn validate_structure(bytes: &[u8]) -> bool {
    bytes.len() >= MIN_FRAME_SIZE
        && bytes[..PREAMBLE_LENGTH] == PREAMBLE
        && bytes[offset::START] == HEADER_START
}

/// Action code of a structurally valid frame
///
/// # Panics
/// If `frame` is shorter than the header.
pub fn action(frame: &[u8]) -> u8 {
    frame[offset::ACTION]
}

/// Source address of a structurally valid frame
///
/// # Panics
/// If `frame` is shorter than the header.
pub fn source(frame: &[u8]) -> u8 {
    frame[offset::SRC]
}

/// Destination address of a structurally valid frame
///
/// # Panics
/// If `frame` is shorter than the header.
pub fn dest(frame: &[u8]) -> u8 {
    frame[offset::DEST]
}

/// Declared payload length of a structurally valid frame
///
/// # Panics
/// If `frame` is shorter than the header.
pub fn payload_len(frame: &[u8]) -> u8 {
    frame[offset::LENGTH]
}

/// Payload slice of a structurally valid frame
///
/// # Panics
/// If `frame` is shorter than its declared length.
pub fn payload(frame: &[u8]) -> &[u8] {
    let len = payload_len(frame) as usize;
    &frame[offset::PAYLOAD..offset::PAYLOAD + len]
}

/// A complete frame whose structure and checksum have been verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8, MAX_FRAME_SIZE>,
}

impl Frame {
    /// Build a new frame
    pub fn new(dest: u8, src: u8, action: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = build(&mut buffer, dest, src, action, payload)?;

        let mut bytes = Vec::new();
        bytes
            .extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { bytes })
    }

    /// Status request from the bridge to the device at `dest`
    pub fn status_request(dest: u8) -> Self {
        let mut buffer = [0u8; MIN_FRAME_SIZE];
        // An empty payload always fills exactly MIN_FRAME_SIZE
        let built = build(&mut buffer, dest, CONTROLLER_ADDRESS, ACTION_STATUS_REQUEST, &[]);
        debug_assert_eq!(built, Ok(MIN_FRAME_SIZE));

        let mut bytes = Vec::new();
        let copied = bytes.extend_from_slice(&buffer);
        debug_assert!(copied.is_ok());
        Self { bytes }
    }

    /// Validate bytes received from the wire
    ///
    /// Trailing bytes past the declared length are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(FrameError::Incomplete);
        }
        if !validate_structure(data) {
            return Err(FrameError::InvalidStructure);
        }

        let frame_len = total_length(payload_len(data));
        if frame_len > MAX_FRAME_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        if data.len() < frame_len {
            return Err(FrameError::Incomplete);
        }
        if !validate_checksum(&data[..frame_len]) {
            return Err(FrameError::InvalidChecksum);
        }

        let mut bytes = Vec::new();
        bytes
            .extend_from_slice(&data[..frame_len])
            .map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { bytes })
    }

    /// Raw encoded bytes, ready for transmission
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a frame has at least [`MIN_FRAME_SIZE`] bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn dest(&self) -> u8 {
        dest(&self.bytes)
    }

    pub fn source(&self) -> u8 {
        source(&self.bytes)
    }

    pub fn action(&self) -> u8 {
        action(&self.bytes)
    }

    pub fn payload_len(&self) -> u8 {
        payload_len(&self.bytes)
    }

    pub fn payload(&self) -> &[u8] {
        payload(&self.bytes)
    }

    /// Checksum carried by the frame
    pub fn checksum(&self) -> u16 {
        let len = self.bytes.len();
        u16::from_be_bytes([self.bytes[len - 2], self.bytes[len - 1]])
    }
}
