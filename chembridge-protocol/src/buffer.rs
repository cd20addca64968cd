//! Resynchronizing packet buffer
//!
//! Serial reads arrive in arbitrary chunks and the bus carries noise, torn
//! frames, and traffic from other devices. [`PacketBuffer`] accumulates raw
//! bytes in a fixed ring and recovers frame boundaries on its own: it scans
//! for the preamble, rejects implausible headers, and verifies the checksum
//! before handing out a [`Frame`].
//!
//! Both ingestion and extraction return immediately. Under sustained noise the
//! buffer stays bounded: bytes that cannot start a preamble are dropped, and an
//! overflow keeps only the most recent bytes.

use crate::frame::{
    self, offset, Frame, HEADER_START, MAX_FRAME_SIZE, MIN_FRAME_SIZE, PREAMBLE, PREAMBLE_LENGTH,
};

/// Ring capacity in bytes
pub const PACKET_BUFFER_CAPACITY: usize = 256;

/// Bytes kept when incoming data would overflow the ring
pub const OVERFLOW_RETAIN: usize = 64;

/// Bytes kept when no preamble is present (a preamble may be split across reads)
const PARTIAL_PREAMBLE_RETAIN: usize = PREAMBLE_LENGTH - 1;

/// Buffer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferStats {
    /// Frames that passed checksum validation
    pub packets_received: u32,
    /// Raw bytes ingested
    pub bytes_received: u32,
    /// Candidate frames rejected by checksum
    pub invalid_checksums: u32,
    /// Ingestions that had to discard old data
    pub overflows: u32,
    /// Times leading garbage was skipped to reach a preamble
    pub resyncs: u32,
}

/// Bounded byte ring that turns a noisy stream into validated frames
pub struct PacketBuffer {
    data: [u8; PACKET_BUFFER_CAPACITY],
    /// Write cursor
    head: usize,
    /// Read cursor
    tail: usize,
    count: usize,
    stats: BufferStats,
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0; PACKET_BUFFER_CAPACITY],
            head: 0,
            tail: 0,
            count: 0,
            stats: BufferStats {
                packets_received: 0,
                bytes_received: 0,
                invalid_checksums: 0,
                overflows: 0,
                resyncs: 0,
            },
        }
    }

    /// Append bytes read from the serial port
    ///
    /// If the new data would not fit, everything but the most recent
    /// [`OVERFLOW_RETAIN`] buffered bytes is dropped first and an overflow is
    /// counted. Input larger than the whole ring overwrites the oldest bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        self.stats.bytes_received = self.stats.bytes_received.wrapping_add(bytes.len() as u32);

        if self.count + bytes.len() > PACKET_BUFFER_CAPACITY {
            self.stats.overflows = self.stats.overflows.wrapping_add(1);
            if self.count > OVERFLOW_RETAIN {
                self.discard(self.count - OVERFLOW_RETAIN);
            }
        }

        for &byte in bytes {
            self.data[self.head] = byte;
            self.head = (self.head + 1) % PACKET_BUFFER_CAPACITY;
            if self.count < PACKET_BUFFER_CAPACITY {
                self.count += 1;
            } else {
                self.tail = (self.tail + 1) % PACKET_BUFFER_CAPACITY;
            }
        }
    }

    /// Extract the next valid frame, if one is complete
    ///
    /// Call repeatedly until it returns `None` to drain every buffered frame.
    pub fn next_frame(&mut self) -> Option<Frame> {
        while self.count >= MIN_FRAME_SIZE {
            let Some(start) = self.find_preamble() else {
                if self.count > PARTIAL_PREAMBLE_RETAIN {
                    self.discard(self.count - PARTIAL_PREAMBLE_RETAIN);
                }
                return None;
            };

            if start > 0 {
                self.discard(start);
                self.stats.resyncs = self.stats.resyncs.wrapping_add(1);
            }

            if self.count < MIN_FRAME_SIZE {
                return None;
            }

            // False preamble match
            if self.peek(offset::START) != HEADER_START {
                self.discard(1);
                continue;
            }

            let frame_len = frame::total_length(self.peek(offset::LENGTH));
            if frame_len > MAX_FRAME_SIZE {
                self.discard(1);
                continue;
            }

            if self.count < frame_len {
                return None;
            }

            let mut candidate = [0u8; MAX_FRAME_SIZE];
            self.copy_out(&mut candidate[..frame_len]);

            // Drop a single byte on mismatch so a genuine frame overlapping
            // the false candidate is still found.
            match Frame::from_bytes(&candidate[..frame_len]) {
                Ok(frame) => {
                    self.discard(frame_len);
                    self.stats.packets_received = self.stats.packets_received.wrapping_add(1);
                    return Some(frame);
                }
                Err(_) => {
                    self.stats.invalid_checksums = self.stats.invalid_checksums.wrapping_add(1);
                    self.discard(1);
                }
            }
        }

        None
    }

    /// Drop all buffered bytes, keeping the counters
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Number of bytes waiting to be framed
    pub fn pending(&self) -> usize {
        self.count
    }

    pub fn stats(&self) -> &BufferStats {
        &self.stats
    }

    fn peek(&self, at: usize) -> u8 {
        self.data[(self.tail + at) % PACKET_BUFFER_CAPACITY]
    }

    fn copy_out(&self, dest: &mut [u8]) {
        for (i, byte) in dest.iter_mut().enumerate() {
            *byte = self.peek(i);
        }
    }

    fn discard(&mut self, n: usize) {
        let n = n.min(self.count);
        self.tail = (self.tail + n) % PACKET_BUFFER_CAPACITY;
        self.count -= n;
    }

    fn find_preamble(&self) -> Option<usize> {
        if self.count < PREAMBLE_LENGTH {
            return None;
        }
        (0..=self.count - PREAMBLE_LENGTH).find(|&i| {
            self.peek(i) == PREAMBLE[0]
                && self.peek(i + 1) == PREAMBLE[1]
                && self.peek(i + 2) == PREAMBLE[2]
        })
    }
}
