use std::io::{ErrorKind, Read};

use tracing::{trace, warn};

use crate::cobs::DELIMITER;
use crate::error::{FrameError, Result};

/// Default reassembly buffer size: 1 MiB.
pub const DEFAULT_REASSEMBLY_CAPACITY: usize = 1024 * 1024;

/// A delimited frame inside the reassembly buffer, still COBS-encoded.
///
/// `start..end` excludes the delimiter, which sits at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: usize,
    pub end: usize,
}

impl FrameRange {
    /// Encoded length, delimiter excluded.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True for two back-to-back delimiters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Offset one past this frame's delimiter.
    pub fn consumed_end(&self) -> usize {
        self.end + 1
    }
}

/// Accumulates raw inbound bytes and splits them on frame delimiters.
///
/// The buffer is allocated once with a fixed capacity. Bytes of a frame
/// whose delimiter has not arrived yet stay in place across reads; once the
/// caller has decoded the reported frames it calls [`Reassembler::compact`]
/// to move the trailing partial frame to the front.
pub struct Reassembler {
    buf: Box<[u8]>,
    len: usize,
    frame_start: usize,
}

impl Reassembler {
    /// Create a reassembler with a fixed buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            frame_start: 0,
        }
    }

    /// Buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes currently held (complete frames not yet compacted plus any partial frame).
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bytes are held.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes currently held.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Borrow the encoded bytes of a frame reported by this reassembler.
    pub fn frame(&self, range: FrameRange) -> &[u8] {
        &self.buf[range.start..range.end]
    }

    /// True when the buffer is full and holds no delimiter.
    ///
    /// Nothing more can be accepted; the connection feeding this buffer
    /// must be dropped.
    pub fn is_overflowed(&self) -> bool {
        self.len == self.buf.len() && self.frame_start == 0
    }

    /// Read everything currently available from `src`.
    ///
    /// Reads until the source reports no data or the buffer is full. Every
    /// delimiter found in the newly read bytes appends a [`FrameRange`] to
    /// `frames`. Returns the number of bytes appended.
    pub fn fill_from<R: Read + ?Sized>(
        &mut self,
        src: &mut R,
        frames: &mut Vec<FrameRange>,
    ) -> Result<usize> {
        self.check_overflow()?;

        let mut total = 0usize;
        while self.len < self.buf.len() {
            let read = match src.read(&mut self.buf[self.len..]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => 0,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                break;
            }

            let from = self.len;
            self.len += read;
            total += read;
            self.scan(from, frames);
        }

        if total > 0 {
            trace!(appended = total, held = self.len, "reassembler filled");
        }
        self.check_overflow()?;
        Ok(total)
    }

    /// Append bytes from a slice. Returns how many were accepted.
    pub fn push(&mut self, bytes: &[u8], frames: &mut Vec<FrameRange>) -> Result<usize> {
        self.check_overflow()?;

        let accepted = bytes.len().min(self.buf.len() - self.len);
        let from = self.len;
        self.buf[from..from + accepted].copy_from_slice(&bytes[..accepted]);
        self.len += accepted;
        self.scan(from, frames);

        self.check_overflow()?;
        Ok(accepted)
    }

    /// Drop the first `consumed` bytes and shift the rest to the front.
    ///
    /// `consumed` is normally [`FrameRange::consumed_end`] of the last
    /// decoded frame; zero leaves the buffer untouched.
    pub fn compact(&mut self, consumed: usize) {
        let consumed = consumed.min(self.len);
        if consumed == 0 {
            return;
        }

        self.buf.copy_within(consumed..self.len, 0);
        self.len -= consumed;
        self.frame_start = self.frame_start.saturating_sub(consumed);
    }

    /// Discard everything, including a partial frame.
    pub fn clear(&mut self) {
        self.len = 0;
        self.frame_start = 0;
    }

    fn scan(&mut self, from: usize, frames: &mut Vec<FrameRange>) {
        for offset in from..self.len {
            if self.buf[offset] == DELIMITER {
                frames.push(FrameRange {
                    start: self.frame_start,
                    end: offset,
                });
                self.frame_start = offset + 1;
            }
        }
    }

    fn check_overflow(&self) -> Result<()> {
        if self.is_overflowed() {
            warn!(
                capacity = self.buf.len(),
                "reassembly buffer full without a frame delimiter"
            );
            return Err(FrameError::BufferOverflow {
                capacity: self.buf.len(),
            });
        }
        Ok(())
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_REASSEMBLY_CAPACITY)
    }
}

impl std::fmt::Debug for Reassembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reassembler")
            .field("capacity", &self.buf.len())
            .field("len", &self.len)
            .field("frame_start", &self.frame_start)
            .finish()
    }
}
