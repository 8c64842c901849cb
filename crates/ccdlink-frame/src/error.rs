/// Errors that can occur during payload serialization and frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The destination buffer cannot hold the worst-case encoding.
    #[error("insufficient capacity ({needed} bytes needed, {remaining} remaining)")]
    Capacity { needed: usize, remaining: usize },

    /// The payload ended in the middle of a field.
    #[error("unexpected end of payload")]
    UnexpectedEnd,

    /// A varint does not fit the requested integer width.
    #[error("varint overflows {bits}-bit integer")]
    VarintOverflow { bits: u32 },

    /// A COBS frame contains a zero byte.
    #[error("zero byte inside COBS frame at offset {0}")]
    ZeroInFrame(usize),

    /// A COBS frame ends before its final run is complete.
    #[error("truncated COBS run ({missing} bytes missing)")]
    TruncatedRun { missing: usize },

    /// The reassembly buffer filled up without a frame delimiter.
    #[error("reassembly buffer full ({capacity} bytes) without a frame delimiter")]
    BufferOverflow { capacity: usize },

    /// A result announced more samples than the sanity bound allows.
    #[error("pixel count too large ({count}, must be below {max})")]
    PixelCountTooLarge { count: u32, max: u32 },

    /// A frame carried a message tag that is not valid here.
    #[error("unexpected message tag {0}")]
    UnexpectedTag(u8),

    /// A log record carried an unknown severity.
    #[error("invalid log severity {0}")]
    InvalidSeverity(u8),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device stopped accepting bytes.
    #[error("connection closed (write returned zero)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
