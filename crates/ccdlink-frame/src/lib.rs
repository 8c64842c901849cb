//! Wire format for serial instrument links.
//!
//! Every message is serialized into a [`Payload`] with base-128 varints,
//! then COBS-encoded so the only zero byte on the wire is the frame
//! delimiter:
//!
//! ```text
//! ┌──────────────────────────────┬──────┐
//! │ COBS(tag, varint fields ...) │ 0x00 │
//! └──────────────────────────────┴──────┘
//! ```
//!
//! On the receive side a [`Reassembler`] collects arbitrarily chunked bytes
//! and reports complete frames; partial frames survive until their
//! delimiter arrives.

pub mod cobs;
pub mod error;
pub mod message;
pub mod payload;
pub mod reassembler;
pub mod varint;
pub mod writer;

pub use cobs::{
    cobs_overhead, max_encoded_len, max_frame_overhead, CobsEncoder, DELIMITER, MAX_RUN,
};
pub use error::{FrameError, Result};
pub use message::{
    CcdRequest, CcdResult, DeviceLog, DeviceMessage, HostCommand, ResponseTag, Severity,
    CHECKSUM_PLACEHOLDER, DEFAULT_MAX_PIXEL_COUNT, REQUEST_CAPACITY,
};
pub use payload::{Payload, PayloadReader};
pub use reassembler::{FrameRange, Reassembler, DEFAULT_REASSEMBLY_CAPACITY};
pub use varint::{encoded_len, zigzag_decode, zigzag_encode, VarInt, MAX_VARINT_LEN};
pub use writer::{encode_frame, FrameWriter};
