//! Serial protocol engine for CCD line-sensor instruments.
//!
//! Turns the chunked byte stream of a serial-attached instrument into typed
//! results and log lines, and typed requests into COBS frames.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial device access and port enumeration
//! - [`frame`]: payload cursor, varints, COBS framing and stream reassembly
//! - [`host`]: command queue, dispatcher and operation model (behind `host` feature)

/// Re-export transport types.
pub mod transport {
    pub use ccdlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ccdlink_frame::*;
}

/// Re-export host types (requires `host` feature).
#[cfg(feature = "host")]
pub mod host {
    pub use ccdlink_host::*;
}
