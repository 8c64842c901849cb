use ccdlink_frame::{DEFAULT_MAX_PIXEL_COUNT, DEFAULT_REASSEMBLY_CAPACITY, REQUEST_CAPACITY};

/// Default size of the scratch buffer frames are COBS-decoded into: 1 MiB.
pub const DEFAULT_DECODE_CAPACITY: usize = 1024 * 1024;

/// Buffer sizes and sanity bounds for a [`Host`](crate::host::Host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Capacity of the inbound reassembly buffer. Default: 1 MiB.
    pub reassembly_capacity: usize,
    /// Capacity of the decode scratch buffer. Default: 1 MiB.
    pub decode_capacity: usize,
    /// Exclusive upper bound on `pixel_count` in a CCD result. Default: 5000.
    pub max_pixel_count: u32,
    /// Scratch size for one outgoing request. Default: 64.
    pub request_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            reassembly_capacity: DEFAULT_REASSEMBLY_CAPACITY,
            decode_capacity: DEFAULT_DECODE_CAPACITY,
            max_pixel_count: DEFAULT_MAX_PIXEL_COUNT,
            request_capacity: REQUEST_CAPACITY,
        }
    }
}
