use ccdlink_frame::FrameRange;

/// Errors reported by a [`ResultStore`](crate::store::ResultStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No stored operation has this id.
    #[error("operation {0} not found in store")]
    NotFound(u32),

    /// An operation with this id is already stored.
    #[error("operation {0} already stored")]
    Duplicate(u32),

    /// The storage backend failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while dispatching host commands.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ccdlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] ccdlink_frame::FrameError),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A device command was issued without an open connection.
    #[error("not connected to a device")]
    NotConnected,

    /// No operation with this id is loaded.
    #[error("operation {0} is not loaded")]
    UnknownOperation(u32),

    /// A result arrived for an operation id that already exists.
    #[error("operation {0} already exists")]
    DuplicateOperation(u32),

    /// A queued frame no longer lies inside the reassembly buffer.
    #[error("frame {}..{} outside reassembly buffer ({held} bytes held)", .range.start, .range.end)]
    StaleFrame { range: FrameRange, held: usize },
}

pub type Result<T> = std::result::Result<T, HostError>;
