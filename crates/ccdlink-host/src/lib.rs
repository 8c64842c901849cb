//! Host side of a ccdlink instrument connection.
//!
//! A [`Host`] owns everything one connection needs: the command queue, the
//! reassembly and decode buffers, the list of loaded operations and the
//! device handle. It talks to three collaborators:
//! - a [`Connector`](ccdlink_transport::Connector) that opens devices
//! - a [`ResultStore`] that persists operations and hands out ids
//! - a [`Logger`] that receives host and device log lines
//!
//! Everything runs on the caller's thread, one [`Host::tick`] at a time.

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod host;
pub mod logger;
pub mod operation;
pub mod store;

pub use clock::{unix_now, Clock};
pub use command::{Command, CommandQueue};
pub use config::{HostConfig, DEFAULT_DECODE_CAPACITY};
pub use error::{HostError, Result, StoreError, StoreResult};
pub use host::{Host, TickReport};
pub use logger::{
    LogContext, LogEntry, LogHistory, Logger, SourceLocation, DEFAULT_HISTORY_LIMIT,
};
pub use operation::{CcdOperation, ConnectionState, HostEvent};
pub use store::{MemoryStore, ResultStore};
