//! Deferred host actions.
//!
//! Producers (the UI, the inbound byte pump) push [`Command`]s; the host
//! drains the queue once per tick. A drain takes a snapshot, so commands
//! pushed while a tick is being processed wait for the next one.

use std::mem;

use ccdlink_frame::FrameRange;

/// One deferred action. Each variant carries exactly the data it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the device at this path.
    ConnectToDevice(String),
    /// Ask the device for one acquisition.
    StartCcdOperation { exposure: u32, iterations: u32 },
    /// Persist the in-memory name of this operation.
    UpdateOperationName(u32),
    /// Persist the in-memory note of this operation.
    UpdateOperationNote(u32),
    /// Replace the operation list with stored operations whose timestamp
    /// lies in `start..=end` (unix seconds).
    LoadOperations { start: i64, end: i64 },
    /// Decode a frame sitting in the reassembly buffer.
    DecodeIncomingFrame(FrameRange),
}

impl Command {
    /// Load every stored operation.
    pub fn load_all() -> Self {
        Self::LoadOperations {
            start: 0,
            end: i64::MAX,
        }
    }

    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectToDevice(_) => "connect_to_device",
            Self::StartCcdOperation { .. } => "start_ccd_operation",
            Self::UpdateOperationName(_) => "update_operation_name",
            Self::UpdateOperationNote(_) => "update_operation_note",
            Self::LoadOperations { .. } => "load_operations",
            Self::DecodeIncomingFrame(_) => "decode_incoming_frame",
        }
    }
}

/// FIFO of pending commands.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Iterate pending commands in order without removing them.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.pending.iter()
    }

    /// Take every pending command, leaving the queue empty.
    pub fn take(&mut self) -> Vec<Command> {
        mem::take(&mut self.pending)
    }

    /// Drop queued frame decodes. Used when the reassembly buffer is reset.
    pub fn discard_frames(&mut self) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|command| !matches!(command, Command::DecodeIncomingFrame(_)));
        before - self.pending.len()
    }
}
