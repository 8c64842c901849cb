//! The host context: one owner for the queue, buffers and operation list.
//!
//! A host is driven by calling [`Host::tick`] once per frame of the
//! surrounding loop:
//!
//! ```text
//! poll device ─► reassembler ─► DecodeIncomingFrame ─┐
//!                                                    ├─► queue ─► dispatch ─► compact
//! caller ─────────────► enqueue(Command) ────────────┘
//! ```
//!
//! Nothing in a tick blocks. Requests are fire-and-forget; a result shows
//! up whenever the device sends it.

use std::panic::Location;

use ccdlink_frame::{
    cobs, CcdRequest, CcdResult, DeviceMessage, FrameRange, FrameWriter, Reassembler, Severity,
};
use ccdlink_transport::{Connector, DeviceIo};
use tracing::{debug, trace, warn};

use crate::clock::{unix_now, Clock};
use crate::command::{Command, CommandQueue};
use crate::config::HostConfig;
use crate::error::{HostError, Result, StoreError};
use crate::logger::{LogContext, Logger, SourceLocation};
use crate::operation::{CcdOperation, ConnectionState, HostEvent};
use crate::store::ResultStore;

/// Outcome of one [`Host::process_commands`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frames found by the device poll that preceded this pass.
    pub frames: usize,
    /// Commands taken from the queue and dispatched.
    pub dispatched: usize,
    /// Dispatched commands that failed. Failures are logged, never retried.
    pub failed: usize,
}

/// Protocol engine for one instrument connection.
pub struct Host<C, S, L> {
    config: HostConfig,
    connector: C,
    store: S,
    logger: L,
    queue: CommandQueue,
    reassembler: Reassembler,
    found: Vec<FrameRange>,
    decode_buf: Box<[u8]>,
    device: Option<FrameWriter<Box<dyn DeviceIo>>>,
    connection: ConnectionState,
    connected_path: Option<String>,
    operations: Vec<CcdOperation>,
    events: Vec<HostEvent>,
    pending_request: Option<u32>,
    clock: Clock,
}

impl<C, S, L> Host<C, S, L>
where
    C: Connector,
    S: ResultStore,
    L: Logger,
{
    /// Create a host with default buffer sizes.
    pub fn new(connector: C, store: S, logger: L) -> Self {
        Self::with_config(HostConfig::default(), connector, store, logger)
    }

    /// Create a host with explicit configuration.
    pub fn with_config(config: HostConfig, connector: C, store: S, logger: L) -> Self {
        Self {
            reassembler: Reassembler::with_capacity(config.reassembly_capacity),
            decode_buf: vec![0u8; config.decode_capacity].into_boxed_slice(),
            config,
            connector,
            store,
            logger,
            queue: CommandQueue::new(),
            found: Vec::new(),
            device: None,
            connection: ConnectionState::Disconnected,
            connected_path: None,
            operations: Vec::new(),
            events: Vec::new(),
            pending_request: None,
            clock: unix_now,
        }
    }

    /// Replace the wall clock used to timestamp new operations.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Queue a command for the next [`process_commands`](Self::process_commands).
    pub fn enqueue(&mut self, command: Command) {
        trace!(kind = command.kind(), "command queued");
        self.queue.push(command);
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Poll the device, then drain the queue.
    pub fn tick(&mut self) -> TickReport {
        let frames = self.poll_device();
        let mut report = self.process_commands();
        report.frames = frames;
        report
    }

    /// Read whatever the device has pending and queue a decode for every
    /// complete frame. Returns the number of frames queued.
    ///
    /// A read failure or a reassembly overflow drops the connection.
    pub fn poll_device(&mut self) -> usize {
        let Some(device) = self.device.as_mut() else {
            return 0;
        };

        self.found.clear();
        let filled = self
            .reassembler
            .fill_from(device.get_mut(), &mut self.found);

        let queued = self.found.len();
        for range in self.found.drain(..) {
            self.queue.push(Command::DecodeIncomingFrame(range));
        }

        if let Err(err) = filled {
            self.drop_connection();
            self.log_app(
                "poll_device",
                Severity::Error,
                &format!("Device connection lost: {err}"),
            );
            return 0;
        }
        queued
    }

    /// Dispatch every queued command exactly once, then compact the
    /// reassembly buffer past the frames that were decoded.
    ///
    /// Commands queued while this runs are left for the next call.
    pub fn process_commands(&mut self) -> TickReport {
        let commands = self.queue.take();
        let mut report = TickReport::default();
        let mut consumed = 0usize;

        for command in commands {
            report.dispatched += 1;
            let kind = command.kind();
            if let Command::DecodeIncomingFrame(range) = &command {
                consumed = consumed.max(range.consumed_end());
            }
            if let Err(err) = self.dispatch(command) {
                report.failed += 1;
                self.log_app(
                    "process_commands",
                    Severity::Error,
                    &format!("Command {kind} failed: {err}"),
                );
            }
        }

        if consumed > 0 {
            self.reassembler.compact(consumed);
        }
        if report.dispatched > 0 {
            debug!(
                dispatched = report.dispatched,
                failed = report.failed,
                held = self.reassembler.len(),
                "commands processed"
            );
        }
        report
    }

    fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::ConnectToDevice(path) => self.connect(path),
            Command::StartCcdOperation {
                exposure,
                iterations,
            } => self.start_ccd(exposure, iterations),
            Command::UpdateOperationName(id) => {
                let op = find_operation(&self.operations, id)?;
                self.store.update_name(id, &op.name)?;
                Ok(())
            }
            Command::UpdateOperationNote(id) => {
                let op = find_operation(&self.operations, id)?;
                self.store.update_note(id, &op.note)?;
                Ok(())
            }
            Command::LoadOperations { start, end } => {
                self.operations = self.store.query_range(start, end)?;
                debug!(start, end, loaded = self.operations.len(), "operations loaded");
                Ok(())
            }
            Command::DecodeIncomingFrame(range) => self.decode_frame(range),
        }
    }

    fn connect(&mut self, path: String) -> Result<()> {
        self.drop_device();
        match self.connector.open(&path) {
            Ok(io) => {
                self.device = Some(FrameWriter::with_payload_capacity(
                    io,
                    self.config.request_capacity,
                ));
                self.connection = ConnectionState::Connected;
                self.events
                    .push(HostEvent::TitleChanged(format!("Connected to: {path}")));
                self.log_app(
                    "connect",
                    Severity::Norm,
                    &format!("Connected to {path}"),
                );
                self.connected_path = Some(path);
                Ok(())
            }
            Err(err) => {
                self.connection = ConnectionState::ConnectionError;
                Err(err.into())
            }
        }
    }

    fn start_ccd(&mut self, exposure: u32, iterations: u32) -> Result<()> {
        if self.device.is_none() {
            return Err(HostError::NotConnected);
        }

        let id = self.store.next_id()?;
        let request = CcdRequest {
            id,
            iterations,
            exposure,
        };

        if let Some(pending) = self.pending_request {
            warn!(pending, id, "previous CCD request still unanswered");
        }

        let sent = match self.device.as_mut() {
            Some(device) => device.send_request(&request),
            None => return Err(HostError::NotConnected),
        };
        if let Err(err) = sent {
            self.drop_connection();
            return Err(err.into());
        }

        self.pending_request = Some(id);
        self.log_app(
            "start_ccd",
            Severity::Norm,
            &format!("Sending CCD command: Id={id}, Exposure={exposure}, Iterations={iterations}"),
        );
        Ok(())
    }

    fn decode_frame(&mut self, range: FrameRange) -> Result<()> {
        let held = self.reassembler.len();
        if range.start > range.end || range.end >= held {
            return Err(HostError::StaleFrame { range, held });
        }

        let encoded = self.reassembler.frame(range);
        let len = cobs::decode(encoded, &mut self.decode_buf)?;
        trace!(encoded = range.len(), decoded = len, "frame decoded");

        let message = DeviceMessage::decode(&self.decode_buf[..len], self.config.max_pixel_count)?;
        match message {
            DeviceMessage::CcdResult(result) => self.accept_result(result),
            DeviceMessage::Log(log) => {
                self.logger.record(
                    LogContext::Device,
                    SourceLocation {
                        file: "",
                        function: &log.function_lossy(),
                        line: log.line,
                    },
                    log.severity,
                    &log.message_lossy(),
                );
                Ok(())
            }
            DeviceMessage::Unknown(tag) => {
                debug!(tag, "ignoring frame with unknown tag");
                Ok(())
            }
        }
    }

    fn accept_result(&mut self, result: CcdResult) -> Result<()> {
        let CcdResult {
            id,
            iterations,
            exposure,
            samples,
        } = result;

        self.log_app(
            "accept_result",
            Severity::Norm,
            &format!("Got CCD result for [{id}] with [{}] elements", samples.len()),
        );
        if self.pending_request == Some(id) {
            self.pending_request = None;
        }
        if self.operations.iter().any(|op| op.id == id) {
            return Err(HostError::DuplicateOperation(id));
        }

        let operation = CcdOperation {
            id,
            timestamp: (self.clock)(),
            exposure,
            iterations,
            samples,
            name: String::new(),
            note: String::new(),
        };
        let created = match self.store.create(&operation) {
            Err(StoreError::Duplicate(id)) => return Err(HostError::DuplicateOperation(id)),
            created => created,
        };
        self.operations.push(operation);
        self.events.push(HostEvent::ResultReceived(id));

        let created = created?;
        if created != id {
            warn!(id, created, "store assigned a different id to the result");
        }
        Ok(())
    }

    fn drop_device(&mut self) {
        if self.device.take().is_some() {
            debug!(path = ?self.connected_path, "device closed");
        }
        self.connected_path = None;
        self.pending_request = None;
        self.reassembler.clear();
        let discarded = self.queue.discard_frames();
        if discarded > 0 {
            debug!(discarded, "dropped queued frames of closed connection");
        }
    }

    fn drop_connection(&mut self) {
        self.drop_device();
        self.connection = ConnectionState::ConnectionError;
    }

    #[track_caller]
    fn log_app(&mut self, function: &str, severity: Severity, message: &str) {
        let caller = Location::caller();
        self.logger.record(
            LogContext::App,
            SourceLocation {
                file: caller.file(),
                function,
                line: caller.line(),
            },
            severity,
            message,
        );
    }

    /// Current link status.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Path of the open device, if any.
    pub fn connected_path(&self) -> Option<&str> {
        self.connected_path.as_deref()
    }

    /// Id of the last request whose result has not arrived.
    pub fn pending_request(&self) -> Option<u32> {
        self.pending_request
    }

    pub fn operations(&self) -> &[CcdOperation] {
        &self.operations
    }

    /// Edit a loaded operation in place. Persist the change by queueing
    /// [`Command::UpdateOperationName`] or [`Command::UpdateOperationNote`].
    pub fn operation_mut(&mut self, id: u32) -> Option<&mut CcdOperation> {
        self.operations.iter_mut().find(|op| op.id == id)
    }

    /// Take pending presentation events.
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    /// Bytes held in the reassembly buffer.
    pub fn buffered_len(&self) -> usize {
        self.reassembler.len()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut L {
        &mut self.logger
    }
}

impl<C, S, L> std::fmt::Debug for Host<C, S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("connection", &self.connection)
            .field("connected_path", &self.connected_path)
            .field("queued", &self.queue.len())
            .field("reassembler", &self.reassembler)
            .field("operations", &self.operations.len())
            .finish()
    }
}

fn find_operation(operations: &[CcdOperation], id: u32) -> Result<&CcdOperation> {
    operations
        .iter()
        .find(|op| op.id == id)
        .ok_or(HostError::UnknownOperation(id))
}
