//! Host driven against a simulated instrument that answers CCD requests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

use ccdlink_frame::{
    cobs, max_encoded_len, CcdRequest, CcdResult, DeviceLog, Payload, Reassembler, Severity,
    CHECKSUM_PLACEHOLDER,
};
use ccdlink_host::{
    Command, ConnectionState, Host, HostEvent, LogContext, LogHistory, MemoryStore, ResultStore,
};
use ccdlink_transport::DeviceIo;

/// Firmware stand-in: decodes request frames as they are written and
/// queues a log line plus a result for each.
#[derive(Default)]
struct Instrument {
    inbound: Reassembler,
    outbound: VecDeque<u8>,
    requests: Vec<(CcdRequest, u16)>,
    samples: Vec<u32>,
}

#[derive(Clone)]
struct Loopback(Rc<RefCell<Instrument>>);

impl Instrument {
    fn reply(&mut self, message: impl FnOnce(&mut Payload) -> ccdlink_frame::Result<()>) {
        let mut payload = Payload::with_capacity(4096);
        message(&mut payload).unwrap();
        let mut wire = vec![0u8; max_encoded_len(payload.len())];
        let n = cobs::encode(payload.as_slice(), &mut wire).unwrap();
        self.outbound.extend(&wire[..n]);
    }
}

impl Read for Loopback {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut device = self.0.borrow_mut();
        // Dribble out a few bytes per read to exercise reassembly.
        let n = buf.len().min(device.outbound.len()).min(7);
        for (slot, byte) in buf.iter_mut().zip(device.outbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for Loopback {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut device = self.0.borrow_mut();
        let mut frames = Vec::new();
        device
            .inbound
            .push(buf, &mut frames)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

        let mut decoded = Vec::new();
        for range in &frames {
            let encoded = device.inbound.frame(*range);
            let mut out = vec![0u8; encoded.len()];
            let n = cobs::decode(encoded, &mut out).unwrap();
            decoded.push(CcdRequest::decode(&out[..n]).unwrap());
        }
        if let Some(last) = frames.last() {
            let consumed = last.consumed_end();
            device.inbound.compact(consumed);
        }

        for (request, checksum) in decoded {
            let samples = device.samples.clone();
            device.reply(|p| {
                DeviceLog {
                    severity: Severity::Debug,
                    line: 12,
                    function: b"ccd_start",
                    message: b"integrating",
                }
                .serialize(p)
            });
            device.reply(|p| {
                CcdResult {
                    id: request.id,
                    iterations: request.iterations,
                    exposure: request.exposure,
                    samples,
                }
                .serialize(p)
            });
            device.requests.push((request, checksum));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn instrument(samples: Vec<u32>) -> Loopback {
    Loopback(Rc::new(RefCell::new(Instrument {
        inbound: Reassembler::with_capacity(256),
        samples,
        ..Instrument::default()
    })))
}

fn host_for(
    device: &Loopback,
) -> Host<
    impl FnMut(&str) -> ccdlink_transport::Result<Box<dyn DeviceIo>>,
    MemoryStore,
    LogHistory,
> {
    let device = device.clone();
    Host::new(
        move |_: &str| Ok(Box::new(device.clone()) as Box<dyn DeviceIo>),
        MemoryStore::new(),
        LogHistory::new(),
    )
}

fn tick_until<C, S, L>(host: &mut Host<C, S, L>, mut done: impl FnMut(&Host<C, S, L>) -> bool)
where
    C: ccdlink_transport::Connector,
    S: ResultStore,
    L: ccdlink_host::Logger,
{
    for _ in 0..100 {
        host.tick();
        if done(host) {
            return;
        }
    }
    panic!("condition not reached after 100 ticks");
}

#[test]
fn acquisition_roundtrip() {
    let device = instrument(vec![1, 2, 3]);
    let mut host = host_for(&device);

    host.enqueue(Command::load_all());
    host.enqueue(Command::ConnectToDevice("/dev/ttyACM0".into()));
    host.tick();
    assert_eq!(host.connection_state(), ConnectionState::Connected);

    host.enqueue(Command::StartCcdOperation {
        exposure: 100,
        iterations: 5,
    });
    tick_until(&mut host, |h| !h.operations().is_empty());

    let requests = device.0.borrow().requests.clone();
    assert_eq!(
        requests,
        vec![(
            CcdRequest {
                id: 1,
                iterations: 5,
                exposure: 100
            },
            CHECKSUM_PLACEHOLDER
        )]
    );

    let op = &host.operations()[0];
    assert_eq!(op.id, 1);
    assert_eq!(op.exposure, 100);
    assert_eq!(op.iterations, 5);
    assert_eq!(op.samples, vec![1, 2, 3]);
    assert_eq!(host.store().len(), 1);
    assert_eq!(host.pending_request(), None);
    assert_eq!(host.buffered_len(), 0);

    let events = host.take_events();
    assert_eq!(
        events,
        vec![
            HostEvent::TitleChanged("Connected to: /dev/ttyACM0".into()),
            HostEvent::ResultReceived(1),
        ]
    );

    let device_lines: Vec<_> = host
        .logger()
        .entries()
        .iter()
        .filter(|e| e.context == LogContext::Device)
        .collect();
    assert_eq!(device_lines.len(), 1);
    assert_eq!(device_lines[0].function, "ccd_start");
    assert_eq!(device_lines[0].message, "integrating");
}

#[test]
fn consecutive_acquisitions_use_fresh_ids() {
    let device = instrument((0..1000).collect());
    let mut host = host_for(&device);
    host.enqueue(Command::ConnectToDevice("/dev/ttyACM0".into()));
    host.tick();

    for expected in 1..=3u32 {
        host.enqueue(Command::StartCcdOperation {
            exposure: 10 * expected,
            iterations: 1,
        });
        tick_until(&mut host, |h| h.operations().len() == expected as usize);
    }

    let ids: Vec<u32> = host.operations().iter().map(|op| op.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(host.operations().iter().all(|op| op.samples.len() == 1000));
    assert_eq!(host.store().next_id().unwrap(), 4);
}

#[test]
fn stored_results_reload_after_restart() {
    let device = instrument(vec![5, 6]);
    let mut host = host_for(&device);
    host.enqueue(Command::ConnectToDevice("/dev/ttyACM0".into()));
    host.enqueue(Command::StartCcdOperation {
        exposure: 1,
        iterations: 1,
    });
    tick_until(&mut host, |h| h.operations().len() == 1);

    host.operation_mut(1).unwrap().name = "dark".into();
    host.enqueue(Command::UpdateOperationName(1));
    host.tick();

    let store = host.store().clone();
    let mut restarted = Host::new(
        |_: &str| -> ccdlink_transport::Result<Box<dyn DeviceIo>> {
            Err(ccdlink_transport::TransportError::EmptyPath)
        },
        store,
        LogHistory::new(),
    );
    restarted.enqueue(Command::load_all());
    restarted.tick();

    assert_eq!(restarted.operations().len(), 1);
    assert_eq!(restarted.operations()[0].name, "dark");
    assert_eq!(restarted.operations()[0].samples, vec![5, 6]);
}
