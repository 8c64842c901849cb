use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use ccdlink_frame::Severity;
use ccdlink_host::{Command, ConnectionState, Host, HostConfig, HostEvent, LogHistory, MemoryStore};
use ccdlink_transport::{SerialConfig, SerialConnector};
use tracing::info;

use crate::cmd::{parse_duration, RunArgs};
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT, TRANSPORT_ERROR};
use crate::output::{print_operation, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let tick_interval = parse_duration(&args.tick_interval)?;
    let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;

    let connector = SerialConnector::with_config(SerialConfig {
        baud_rate: args.baud,
        ..SerialConfig::default()
    });
    let config = HostConfig {
        max_pixel_count: args.max_pixel_count,
        ..HostConfig::default()
    };
    let mut host = Host::with_config(config, connector, MemoryStore::new(), LogHistory::new());

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    host.enqueue(Command::load_all());
    host.enqueue(Command::ConnectToDevice(args.port.clone()));
    // Sent once the connection is up.
    let mut start = args.exposure.map(|exposure| Command::StartCcdOperation {
        exposure,
        iterations: args.iterations,
    });

    let started = Instant::now();
    let mut received = 0usize;

    while running.load(Ordering::SeqCst) {
        host.tick();

        for event in host.take_events() {
            match event {
                HostEvent::TitleChanged(title) => {
                    info!(%title, "device ready");
                    if let Some(command) = start.take() {
                        host.enqueue(command);
                    }
                }
                HostEvent::ResultReceived(id) => {
                    if let Some(op) = host.operations().iter().find(|op| op.id == id) {
                        print_operation(op, format);
                    }
                    received += 1;
                }
            }
        }

        if host.connection_state() == ConnectionState::ConnectionError {
            let detail = last_error(&host).unwrap_or_else(|| "connection error".to_string());
            return Err(CliError::new(
                TRANSPORT_ERROR,
                format!("{}: {detail}", args.port),
            ));
        }

        if args.count.is_some_and(|count| received >= count) {
            return Ok(SUCCESS);
        }

        if let Some(timeout) = timeout {
            if received == 0 && started.elapsed() >= timeout {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no result from {} within {timeout:?}", args.port),
                ));
            }
        }

        thread::sleep(tick_interval);
    }

    info!(received, "interrupted");
    Ok(SUCCESS)
}

fn last_error(host: &Host<SerialConnector, MemoryStore, LogHistory>) -> Option<String> {
    host.logger()
        .entries()
        .iter()
        .rev()
        .find(|entry| entry.severity == Severity::Error)
        .map(|entry| entry.message.clone())
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
