use std::io::IsTerminal;

use ccdlink_host::CcdOperation;
use ccdlink_transport::PortInfo;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Samples shown inline before the preview is cut short.
const SAMPLE_PREVIEW: usize = 8;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print one JSON document per line.
pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    path: &'a str,
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|port| PortOutput {
                    name: &port.friendly_name,
                    path: &port.path,
                })
                .collect();
            print_json(&out);
        }
        OutputFormat::Table => print_table(
            &["NAME", "PATH"],
            ports
                .iter()
                .map(|port| vec![port.friendly_name.clone(), port.path.clone()])
                .collect(),
        ),
        OutputFormat::Pretty => {
            for port in ports {
                println!("{} ({})", port.path, port.friendly_name);
            }
        }
    }
}

pub fn print_operation(op: &CcdOperation, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(op),
        OutputFormat::Table => print_table(
            &["ID", "TIMESTAMP", "EXPOSURE_US", "ITERATIONS", "PIXELS", "SAMPLES"],
            vec![vec![
                op.id.to_string(),
                op.timestamp.to_string(),
                op.exposure.to_string(),
                op.iterations.to_string(),
                op.samples.len().to_string(),
                sample_preview(&op.samples),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "result id={} exposure={}us iterations={} pixels={} samples={}",
            op.id,
            op.exposure,
            op.iterations,
            op.samples.len(),
            sample_preview(&op.samples)
        ),
    }
}

pub fn sample_preview(samples: &[u32]) -> String {
    let shown: Vec<String> = samples
        .iter()
        .take(SAMPLE_PREVIEW)
        .map(u32::to_string)
        .collect();
    if samples.len() > SAMPLE_PREVIEW {
        format!("[{}, ... +{}]", shown.join(", "), samples.len() - SAMPLE_PREVIEW)
    } else {
        format!("[{}]", shown.join(", "))
    }
}
