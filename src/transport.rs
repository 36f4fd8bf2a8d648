//! Serial transports feeding protocol lines into the processor
//!
//! One reader task per serial port. Bytes are buffered until a full
//! newline-terminated line is available; partial lines spanning a read
//! boundary are never parsed. Malformed lines are logged and dropped.
//! Lost connections are reopened with capped exponential backoff and never
//! disturb other connections or in-memory state.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortType, SerialStream};
use tracing::{debug, info, warn};

use crate::processor::ProcessorHandle;
use crate::protocol;

const RECONNECT_BASE: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(10);

/// USB descriptor fragments identifying the gesture controller boards.
const DEVICE_HINTS: &[&str] = &["micro:bit", "mbed", "daplink"];

/// Serial ports that look like connected controller boards.
pub fn autodetect_ports() -> Result<Vec<String>> {
    let mut found = Vec::new();
    for port in tokio_serial::available_ports().context("failed to enumerate serial ports")? {
        if let SerialPortType::UsbPort(usb) = &port.port_type {
            let desc = format!(
                "{} {}",
                usb.manufacturer.as_deref().unwrap_or(""),
                usb.product.as_deref().unwrap_or("")
            )
            .to_lowercase();
            if DEVICE_HINTS.iter().any(|hint| desc.contains(hint)) {
                found.push(port.port_name.clone());
            }
        }
    }
    Ok(found)
}

/// All serial ports with a short description, for `--list-ports`.
pub fn list_serial_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().context("failed to enumerate serial ports")?;
    Ok(ports
        .into_iter()
        .map(|port| match port.port_type {
            SerialPortType::UsbPort(usb) => format!(
                "{} ({} {})",
                port.port_name,
                usb.manufacturer.as_deref().unwrap_or("?"),
                usb.product.as_deref().unwrap_or("?")
            ),
            _ => port.port_name,
        })
        .collect())
}

/// Spawn the reader task for one port. Runs until aborted.
pub fn spawn_reader(port: String, baud: u32, handle: ProcessorHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = RECONNECT_BASE;
        loop {
            match SerialStream::open(&tokio_serial::new(&port, baud)) {
                Ok(stream) => {
                    info!("[{}] open at {} baud", port, baud);
                    backoff = RECONNECT_BASE;
                    if let Err(e) = pump_lines(&port, stream, &handle).await {
                        warn!("[{}] transport error: {:#}", port, e);
                    } else {
                        info!("[{}] stream ended", port);
                    }
                }
                Err(e) => {
                    warn!("[{}] open failed: {}", port, e);
                }
            }

            debug!("[{}] reopening in {:?}", port, backoff);
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(RECONNECT_MAX);
        }
    })
}

/// Read whole lines from the stream and forward the ones that parse.
async fn pump_lines(port: &str, stream: SerialStream, handle: &ProcessorHandle) -> Result<()> {
    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| format!("read failed on {}", port))?
    {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        match protocol::parse_line(text) {
            Ok(event) => handle.event(event),
            Err(e) => debug!("[{}] dropped line {:?}: {}", port, text, e),
        }
    }
    Ok(())
}
