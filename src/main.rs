//! Glove Bridge binary
//!
//! Wires the serial transports, the processor actor, and the MIDI sink
//! together and runs until interrupted.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glove_bridge::config::AppConfig;
use glove_bridge::engine::Engine;
use glove_bridge::midi::{self, MidirSink};
use glove_bridge::processor::ProcessorActor;
use glove_bridge::transport;

/// Glove Bridge - translate gesture controller streams into MIDI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available serial and MIDI output ports
    #[arg(long)]
    list_ports: bool,

    /// Serial port to read, overriding the config (repeatable)
    #[arg(long = "port")]
    ports: Vec<String>,

    /// Serial baud rate override
    #[arg(long)]
    baud: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        list_ports()?;
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(&args.config).await?;
    if !args.ports.is_empty() {
        config.serial.ports = args.ports.clone();
    }
    if let Some(baud) = args.baud {
        config.serial.baud = baud;
    }

    let ports = if config.serial.ports.is_empty() {
        transport::autodetect_ports()?
    } else {
        config.serial.ports.clone()
    };
    if ports.is_empty() {
        anyhow::bail!("no serial ports configured and none auto-detected; try --list-ports");
    }
    info!("Reading glove streams from: {:?}", ports);

    let sink = MidirSink::open(&config.midi.output_port, config.midi.channel)?;
    let engine = Engine::new(config.engine);
    let (processor, processor_join) = ProcessorActor::spawn(engine, Box::new(sink));

    let readers: Vec<_> = ports
        .into_iter()
        .map(|port| transport::spawn_reader(port, config.serial.baud, processor.clone()))
        .collect();

    info!("Bridge running. Ctrl+C to exit.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    for reader in &readers {
        reader.abort();
    }
    processor.shutdown();
    processor_join.await?;

    info!("Glove bridge shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

fn list_ports() -> Result<()> {
    println!("Serial ports:");
    let serial = transport::list_serial_ports()?;
    if serial.is_empty() {
        println!("  (none)");
    }
    for port in serial {
        println!("  {}", port);
    }

    println!("\nMIDI output ports:");
    let outputs = midi::list_output_ports()?;
    if outputs.is_empty() {
        println!("  (none)");
    }
    for port in outputs {
        println!("  {}", port);
    }

    Ok(())
}
