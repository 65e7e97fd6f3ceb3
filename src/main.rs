mod aggregator;
mod backends;
mod classifier;
mod config;
mod counters;
mod monitor;
mod socket;

use anyhow::{Result, bail};
use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::signal;
use tokio::time::interval;

use crate::aggregator::RateAggregator;
use crate::config::Config;
use crate::counters::ByteCounters;
use crate::monitor::NetworkMonitor;

/// Wirewatch - live bandwidth monitoring with connection attribution
#[derive(Parser, Debug)]
#[command(name = "wirewatch")]
#[command(version = "0.1.0")]
#[command(about = "Live interface bandwidth plus best-effort connection-to-process snapshots", long_about = None)]
struct Args {
    /// Network interface device name
    #[arg(short, long, value_name = "DEVICE")]
    interface: Option<String>,

    /// Aggregation interval in milliseconds
    #[arg(long, value_name = "MILLIS")]
    interval: Option<u64>,

    /// Print a snapshot of established TCP connections and exit
    #[arg(long)]
    connections: bool,

    /// Save the chosen interface and interval as defaults
    #[arg(long)]
    save_config: bool,
}

/// One-shot snapshot mode: enumerate established connections and their
/// owning processes, independent of the capture loop.
fn print_connections() -> Result<()> {
    let enumerator = backends::create_enumerator()?;
    log::info!("enumerating connections via {} backend", enumerator.name());

    let connections = enumerator.list_connections()?;
    if connections.is_empty() {
        println!("No established connections.");
        return Ok(());
    }

    for connection in connections {
        println!("{}", connection);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if std::env::var("RUST_LOG").is_ok() {
        pretty_env_logger::formatted_builder()
            .parse_default_env()
            .init();
    }

    if args.connections {
        return print_connections();
    }

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("ignoring unreadable config: {}", e);
        Config::default()
    });

    let Some(device) = args.interface.or(config.interface) else {
        bail!("no interface given; pass --interface or save one with --save-config");
    };
    let interval_ms = args.interval.or(config.interval_ms).unwrap_or(500);
    if interval_ms == 0 {
        bail!("interval must be at least 1 millisecond");
    }

    if args.save_config {
        Config {
            interface: Some(device.clone()),
            interval_ms: Some(interval_ms),
        }
        .save()?;
    }

    // Resolve the local identity once; it is fixed for the process lifetime.
    let interface = monitor::find_interface(&device)?;
    let identity = monitor::resolve_identity(&interface)?;

    println!("Chosen device's IPv4:\t{}", identity.ipv4);
    println!("Chosen device's MAC:\t{}", identity.mac);

    let counters = Arc::new(ByteCounters::new());
    let stop = Arc::new(AtomicBool::new(false));
    let tick = Duration::from_millis(interval_ms);

    let capture = NetworkMonitor::start(
        interface,
        identity,
        Arc::clone(&counters),
        Arc::clone(&stop),
    )?;

    let aggregator = RateAggregator::new(Arc::clone(&counters), tick);
    let mut ticker = interval(tick);
    ticker.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                println!("{}", aggregator.tick());
            }
            _ = signal::ctrl_c() => {
                log::info!("received quit signal, shutting down");
                stop.store(true, Ordering::Relaxed);
                break;
            }
        }
    }

    capture.shutdown();
    Ok(())
}
