//! BrainClaw
//!
//! Streams a Muse headset's EEG, motion and telemetry notifications to a
//! WebSocket relay server as one JSON object per sample.
//!
//! # Usage
//!
//! ```bash
//! # Bridge to a relay on the local network
//! brainclaw run --host 192.168.1.20
//!
//! # Muse 2 with PPG enabled, verbose logging
//! brainclaw --log-level debug run --host 192.168.1.20 --preset p50
//!
//! # List nearby BLE devices and whether they look like a Muse
//! brainclaw scan
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use brainclaw_core::{LinkState, RelayQueue};
use brainclaw_embedded::{
    Bridge, BridgeConfig, NotificationHandler, RadioLink, StreamOrchestrator, TransportPump,
};
use brainclaw_native::{BleConfig, BtleplugRadio, SystemClock, WsConfig, WsTransport};

/// Shared between the radio's notification tasks and the scheduler thread
static RELAY: RelayQueue = RelayQueue::new();
static LINK: LinkState = LinkState::new();

/// Main loop yield between ticks
const TICK_YIELD: Duration = Duration::from_millis(1);

/// BrainClaw Muse bridge
#[derive(Parser, Debug)]
#[command(name = "brainclaw")]
#[command(author, version, about = "Muse BLE to WebSocket bridge", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bridge a Muse headset to the relay server
    Run(RunArgs),

    /// List nearby BLE devices
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Bluetooth adapter index
        #[arg(long, default_value = "0")]
        adapter: usize,

        /// Advertised-name substring that marks a Muse
        #[arg(long, default_value = "Muse")]
        name_filter: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Relay server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Relay server port
    #[arg(short, long, default_value = "8765")]
    port: u16,

    /// Request path
    #[arg(long, default_value = "/?role=producer")]
    path: String,

    /// WebSocket reconnect interval in milliseconds
    #[arg(long, default_value = "3000")]
    ws_reconnect_ms: u64,

    /// Advertised-name substring that marks a Muse
    #[arg(long, default_value = "Muse")]
    name_filter: String,

    /// Preset command sent before start (p20, p21, p50, ...)
    #[arg(long, default_value = "p21")]
    preset: String,

    /// BLE scan duration in milliseconds
    #[arg(long, default_value = "10000")]
    scan_ms: u64,

    /// Delay before reconnecting to a lost headset, in milliseconds
    #[arg(long, default_value = "2000")]
    reconnect_ms: u64,

    /// Bluetooth adapter index
    #[arg(long, default_value = "0")]
    adapter: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("BrainClaw v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run(args) => run_bridge(args),
        Commands::Scan { duration, adapter, name_filter } => {
            scan_devices(duration, adapter, &name_filter)
        }
    }
}

/// Run the bridge until Ctrl-C
fn run_bridge(args: RunArgs) -> anyhow::Result<()> {
    let runtime = Runtime::new()?;
    let handle = runtime.handle().clone();

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                shutdown.store(true, Ordering::Relaxed);
            }
        });
    }

    let ws_config = WsConfig {
        host: args.host,
        port: args.port,
        path: args.path,
        reconnect_interval: Duration::from_millis(args.ws_reconnect_ms),
        ..WsConfig::default()
    };
    let ble_config = BleConfig { adapter_index: args.adapter, ..BleConfig::default() };
    let mut bridge_config = BridgeConfig::default()
        .with_name_filter(&args.name_filter)
        .with_preset(&args.preset);
    bridge_config.scan_duration_ms = args.scan_ms;
    bridge_config.reconnect_delay_ms = args.reconnect_ms;

    if bridge_config.name_filter.len() < args.name_filter.len() {
        tracing::warn!("Name filter truncated to '{}'", bridge_config.name_filter);
    }

    // BLE calls block on the runtime, so the scheduler gets its own thread
    let worker = thread::Builder::new()
        .name("bridge".to_string())
        .spawn(move || -> anyhow::Result<()> {
            let handler = NotificationHandler::new(&RELAY, &LINK);
            let radio = BtleplugRadio::new(handle.clone(), ble_config, handler, &LINK)?;
            let transport = WsTransport::new(handle, &ws_config);

            let orchestrator = StreamOrchestrator::new(radio, SystemClock::new(), &LINK, bridge_config);
            let pump = TransportPump::new(transport, &RELAY, &LINK);
            let mut bridge = Bridge::new(orchestrator, pump);

            bridge.start(&ws_config.endpoint());
            while !shutdown.load(Ordering::Relaxed) {
                bridge.tick();
                thread::sleep(TICK_YIELD);
            }
            bridge.shutdown();

            let stats = bridge.pump_stats();
            info!(
                "Sent {} messages ({} discarded offline, {} send failures, {} dropped at relay)",
                stats.sent,
                stats.discarded,
                stats.send_failed,
                RELAY.stats().dropped
            );
            Ok(())
        })?;

    worker
        .join()
        .map_err(|_| anyhow::anyhow!("Bridge thread panicked"))??;
    Ok(())
}

/// List nearby BLE devices
fn scan_devices(duration: u64, adapter: usize, name_filter: &str) -> anyhow::Result<()> {
    let runtime = Runtime::new()?;
    let ble_config = BleConfig { adapter_index: adapter, ..BleConfig::default() };
    let handler = NotificationHandler::new(&RELAY, &LINK);
    let mut radio = BtleplugRadio::new(runtime.handle().clone(), ble_config, handler, &LINK)?;

    let results = radio.scan(duration.saturating_mul(1000))?;
    if results.is_empty() {
        println!("No devices found");
        return Ok(());
    }

    for adv in &results {
        let name = adv.name.as_ref().map_or("(unnamed)", |n| n.as_str());
        let rssi = adv.rssi.map_or_else(|| "?".to_string(), |r| r.to_string());
        let marker = if adv.is_muse(name_filter) { "*" } else { " " };
        println!("{marker} {name:<32} rssi {rssi:>4} dBm");
    }
    println!("\n* = Muse headset");
    Ok(())
}
