use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{error, info};

use dfu_core::{
    Notification, NotificationKey, ResultKey, SessionRegistry, SimulatedTransport,
    SimulatedTransportConfig, UpdateConfig, UpdateObserver, UpdateSession,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "DFU update orchestrator (simulated transport)", long_about = None)]
struct Args {
    /// Path to the firmware package (ZIP)
    #[arg(long)]
    firmware: Option<String>,

    /// Target device identifier
    #[arg(long)]
    device: Option<String>,

    /// Advertise a unique device name while the device is in update mode
    #[arg(long)]
    unique_name: bool,

    /// Load session settings from a TOML file instead of flags
    #[arg(long)]
    config: Option<String>,

    /// Number of image parts the simulator reports
    #[arg(long, default_value_t = 1)]
    parts: i32,

    /// Simulated chunk size in bytes
    #[arg(long, default_value_t = 4096)]
    chunk_size: u64,

    /// Pause between simulated chunks, in milliseconds
    #[arg(long, default_value_t = 5)]
    chunk_interval_ms: u64,

    /// Inject a transport failure after this many chunks
    #[arg(long)]
    fail_after: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Prints every notification and the terminal result as `<key> <json>`
/// lines, then signals the main thread with the outcome.
struct JsonLineObserver {
    done: mpsc::Sender<bool>,
}

impl UpdateObserver for JsonLineObserver {
    fn on_notification(&self, key: &NotificationKey, payload: &Notification) {
        if let Ok(line) = serde_json::to_string(payload) {
            println!("{key} {line}");
        }
    }

    fn on_result(&self, key: &ResultKey, success: bool, message: &str) {
        let line = serde_json::json!({ "success": success, "message": message });
        println!("{key} {line}");
        let _ = self.done.send(success);
    }
}

fn build_config(args: &Args) -> Result<UpdateConfig> {
    if let Some(path) = &args.config {
        return UpdateConfig::load_from_file(path)
            .with_context(|| format!("loading config from {path}"));
    }
    let Some(firmware_path) = args.firmware.clone() else {
        bail!("either --config or --firmware is required");
    };
    let Some(device_id) = args.device.clone() else {
        bail!("either --config or --device is required");
    };
    Ok(UpdateConfig {
        firmware_path,
        device_id,
        unique_device_name_in_dfu_mode: args.unique_name,
    })
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid arguments: {e:#}");
            std::process::exit(2);
        }
    };

    let transport = SimulatedTransport::new(SimulatedTransportConfig {
        parts: args.parts,
        chunk_size: args.chunk_size,
        chunk_interval: Duration::from_millis(args.chunk_interval_ms),
        fail_after_chunks: args.fail_after,
    });

    let (tx, rx) = mpsc::channel();
    let observer = Arc::new(JsonLineObserver { done: tx });
    let registry = Arc::new(SessionRegistry::new());
    let session = UpdateSession::from_config(transport, &config, observer, registry);

    info!(device = %session.device(), firmware = %config.firmware_path, "Starting update");

    if let Err(e) = session.start() {
        // The terminal result has already been delivered on the result
        // channel; the error here carries the setup detail.
        error!("Update did not start: {e}");
        std::process::exit(1);
    }

    let success = rx.recv().unwrap_or(false);
    std::process::exit(if success { 0 } else { 1 });
}
