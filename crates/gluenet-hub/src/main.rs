//! GlueNet hub: entry point.
//!
//! Accepts WebSocket connections from GlueNet peers and logs every session,
//! device and device event it sees.  Applications embed the library instead
//! and consume [`HubEvent`]s themselves.
//!
//! # Usage
//!
//! ```text
//! gluenet-hub [OPTIONS]
//!
//! Options:
//!   --config <PATH>        TOML configuration file
//!   --bind <IP>            Listener IP address [default: 0.0.0.0]
//!   --port <PORT>          Listener port [default: 8080]
//!   --max-sessions <N>     Concurrent session ceiling, at most 256 [default: 256]
//!   --log-level <FILTER>   Log filter when RUST_LOG is unset [default: info]
//!   --print-config         Print the effective configuration as TOML and exit
//! ```
//!
//! Precedence, highest first: command-line flag, environment variable, config
//! file, built-in default.
//!
//! | Variable               | Flag             |
//! |------------------------|------------------|
//! | `GLUENET_CONFIG`       | `--config`       |
//! | `GLUENET_BIND`         | `--bind`         |
//! | `GLUENET_PORT`         | `--port`         |
//! | `GLUENET_MAX_SESSIONS` | `--max-sessions` |
//! | `GLUENET_LOG_LEVEL`    | `--log-level`    |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gluenet_core::device::{DeviceEvent, DeviceRegistry};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use gluenet_hub::application::Hub;
use gluenet_hub::domain::{HubConfig, HubEvent};
use gluenet_hub::infrastructure::{load_config, run_server, FileConfig};

/// Upper bound on waiting for the last notifications to be logged.
const EVENT_DRAIN: Duration = Duration::from_secs(1);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// GlueNet device hub.
#[derive(Debug, Parser)]
#[command(
    name = "gluenet-hub",
    about = "Hub for GlueNet peers exposing virtual displays, pointers and keyboards",
    version
)]
struct Cli {
    /// TOML configuration file.  Flags override its values.
    #[arg(long, env = "GLUENET_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the WebSocket listener to.
    #[arg(long, env = "GLUENET_BIND")]
    bind: Option<IpAddr>,

    /// TCP port for the WebSocket listener.
    #[arg(long, env = "GLUENET_PORT")]
    port: Option<u16>,

    /// Maximum number of concurrent sessions (at most 256).
    #[arg(long, env = "GLUENET_MAX_SESSIONS")]
    max_sessions: Option<usize>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "GLUENET_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// Merges the config file (if any) and the flags into a [`HubConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the named config file cannot be read or parsed.
    fn into_hub_config(self) -> anyhow::Result<HubConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
                .to_hub_config()?,
            None => HubConfig::default(),
        };

        let ip = self.bind.unwrap_or_else(|| config.bind_addr.ip());
        let port = self.port.unwrap_or_else(|| config.bind_addr.port());
        config.bind_addr = SocketAddr::new(ip, port);
        if let Some(max) = self.max_sessions {
            config.max_sessions = max;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let print_config = cli.print_config;
    let config = cli.into_hub_config()?;

    if print_config {
        print!("{}", FileConfig::from(&config).to_toml()?);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "GlueNet hub starting: bind={}, max_sessions={}",
        config.bind_addr,
        config.session_ceiling()
    );

    let (hub, events) = Hub::new(&config, DeviceRegistry::with_builtin());
    let consumer = tokio::spawn(log_events(events));

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    //
    // Ctrl+C clears the flag; the accept loop notices within one poll interval.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Main server loop ──────────────────────────────────────────────────────
    //
    // Returns once the flag is cleared and every peer has been sent its 1001
    // close (or the grace period ran out).
    run_server(&config, Arc::clone(&hub), running).await?;

    // ── Drain notifications ───────────────────────────────────────────────────
    //
    // Shutdown queued a DeviceRemoved/SessionClosed batch.  Dropping the last
    // hub handle closes the channel, so the consumer ends after logging it.
    drop(hub);
    if timeout(EVENT_DRAIN, consumer).await.is_err() {
        warn!("event consumer still busy after {EVENT_DRAIN:?}; exiting anyway");
    }

    info!("GlueNet hub stopped");
    Ok(())
}

/// Logs every hub notification.
async fn log_events(mut events: mpsc::UnboundedReceiver<HubEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            HubEvent::SessionConnected {
                sid,
                peer,
                connection_id,
            } => info!("peer {peer} connected as session#{sid} ({connection_id})"),
            HubEvent::SessionClosed { sid, .. } => info!("session#{sid} gone"),
            HubEvent::DeviceAdded { sid, device } => {
                info!("session#{sid}: {} #{} available", device.kind(), device.id());
            }
            HubEvent::DeviceRemoved { sid, device } => {
                info!("session#{sid}: {} #{} gone", device.kind(), device.id());
            }
            HubEvent::Device { sid, did, event } => match event {
                DeviceEvent::Display(e) => info!("session#{sid} display#{did}: {e:?}"),
                other => debug!("session#{sid} device#{did}: {other:?}"),
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
