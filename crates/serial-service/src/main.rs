//! Serial service entry point.
//!
//! Bridges a device channel and one TCP client.  Bytes from the device go to
//! the client and bytes from the client go to the device, unchanged, until
//! the process receives SIGINT or SIGTERM.
//!
//! # Usage
//!
//! ```text
//! serial-service [OPTIONS]
//!
//! Options:
//!   --config <PATH>               TOML configuration file
//!   --listen-address <IP>         Interface listen address [default: 127.0.0.1]
//!   --listen-port <PORT>          Interface listen port [default: 10000]
//!   --channel <CHANNEL>           Device node or tcp://host:port [default: /dev/ttyUSB1]
//!   --baud-rate <BAUD>            Device line speed [default: 115200]
//!   --poll-interval-ms <MS>       Worker polling period [default: 100]
//!   --shutdown-grace-ms <MS>      Per-worker join budget at shutdown [default: 500]
//! ```
//!
//! # Precedence
//!
//! command-line flag > environment variable > config file > built-in default.
//!
//! | Variable                          | Flag                  |
//! |-----------------------------------|-----------------------|
//! | `SERIAL_SERVICE_CONFIG`           | `--config`            |
//! | `SERIAL_SERVICE_LISTEN_ADDRESS`   | `--listen-address`    |
//! | `SERIAL_SERVICE_LISTEN_PORT`      | `--listen-port`       |
//! | `SERIAL_SERVICE_CHANNEL`          | `--channel`           |
//! | `SERIAL_SERVICE_BAUD_RATE`        | `--baud-rate`         |
//! | `SERIAL_SERVICE_POLL_INTERVAL_MS` | `--poll-interval-ms`  |
//! | `SERIAL_SERVICE_SHUTDOWN_GRACE_MS`| `--shutdown-grace-ms` |
//!
//! # Exit status
//!
//! `0` after a signal-driven shutdown, `1` when start-up fails (bad config,
//! invalid address, port in use) or a fatal socket error stops the service.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use serial_service::application::{LifecycleController, ShutdownReport};
use serial_service::domain::ServiceConfig;
use serial_service::infrastructure::{load_config, spawn_signal_listener, transport_for_channel};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Relays raw bytes between a device channel and a single TCP client.
#[derive(Debug, Parser)]
#[command(
    name = "serial-service",
    about = "Bridges a byte-oriented device channel with a single TCP client",
    version
)]
struct Cli {
    /// TOML configuration file.  Flags below override its values.
    #[arg(long, env = "SERIAL_SERVICE_CONFIG")]
    config: Option<PathBuf>,

    /// IP address the interface listener binds to.
    #[arg(long, env = "SERIAL_SERVICE_LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// TCP port the interface listener binds to.
    #[arg(long, env = "SERIAL_SERVICE_LISTEN_PORT")]
    listen_port: Option<u16>,

    /// Device node path, or `tcp://host:port` for a controller emulator.
    #[arg(long, env = "SERIAL_SERVICE_CHANNEL")]
    channel: Option<String>,

    /// Device line speed.
    #[arg(long, env = "SERIAL_SERVICE_BAUD_RATE")]
    baud_rate: Option<u32>,

    /// Worker polling period in milliseconds.
    #[arg(long, env = "SERIAL_SERVICE_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// How long shutdown waits for each worker, in milliseconds.
    #[arg(long, env = "SERIAL_SERVICE_SHUTDOWN_GRACE_MS")]
    shutdown_grace_ms: Option<u64>,
}

impl Cli {
    /// Builds the effective [`ServiceConfig`]: file (or defaults), then flag
    /// overrides, then validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the merged
    /// values fail validation.
    fn into_service_config(self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => ServiceConfig::default(),
        };

        if let Some(address) = self.listen_address {
            config.interface.listen_address = address;
        }
        if let Some(port) = self.listen_port {
            config.interface.listen_port = port;
        }
        if let Some(channel) = self.channel {
            config.controller.channel = channel;
        }
        if let Some(baud_rate) = self.baud_rate {
            config.controller.baud_rate = baud_rate;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.runtime.poll_interval_ms = ms;
        }
        if let Some(ms) = self.shutdown_grace_ms {
            config.runtime.shutdown_grace_ms = ms;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI flags, environment variables and the optional config file are merged
///    into a [`ServiceConfig`].
/// 2. `tracing_subscriber` is initialised; `RUST_LOG` overrides the configured
///    level.
/// 3. A multi-threaded Tokio runtime is built and [`run`] is driven on it.
/// 4. The runtime is dropped with
///    [`shutdown_timeout`](tokio::runtime::Runtime::shutdown_timeout), so a
///    device read still blocked on the blocking pool is abandoned after the
///    grace period.
fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_service_config()?;

    // `RUST_LOG` wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.runtime.log_level)),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build the async runtime")?;

    let grace = config.shutdown_grace();
    let result = runtime.block_on(run(config));
    runtime.shutdown_timeout(grace);

    let report = result?;
    if !report.is_clean() {
        warn!(detached = ?report.detached, "some workers did not stop cleanly");
    }
    info!("serial service stopped");
    Ok(())
}

async fn run(config: ServiceConfig) -> anyhow::Result<ShutdownReport> {
    info!(
        listen = %format!("{}:{}", config.interface.listen_address, config.interface.listen_port),
        channel = %config.controller.channel,
        baud_rate = config.controller.baud_rate,
        "serial service starting"
    );

    let transport = transport_for_channel(&config.controller.channel);
    let controller =
        LifecycleController::start(config, transport).context("serial service failed to start")?;

    let signals =
        spawn_signal_listener(controller.exit_handle()).context("failed to install signal handlers")?;

    let outcome = controller.run().await;
    signals.abort();
    outcome.context("serial service stopped on a fatal error")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
