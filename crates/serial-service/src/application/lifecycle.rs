//! Service lifecycle: start-up, the accept/supervise loop, and teardown.
//!
//! # State machine
//!
//! ```text
//!            start()
//!              │  open device (failure → degraded, not fatal)
//!              │  bind listener (failure → Err, nothing spawned)
//!              ▼
//!   ┌──── run(): spawn 4 workers ────────────────────────────┐
//!   │                                                        │
//!   │   Running ── accept ──▶ client Connected               │
//!   │      ▲                      │ poll every interval      │
//!   │      │                      ▼                          │
//!   │      └── close conn ◀── client Disconnected            │
//!   │                                                        │
//!   └── exit requested / fatal worker error ──▶ Exiting ─────┘
//!                                                 │
//!                                   teardown: cancel + join workers,
//!                                   close device, close connection
//! ```
//!
//! The workers are spawned once and keep running across reconnects.  The
//! lifecycle only watches the shared client status; InterfaceRx is the one
//! that flips it to Disconnected when the peer goes away.
//!
//! An exit request comes from an [`ExitHandle`], normally held by the signal
//! listener.  It flips the system status to Exiting exactly once and wakes the
//! lifecycle wherever it is waiting, including inside `accept`.

use std::net::SocketAddr;
use std::sync::Arc;

use serial_core::{ClientStatus, DeviceTransport, StatusCell, SystemStatus, WorkerTask};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::error::ServiceError;
use crate::application::workers::{Mailboxes, RelayContext, ShutdownReport, WorkerSet};
use crate::domain::ServiceConfig;
use crate::infrastructure::device_channel::DeviceChannel;
use crate::infrastructure::socket_channel::SocketChannel;

// ── Exit handle ───────────────────────────────────────────────────────────────

/// Cloneable trigger for a graceful shutdown.
#[derive(Clone)]
pub struct ExitHandle {
    system: Arc<StatusCell<SystemStatus>>,
    exit: CancellationToken,
}

impl ExitHandle {
    /// Moves the service from Running to Exiting and wakes the lifecycle.
    ///
    /// Returns `true` for the call that performed the transition and `false`
    /// for every later call.
    pub fn request_exit(&self, reason: &str) -> bool {
        let first = self
            .system
            .transition(SystemStatus::Running, SystemStatus::Exiting);
        if first {
            info!(reason, "exit requested");
        } else {
            debug!(reason, "exit already in progress");
        }
        self.exit.cancel();
        first
    }

    pub fn is_exit_requested(&self) -> bool {
        self.system.is(SystemStatus::Exiting)
    }
}

// ── Status monitor ────────────────────────────────────────────────────────────

/// Read-only view of the shared state, usable while [`LifecycleController::run`]
/// owns the controller.
#[derive(Clone)]
pub struct StatusMonitor {
    system: Arc<StatusCell<SystemStatus>>,
    client: Arc<StatusCell<ClientStatus>>,
    mailboxes: Arc<Mailboxes>,
}

impl StatusMonitor {
    pub fn system(&self) -> SystemStatus {
        self.system.get()
    }

    pub fn client(&self) -> ClientStatus {
        self.client.get()
    }

    pub fn mailboxes(&self) -> &Mailboxes {
        &self.mailboxes
    }
}

// ── Lifecycle controller ──────────────────────────────────────────────────────

enum ConnectionEnd {
    ClientLeft,
    Exit,
}

pub struct LifecycleController {
    config: ServiceConfig,
    system: Arc<StatusCell<SystemStatus>>,
    client: Arc<StatusCell<ClientStatus>>,
    exit: CancellationToken,
    mailboxes: Arc<Mailboxes>,
    device: Arc<DeviceChannel>,
    socket: Arc<SocketChannel>,
}

impl LifecycleController {
    /// Opens the device channel and binds the listener.
    ///
    /// Must be called from within a Tokio runtime.  The device open may block
    /// briefly (e.g. connecting to an emulator).
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Config`] if `config` fails validation.
    /// - [`ServiceError::Socket`] if the listen address is invalid or the
    ///   bind fails.  The device channel is closed again before returning.
    pub fn start(
        config: ServiceConfig,
        transport: Arc<dyn DeviceTransport>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;

        let device = Arc::new(DeviceChannel::open(transport, &config.controller));

        let interface = &config.interface;
        let socket = match SocketChannel::bind(
            &interface.listen_address,
            interface.listen_port,
            interface.backlog,
        ) {
            Ok(socket) => Arc::new(socket),
            Err(e) => {
                device.close();
                return Err(e.into());
            }
        };

        Ok(Self {
            config,
            system: Arc::new(StatusCell::new(SystemStatus::Running)),
            client: Arc::new(StatusCell::new(ClientStatus::Disconnected)),
            exit: CancellationToken::new(),
            mailboxes: Arc::new(Mailboxes::new()),
            device,
            socket,
        })
    }

    pub fn exit_handle(&self) -> ExitHandle {
        ExitHandle {
            system: Arc::clone(&self.system),
            exit: self.exit.clone(),
        }
    }

    pub fn monitor(&self) -> StatusMonitor {
        StatusMonitor {
            system: Arc::clone(&self.system),
            client: Arc::clone(&self.client),
            mailboxes: Arc::clone(&self.mailboxes),
        }
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }

    pub fn is_device_available(&self) -> bool {
        self.device.is_available()
    }

    /// Spawns the workers and serves clients until an exit request or a
    /// fatal worker error, then tears everything down.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Socket`] if `accept` fails or a worker hits a fatal
    /// socket read error.  Teardown has completed by the time the error is
    /// returned.
    pub async fn run(self) -> Result<ShutdownReport, ServiceError> {
        let (fatal_tx, fatal_rx) = mpsc::channel(WorkerTask::ALL.len());
        let (report, served) = self.run_with(fatal_tx, fatal_rx).await;
        served.map(|()| report)
    }

    /// Body of [`run`](Self::run) with the fatal channel supplied by the
    /// caller.  The report is returned on both paths.
    async fn run_with(
        self,
        fatal_tx: mpsc::Sender<ServiceError>,
        mut fatal_rx: mpsc::Receiver<ServiceError>,
    ) -> (ShutdownReport, Result<(), ServiceError>) {
        let workers = WorkerSet::spawn(self.relay_context(), self.config.poll_interval(), fatal_tx);
        info!(address = %self.socket.local_addr(), "serial service running");

        let served = self.serve(&mut fatal_rx).await;
        let report = self.teardown(workers).await;
        (report, served)
    }

    fn relay_context(&self) -> RelayContext {
        RelayContext {
            mailboxes: Arc::clone(&self.mailboxes),
            device: Arc::clone(&self.device),
            socket: Arc::clone(&self.socket),
            client: Arc::clone(&self.client),
        }
    }

    /// Outer loop: one iteration per client connection.
    async fn serve(&self, fatal_rx: &mut mpsc::Receiver<ServiceError>) -> Result<(), ServiceError> {
        while self.system.is(SystemStatus::Running) {
            info!("waiting for interface client");
            let peer = tokio::select! {
                biased;
                _ = self.exit.cancelled() => break,
                Some(e) = fatal_rx.recv() => return Err(e),
                accepted = self.socket.accept_next() => accepted?,
            };
            self.client.set(ClientStatus::Connected);

            match self.supervise_connection(fatal_rx).await? {
                ConnectionEnd::ClientLeft => {
                    self.socket.close_connection().await;
                    debug!(peer = %peer, "ready for the next client");
                }
                ConnectionEnd::Exit => break,
            }
        }
        Ok(())
    }

    /// Inner loop: polls the shared status once per interval while a client
    /// is attached.
    async fn supervise_connection(
        &self,
        fatal_rx: &mut mpsc::Receiver<ServiceError>,
    ) -> Result<ConnectionEnd, ServiceError> {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.exit.cancelled() => return Ok(ConnectionEnd::Exit),
                Some(e) = fatal_rx.recv() => return Err(e),
                _ = ticker.tick() => {}
            }

            if self.system.is(SystemStatus::Exiting) {
                return Ok(ConnectionEnd::Exit);
            }
            if self.client.is(ClientStatus::Disconnected) {
                return Ok(ConnectionEnd::ClientLeft);
            }
        }
    }

    async fn teardown(&self, workers: WorkerSet) -> ShutdownReport {
        // Also covers the fatal-error path, where no exit was requested.
        self.system
            .transition(SystemStatus::Running, SystemStatus::Exiting);
        info!("shutting down");

        let report = workers.shutdown(self.config.shutdown_grace()).await;
        self.device.close();
        self.socket.close_connection().await;
        self.client.set(ClientStatus::Disconnected);

        if report.is_clean() {
            info!(stopped = report.stopped.len(), "serial service closed");
        } else {
            warn!(
                stopped = report.stopped.len(),
                detached = ?report.detached,
                panicked = ?report.panicked,
                "serial service closed with workers left behind"
            );
        }
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
