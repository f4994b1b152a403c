//! The four relay workers.
//!
//! # Data flow
//!
//! ```text
//!   device ──▶ ControllerRx ──▶ [to_interface]  ──▶ InterfaceTx ──▶ client
//!   device ◀── ControllerTx ◀── [to_controller] ◀── InterfaceRx ◀── client
//! ```
//!
//! Each worker is a Tokio task that wakes once per poll interval and runs one
//! *step*.  A step does at most one I/O call and moves at most one frame.
//!
//! | Worker       | Skips when                                      | I/O                |
//! |--------------|-------------------------------------------------|--------------------|
//! | ControllerRx | `to_interface` occupied                         | device receive     |
//! | ControllerTx | `to_controller` empty                           | device send        |
//! | InterfaceRx  | client disconnected or `to_controller` occupied | socket read        |
//! | InterfaceTx  | `to_interface` empty                            | socket write       |
//!
//! Both write-side workers clear their mailbox before writing, whatever the
//! write returns.  With no client attached InterfaceTx discards the frame, so
//! the device keeps being read and a new client only sees data produced after
//! it connected.
//!
//! # Cancellation
//!
//! Every await in a worker is raced against the worker token.  Device calls
//! run on the blocking pool; a cancelled worker stops waiting for them and the
//! blocking call finishes on its own.
//!
//! # Failure policy
//!
//! Device failures and socket write failures are logged and the worker keeps
//! running.  A socket read failure other than a peer close is reported on the
//! fatal channel and the worker stops.

use std::sync::Arc;
use std::time::Duration;

use serial_core::{ClientStatus, Frame, Mailbox, StatusCell, WorkerTask};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::application::error::ServiceError;
use crate::infrastructure::device_channel::DeviceChannel;
use crate::infrastructure::socket_channel::{ReadOutcome, SocketChannel, SocketError};

// ── Shared state ──────────────────────────────────────────────────────────────

/// The two single-slot mailboxes between the device and the client.
pub struct Mailboxes {
    /// Filled by ControllerRx, drained by InterfaceTx.
    pub to_interface: Mailbox,
    /// Filled by InterfaceRx, drained by ControllerTx.
    pub to_controller: Mailbox,
}

impl Mailboxes {
    pub fn new() -> Self {
        Self {
            to_interface: Mailbox::new("to-interface"),
            to_controller: Mailbox::new("to-controller"),
        }
    }
}

impl Default for Mailboxes {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a worker step touches.  Cheap to clone.
#[derive(Clone)]
pub struct RelayContext {
    pub mailboxes: Arc<Mailboxes>,
    pub device: Arc<DeviceChannel>,
    pub socket: Arc<SocketChannel>,
    pub client: Arc<StatusCell<ClientStatus>>,
}

/// What one step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Preconditions not met; no I/O was attempted.
    Skipped,
    /// I/O was attempted but produced nothing to relay.
    Idle,
    /// A frame moved one hop.
    Relayed,
    /// A frame was read but its mailbox was already full.
    Dropped,
    /// A frame was taken from its mailbox but the write failed.
    WriteFailed,
    /// The client closed its end; the client status is now Disconnected.
    PeerClosed,
}

// ── Steps ─────────────────────────────────────────────────────────────────────

/// ControllerRx: device → `to_interface`.
pub async fn controller_rx_step(ctx: &RelayContext) -> StepOutcome {
    if ctx.mailboxes.to_interface.is_occupied() {
        return StepOutcome::Skipped;
    }

    let device = Arc::clone(&ctx.device);
    let received = match tokio::task::spawn_blocking(move || device.receive_once()).await {
        Ok(received) => received,
        Err(e) => {
            error!(error = %e, "device receive task failed");
            return StepOutcome::Idle;
        }
    };

    match received {
        Ok(frame) => {
            info!(bytes = frame.len(), payload = %frame, "received from controller");
            deposit(&ctx.mailboxes.to_interface, &frame)
        }
        Err(e) if e.is_idle() => {
            trace!(reason = %e, "no data from controller");
            StepOutcome::Idle
        }
        Err(e) => {
            warn!(error = %e, "controller receive failed");
            StepOutcome::Idle
        }
    }
}

/// ControllerTx: `to_controller` → device.
///
/// The frame is consumed before the send, so a failed send loses it.
pub async fn controller_tx_step(ctx: &RelayContext) -> StepOutcome {
    let Some(frame) = ctx.mailboxes.to_controller.try_consume() else {
        return StepOutcome::Skipped;
    };

    let device = Arc::clone(&ctx.device);
    let sent = match tokio::task::spawn_blocking(move || device.send_once(&frame)).await {
        Ok(sent) => sent,
        Err(e) => {
            error!(error = %e, "device send task failed");
            return StepOutcome::WriteFailed;
        }
    };

    match sent {
        Ok(written) => {
            info!(bytes = written, payload = %frame, "sent to controller");
            StepOutcome::Relayed
        }
        Err(e) => {
            warn!(error = %e, bytes = frame.len(), "controller send failed; frame discarded");
            StepOutcome::WriteFailed
        }
    }
}

/// InterfaceRx: client → `to_controller`.
///
/// # Errors
///
/// [`SocketError::Read`] for read failures other than a peer close.
pub async fn interface_rx_step(ctx: &RelayContext) -> Result<StepOutcome, SocketError> {
    if !ctx.client.is(ClientStatus::Connected) || ctx.mailboxes.to_controller.is_occupied() {
        return Ok(StepOutcome::Skipped);
    }

    match ctx.socket.read_once().await? {
        ReadOutcome::Data(frame) => {
            info!(bytes = frame.len(), payload = %frame, "received from interface");
            Ok(deposit(&ctx.mailboxes.to_controller, &frame))
        }
        ReadOutcome::PeerClosed => {
            ctx.client.set(ClientStatus::Disconnected);
            info!("interface client disconnected");
            Ok(StepOutcome::PeerClosed)
        }
        ReadOutcome::NotConnected => Ok(StepOutcome::Skipped),
    }
}

/// InterfaceTx: `to_interface` → client.
///
/// The frame is consumed before the write.  With no client attached the
/// write fails and the frame is discarded, so device data never waits for a
/// future client.
pub async fn interface_tx_step(ctx: &RelayContext) -> StepOutcome {
    let Some(frame) = ctx.mailboxes.to_interface.try_consume() else {
        return StepOutcome::Skipped;
    };

    match ctx.socket.write_once(&frame).await {
        Ok(written) => {
            info!(bytes = written, payload = %frame, "sent to interface");
            StepOutcome::Relayed
        }
        Err(SocketError::NotConnected) => {
            debug!(bytes = frame.len(), payload = %frame, "no interface client; frame discarded");
            StepOutcome::WriteFailed
        }
        Err(e) => {
            warn!(error = %e, bytes = frame.len(), "interface send failed; frame discarded");
            StepOutcome::WriteFailed
        }
    }
}

fn deposit(mailbox: &Mailbox, frame: &Frame) -> StepOutcome {
    if mailbox.try_deposit(frame) {
        StepOutcome::Relayed
    } else {
        warn!(
            mailbox = mailbox.name(),
            bytes = frame.len(),
            "mailbox occupied; frame dropped"
        );
        StepOutcome::Dropped
    }
}

async fn run_step(task: WorkerTask, ctx: &RelayContext) -> Result<StepOutcome, ServiceError> {
    let outcome = match task {
        WorkerTask::ControllerRx => controller_rx_step(ctx).await,
        WorkerTask::ControllerTx => controller_tx_step(ctx).await,
        WorkerTask::InterfaceRx => interface_rx_step(ctx).await?,
        WorkerTask::InterfaceTx => interface_tx_step(ctx).await,
    };
    Ok(outcome)
}

// ── Worker loop ───────────────────────────────────────────────────────────────

async fn run_worker(
    task: WorkerTask,
    ctx: RelayContext,
    period: Duration,
    cancel: CancellationToken,
    fatal_tx: mpsc::Sender<ServiceError>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(worker = %task, "worker started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = run_step(task, &ctx) => result,
        };

        if let Err(e) = result {
            error!(worker = %task, error = %e, "worker stopped on fatal error");
            // The receiver is gone only if the lifecycle already stopped.
            let _ = fatal_tx.send(e).await;
            break;
        }
    }

    debug!(worker = %task, "worker stopped");
}

// ── Worker set ────────────────────────────────────────────────────────────────

/// How the workers ended during shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Joined within the grace period.
    pub stopped: Vec<WorkerTask>,
    /// Still running after the grace period and left behind.
    pub detached: Vec<WorkerTask>,
    /// Ended by a panic.
    pub panicked: Vec<WorkerTask>,
}

impl ShutdownReport {
    /// Every worker joined normally.
    pub fn is_clean(&self) -> bool {
        self.detached.is_empty() && self.panicked.is_empty()
    }
}

/// The four running workers and the token that stops them.
pub struct WorkerSet {
    cancel: CancellationToken,
    handles: Vec<(WorkerTask, JoinHandle<()>)>,
}

impl WorkerSet {
    /// Spawns one task per [`WorkerTask`] on the current runtime.
    pub fn spawn(ctx: RelayContext, period: Duration, fatal_tx: mpsc::Sender<ServiceError>) -> Self {
        let cancel = CancellationToken::new();
        let handles = WorkerTask::ALL
            .iter()
            .map(|&task| {
                let handle = tokio::spawn(run_worker(
                    task,
                    ctx.clone(),
                    period,
                    cancel.child_token(),
                    fatal_tx.clone(),
                ));
                (task, handle)
            })
            .collect();

        info!(count = WorkerTask::ALL.len(), ?period, "relay workers started");
        Self { cancel, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancels every worker and joins each one, waiting at most `grace` per
    /// worker.  Workers that miss the deadline are detached.
    pub async fn shutdown(self, grace: Duration) -> ShutdownReport {
        self.cancel.cancel();

        let mut report = ShutdownReport::default();
        for (task, handle) in self.handles {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(())) => {
                    debug!(worker = %task, "worker joined");
                    report.stopped.push(task);
                }
                Ok(Err(e)) => {
                    error!(worker = %task, error = %e, "worker ended abnormally");
                    report.panicked.push(task);
                }
                Err(_) => {
                    warn!(worker = %task, ?grace, "worker did not stop in time; detaching");
                    report.detached.push(task);
                }
            }
        }
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
