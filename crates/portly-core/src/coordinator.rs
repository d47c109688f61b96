// ── Coordinator ──
//
// Full lifecycle management for one switch: background polling, the
// write queue, health tracking and reactive snapshot streaming through
// the StateCache. All device traffic goes through one SessionManager.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::Utc;
use portly_api::{BatchExecutor, Connector, ReadCommand, SessionManager, SshConnector, WriteOp};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{CommandEnvelope, PendingCommand, RetryPolicy, WriteOutcome};
use crate::config::CoordinatorConfig;
use crate::convert::{self, Readings};
use crate::error::CoreError;
use crate::events::CoordinatorEvent;
use crate::health::{HealthDetector, Transition};
use crate::model::{ConnectivityState, FailureCause, PoeDelivery, PoeStatus, Port, PortMode, Snapshot};
use crate::scheduler;
use crate::store::StateCache;
use crate::stream::SnapshotStream;

const COMMAND_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 256;

// ── PortView ─────────────────────────────────────────────────────

/// One port as consumers see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortView {
    pub port: Port,
    pub poe: PoeStatus,
    pub mode: PortMode,
}

impl PortView {
    fn from_snapshot(snapshot: &Snapshot, index: u16) -> Option<Self> {
        Some(Self {
            port: snapshot.port(index)?.clone(),
            poe: snapshot.poe(index)?.clone(),
            mode: snapshot.port_mode(index)?,
        })
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Reads are served from
/// the cache and never touch the switch; writes are queued and applied
/// one at a time.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    sessions: SessionManager,
    executor: BatchExecutor,
    cache: StateCache,
    health: std::sync::Mutex<HealthDetector>,
    connectivity: watch::Sender<ConnectivityState>,
    event_tx: broadcast::Sender<Arc<CoordinatorEvent>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator that talks to the switch over SSH.
    /// Does NOT connect -- call [`start()`](Self::start) to begin polling.
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let connector = Arc::new(SshConnector::new(config.transport.clone()));
        Self::with_connector(config, connector)
    }

    /// Create a coordinator over any [`Connector`].
    pub fn with_connector(
        config: CoordinatorConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let (connectivity, _) = watch::channel(ConnectivityState::default());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                sessions: SessionManager::new(connector, config.acquire_timeout),
                executor: BatchExecutor::new(config.command_timeout, config.batch_timeout),
                cache: StateCache::new(config.activity_threshold_bytes),
                health: std::sync::Mutex::new(HealthDetector::new(config.offline_threshold)),
                connectivity,
                event_tx,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                config,
            }),
        })
    }

    /// Access the coordinator configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Access the underlying state cache.
    pub fn cache(&self) -> &StateCache {
        &self.inner.cache
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the poll loop and the command processor.
    ///
    /// The first poll runs immediately. Calling `start` on a running
    /// coordinator is a no-op; a shut-down coordinator cannot restart.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::CoordinatorStopped);
        }
        let Some(rx) = self.inner.command_rx.lock().await.take() else {
            debug!("coordinator already running");
            return Ok(());
        };

        let mut handles = self.inner.task_handles.lock().await;
        handles.push(tokio::spawn(command_processor_task(self.clone(), rx)));
        handles.push(tokio::spawn(scheduler::poll_task(
            self.clone(),
            self.inner.config.poll_interval,
            self.inner.cancel.clone(),
        )));

        info!(
            endpoint = %self.inner.sessions.endpoint(),
            ports = self.inner.config.port_count,
            interval_secs = self.inner.config.poll_interval.as_secs(),
            "coordinator started"
        );
        Ok(())
    }

    /// Stop background tasks and close the device session.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally (non-fatal)");
            }
        }
        drop(handles);

        self.inner.sessions.close().await;
        debug!("coordinator shut down");
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Run one full poll now and install the result.
    ///
    /// Updates health either way, except when the session stayed busy
    /// with a write: that says nothing about the switch. A failed poll
    /// leaves the previous snapshot in place.
    pub async fn poll_once(&self) -> Result<Arc<Snapshot>, CoreError> {
        let started = Instant::now();
        let commands = ReadCommand::FULL_POLL.map(|c| c.cli());

        let result = match self
            .inner
            .executor
            .execute(&self.inner.sessions, &commands)
            .await
        {
            Ok(outputs) => {
                let readings = convert::read_outputs(&outputs);
                self.report_issues(&readings);
                self.install(&readings)
            }
            Err(e) => Err(CoreError::from(e)),
        };

        let took = started.elapsed();
        match &result {
            Ok(snapshot) => {
                debug!(
                    sequence = snapshot.sequence,
                    partial = snapshot.is_partial(),
                    elapsed_ms = took.as_millis(),
                    "poll complete"
                );
                self.record_success(took);
            }
            Err(e) if matches!(e, CoreError::SessionBusy { .. }) => {
                warn!(error = %e, "poll skipped, session held by a write");
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms = took.as_millis(), "poll failed");
                self.record_failure(e.failure_cause(), took);
            }
        }
        result
    }

    fn install(&self, readings: &Readings) -> Result<Arc<Snapshot>, CoreError> {
        let Some(body) = convert::assemble(&self.inner.config, readings) else {
            return Err(readings.issues.first().map_or_else(
                || CoreError::ReadTimeout {
                    timeout_secs: self.inner.config.command_timeout.as_secs(),
                },
                |issue| CoreError::ParseFailed {
                    command: issue.command.clone(),
                    reason: issue.reason.clone(),
                    fragment: issue.fragment.clone(),
                },
            ));
        };
        Ok(self.inner.cache.replace(body, Utc::now()))
    }

    /// Re-read a single port and patch it into the current snapshot.
    pub async fn refresh_port(&self, index: u16) -> Result<Arc<Snapshot>, CoreError> {
        self.check_index(index)?;
        let commands = ReadCommand::port_refresh(index).map(|c| c.cli());
        let outputs = self
            .inner
            .executor
            .execute(&self.inner.sessions, &commands)
            .await?;

        let readings = convert::read_outputs(&outputs);
        self.report_issues(&readings);

        let current = self.inner.cache.read().ok_or(CoreError::NoSnapshot)?;
        let (Some(port), Some(poe)) = (current.port(index), current.poe(index)) else {
            return Err(CoreError::NoSnapshot);
        };
        let (port, poe) = convert::patch_port(&self.inner.config, &readings, port, poe)
            .ok_or_else(|| CoreError::ParseFailed {
                command: ReadCommand::InterfaceDetailFor(index).cli(),
                reason: format!("no interface record for port {index}"),
                fragment: None,
            })?;

        self.inner
            .cache
            .patch_port(port, poe, Utc::now())
            .ok_or(CoreError::NoSnapshot)
    }

    fn report_issues(&self, readings: &Readings) {
        for issue in &readings.issues {
            warn!(
                command = %issue.command,
                reason = %issue.reason,
                fragment = issue.fragment.as_deref().unwrap_or(""),
                "unparseable command output"
            );
            self.emit(CoordinatorEvent::ParseFailed {
                at: Utc::now(),
                command: issue.command.clone(),
                reason: issue.reason.clone(),
                fragment: issue.fragment.clone(),
            });
        }
    }

    // ── Health ───────────────────────────────────────────────────

    fn record_success(&self, took: Duration) {
        self.update_health(|h| h.record_success(Utc::now(), took));
    }

    fn record_failure(&self, cause: FailureCause, took: Duration) {
        self.update_health(|h| h.record_failure(cause, took));
    }

    fn update_health(
        &self,
        update: impl FnOnce(&mut HealthDetector) -> Option<Transition>,
    ) {
        let (transition, state) = {
            let mut health = self
                .inner
                .health
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let transition = update(&mut health);
            (transition, health.state().clone())
        };
        self.inner.connectivity.send_replace(state);

        if let Some(transition) = transition {
            info!(
                from = %transition.from,
                to = %transition.to,
                failures = transition.consecutive_failures,
                cause = ?transition.cause,
                "switch health changed"
            );
            self.emit(CoordinatorEvent::HealthChanged {
                at: Utc::now(),
                transition,
            });
        }
    }

    fn ensure_online(&self) -> Result<(), CoreError> {
        let state = self.inner.connectivity.borrow();
        if state.is_online() {
            Ok(())
        } else {
            Err(CoreError::DeviceOffline {
                consecutive_failures: state.consecutive_failures,
            })
        }
    }

    // ── Cache reads ──────────────────────────────────────────────

    /// The current snapshot. Fails while the switch is offline or
    /// before the first successful poll.
    pub fn get_snapshot(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.ensure_online()?;
        self.inner.cache.read().ok_or(CoreError::NoSnapshot)
    }

    /// The last snapshot regardless of health, possibly stale.
    pub fn last_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.cache.read()
    }

    /// One port by index. Excluded ports are not surfaced.
    pub fn get_port(&self, index: u16) -> Result<PortView, CoreError> {
        self.check_index(index)?;
        if self.inner.config.excluded_ports.contains(&index) {
            return Err(CoreError::PortExcluded { index });
        }
        let snapshot = self.get_snapshot()?;
        PortView::from_snapshot(&snapshot, index).ok_or(CoreError::NoSnapshot)
    }

    /// Every non-excluded port, in index order.
    pub fn list_ports(&self) -> Result<Vec<PortView>, CoreError> {
        let snapshot = self.get_snapshot()?;
        Ok(snapshot
            .visible_ports()
            .filter_map(|p| PortView::from_snapshot(&snapshot, p.index))
            .collect())
    }

    pub fn get_connectivity(&self) -> ConnectivityState {
        self.inner.connectivity.borrow().clone()
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.cache.subscribe()
    }

    /// Subscribe to connectivity/health changes.
    pub fn connectivity_changes(&self) -> watch::Receiver<ConnectivityState> {
        self.inner.connectivity.subscribe()
    }

    /// Subscribe to coordinator events.
    pub fn events(&self) -> broadcast::Receiver<Arc<CoordinatorEvent>> {
        self.inner.event_tx.subscribe()
    }

    /// Stagger offset for a consumer group reading on its own timer.
    pub fn consumer_offset(&self, group: &str) -> Duration {
        scheduler::stagger_offset(group, self.inner.config.stagger_max)
    }

    /// A poll-period interval whose first tick lands at the group's offset.
    pub fn consumer_interval(&self, group: &str) -> tokio::time::Interval {
        tokio::time::interval_at(
            Instant::now() + self.consumer_offset(group),
            self.inner.config.poll_interval,
        )
    }

    fn emit(&self, event: CoordinatorEvent) {
        // No subscribers is fine.
        let _ = self.inner.event_tx.send(Arc::new(event));
    }

    // ── Writes ───────────────────────────────────────────────────

    pub async fn set_port_enabled(&self, index: u16, enabled: bool) -> Result<WriteOutcome, CoreError> {
        self.check_writable(index)?;
        self.submit(PendingCommand::new(index, WriteOp::port(enabled)))
            .await
    }

    pub async fn set_poe_enabled(&self, index: u16, enabled: bool) -> Result<WriteOutcome, CoreError> {
        self.check_poe_writable(index)?;
        self.submit(PendingCommand::new(index, WriteOp::poe(enabled)))
            .await
    }

    /// Drive a port to a combined port/PoE mode.
    ///
    /// Queues the port write, then the PoE write for the two PoE modes,
    /// and stops at the first failure. `Enabled` leaves PoE as it is.
    pub async fn set_port_mode(&self, index: u16, mode: PortMode) -> Result<Vec<WriteOutcome>, CoreError> {
        let poe = match mode {
            PortMode::Disabled | PortMode::Enabled => None,
            PortMode::EnabledPoeOn => Some(true),
            PortMode::EnabledPoeOff => Some(false),
        };
        if poe.is_some() {
            self.check_poe_writable(index)?;
        } else {
            self.check_writable(index)?;
        }

        let mut outcomes = vec![self.set_port_enabled(index, mode != PortMode::Disabled).await?];
        if let Some(enabled) = poe {
            outcomes.push(self.set_poe_enabled(index, enabled).await?);
        }
        info!(port = index, %mode, writes = outcomes.len(), "port mode applied");
        Ok(outcomes)
    }

    /// Queue a write and wait for its result, bounded by the write timeout.
    ///
    /// Fails fast with [`CoreError::DeviceOffline`] while the switch is offline.
    /// A write still pending at the deadline is dropped from the queue and
    /// reported as [`CoreError::RetriesExhausted`].
    pub async fn submit(&self, command: PendingCommand) -> Result<WriteOutcome, CoreError> {
        self.ensure_online()?;
        if self.inner.cancel.is_cancelled() || self.inner.command_rx.lock().await.is_some() {
            return Err(CoreError::CoordinatorStopped);
        }

        let deadline = Instant::now() + self.inner.config.write_timeout;
        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command,
                deadline,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::CoordinatorStopped)?;

        match tokio::time::timeout_at(deadline, rx).await {
            Err(_) => Err(self.write_expired(0)),
            Ok(Err(_)) => Err(CoreError::CoordinatorStopped),
            Ok(Ok(result)) => result,
        }
    }

    fn write_expired(&self, attempts: u32) -> CoreError {
        CoreError::RetriesExhausted {
            attempts,
            last_error: format!(
                "not completed within {}s",
                self.inner.config.write_timeout.as_secs()
            ),
        }
    }

    fn check_index(&self, index: u16) -> Result<(), CoreError> {
        let port_count = self.inner.config.port_count;
        if index == 0 || index > port_count {
            return Err(CoreError::PortNotFound { index, port_count });
        }
        Ok(())
    }

    fn check_writable(&self, index: u16) -> Result<(), CoreError> {
        self.check_index(index)?;
        if self.inner.config.excluded_ports.contains(&index) {
            return Err(CoreError::PortExcluded { index });
        }
        Ok(())
    }

    fn check_poe_writable(&self, index: u16) -> Result<(), CoreError> {
        self.check_writable(index)?;
        if self.inner.config.excluded_poe.contains(&index) {
            return Err(CoreError::PoeExcluded { index });
        }
        let no_poe = self.inner.cache.read().is_some_and(|snapshot| {
            snapshot
                .poe(index)
                .is_some_and(|poe| poe.delivery == PoeDelivery::NotApplicable)
        });
        if no_poe {
            return Err(CoreError::PoeNotSupported { index });
        }
        Ok(())
    }

    /// Apply one write with bounded retries, then refresh the port.
    ///
    /// Nothing is sent once the caller has stopped waiting, including
    /// while this write waits for the session. A sequence that has begun
    /// sending runs to the end.
    async fn apply_write(&self, envelope: &mut CommandEnvelope) -> Result<WriteOutcome, CoreError> {
        let policy = RetryPolicy {
            retries: self.inner.config.write_retries,
            backoff: self.inner.config.retry_backoff,
        };
        let (port, op) = (envelope.command.port, envelope.command.op);
        let lines = op.sequence(port);

        loop {
            let made = envelope.command.retries;
            if let Err(e) = self.ensure_online() {
                return Err(self.fail_write(port, op, e));
            }
            if envelope.is_abandoned() {
                return Err(self.fail_write(port, op, self.write_expired(made)));
            }
            let attempts = made + 1;

            let acquired = tokio::select! {
                biased;
                () = envelope.abandoned() => None,
                acquired = self.inner.sessions.acquire() => Some(acquired),
            };
            let Some(acquired) = acquired else {
                return Err(self.fail_write(port, op, self.write_expired(made)));
            };
            let result = match acquired {
                Ok(guard) => self.inner.executor.write_on(guard, &lines).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(_) => {
                    info!(port, op = %op, attempts, "write applied");
                    let refreshed = match self.refresh_port(port).await {
                        Ok(_) => true,
                        Err(e) => {
                            warn!(port, error = %e, "post-write refresh failed (non-fatal)");
                            false
                        }
                    };
                    self.emit(CoordinatorEvent::WriteCompleted {
                        at: Utc::now(),
                        port,
                        op,
                        attempts,
                    });
                    return Ok(WriteOutcome {
                        port,
                        op,
                        attempts,
                        refreshed,
                    });
                }
                Err(e) if e.is_transient() && made < policy.retries => {
                    envelope.command.retries += 1;
                    let retry = envelope.command.retries;
                    let delay = policy.delay(retry);
                    warn!(
                        port,
                        op = %op,
                        error = %e,
                        retry,
                        delay_ms = delay.as_millis(),
                        "write failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        () = self.inner.cancel.cancelled() => return Err(CoreError::CoordinatorStopped),
                        () = envelope.abandoned() => {
                            return Err(self.fail_write(port, op, self.write_expired(retry)));
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    let err = if e.is_transient() {
                        CoreError::RetriesExhausted {
                            attempts,
                            last_error: e.to_string(),
                        }
                    } else {
                        CoreError::from(e)
                    };
                    return Err(self.fail_write(port, op, err));
                }
            }
        }
    }

    /// Report a failed write at the observability boundary and hand the
    /// error back for the caller.
    fn fail_write(&self, port: u16, op: WriteOp, err: CoreError) -> CoreError {
        warn!(port, op = %op, error = %err, "write failed");
        self.emit(CoordinatorEvent::WriteFailed {
            at: Utc::now(),
            port,
            op,
            error: err.to_string(),
        });
        err
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Drain the write queue one command at a time.
async fn command_processor_task(coordinator: Coordinator, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = coordinator.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(mut envelope) = envelope else { break };
                let result = coordinator.apply_write(&mut envelope).await;
                if let Err(Ok(outcome)) = envelope.response_tx.send(result) {
                    warn!(
                        port = outcome.port,
                        op = %outcome.op,
                        "write applied after its caller stopped waiting"
                    );
                }
            }
        }
    }
}
