// ── State cache ──
//
// Holds the latest snapshot behind an `ArcSwapOption` so readers never
// block. Writers are serialized; each write derives rates against the
// snapshot it replaces and publishes the result through a `watch`.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::convert::SnapshotBody;
use crate::model::{PoeStatus, Port, Snapshot, SnapshotOrigin};
use crate::stream::SnapshotStream;

/// Latest switch snapshot plus change notification.
pub struct StateCache {
    current: ArcSwapOption<Snapshot>,
    notify: watch::Sender<Option<Arc<Snapshot>>>,
    /// Serializes read-modify-write of `current`.
    writer: Mutex<()>,
    activity_threshold: u64,
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let millis = (to - from).num_milliseconds() as f64;
    millis / 1000.0
}

impl StateCache {
    pub fn new(activity_threshold: u64) -> Self {
        let (notify, _) = watch::channel(None);
        Self {
            current: ArcSwapOption::empty(),
            notify,
            writer: Mutex::new(()),
            activity_threshold,
        }
    }

    /// The current snapshot, if any poll has completed.
    pub fn read(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Read one port's fields without cloning the snapshot.
    pub fn read_field<T>(&self, index: u16, field: impl FnOnce(&Port, &PoeStatus) -> T) -> Option<T> {
        let snapshot = self.current.load();
        let snapshot = snapshot.as_ref()?;
        Some(field(snapshot.port(index)?, snapshot.poe(index)?))
    }

    /// Sequence of the current snapshot, 0 before the first.
    pub fn sequence(&self) -> u64 {
        self.current.load().as_ref().map_or(0, |s| s.sequence)
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.notify.subscribe())
    }

    /// Install a full-poll snapshot, deriving rates from the previous one.
    pub fn replace(&self, body: SnapshotBody, captured_at: DateTime<Utc>) -> Arc<Snapshot> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.current.load_full();

        let mut ports = body.ports;
        let elapsed = previous
            .as_ref()
            .map_or(0.0, |p| elapsed_secs(p.captured_at, captured_at));
        for port in ports.values_mut() {
            let prev_port = previous.as_ref().and_then(|p| p.port(port.index));
            port.derive_from(prev_port, elapsed, self.activity_threshold);
        }

        let snapshot = Snapshot {
            sequence: previous.as_ref().map_or(0, |p| p.sequence) + 1,
            captured_at,
            identity: body.identity,
            ports,
            poe: body.poe,
            outcome: body.outcome,
            origin: SnapshotOrigin::FullPoll,
        };
        self.publish(snapshot)
    }

    /// Replace one port's entries in the current snapshot.
    ///
    /// Returns `None` when there is no snapshot yet or the port is not
    /// part of it.
    pub fn patch_port(
        &self,
        mut port: Port,
        poe: PoeStatus,
        captured_at: DateTime<Utc>,
    ) -> Option<Arc<Snapshot>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.current.load_full()?;
        let prev_port = previous.port(port.index)?;

        port.derive_from(
            Some(prev_port),
            elapsed_secs(previous.captured_at, captured_at),
            self.activity_threshold,
        );

        let mut next = Snapshot::clone(&previous);
        next.sequence += 1;
        next.captured_at = captured_at;
        next.origin = SnapshotOrigin::PortRefresh { port: port.index };
        next.poe.insert(poe.index, poe);
        next.ports.insert(port.index, port);
        Some(self.publish(next))
    }

    fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        debug!(
            sequence = snapshot.sequence,
            origin = ?snapshot.origin,
            "snapshot published"
        );
        self.current.store(Some(Arc::clone(&snapshot)));
        self.notify.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }
}
