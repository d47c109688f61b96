// ── Poll scheduling ──
//
// One background task runs the full poll on a fixed interval. Consumers
// that read the cache on their own timers get a stable per-group offset
// so they do not all wake on the same tick.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::coordinator::Coordinator;

/// Stable offset in `[0, max)` for a consumer group.
///
/// The same key always maps to the same offset within a build.
pub fn stagger_offset(key: &str, max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    Duration::from_millis(hasher.finish() % max_ms)
}

/// Poll immediately, then every `every` until cancelled.
///
/// A poll that overruns the interval delays the next tick rather than
/// bunching the missed ones.
pub(crate) async fn poll_task(coordinator: Coordinator, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = coordinator.poll_once() => match result {
                Ok(snapshot) => debug!(sequence = snapshot.sequence, "scheduled poll complete"),
                Err(e) => warn!(error = %e, "scheduled poll failed"),
            },
        }
    }
    debug!("poll task stopped");
}
