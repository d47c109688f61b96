// ── Session manager ──
//
// Owns the single shell to the switch. Callers take turns through an
// async mutex; the guard they receive is the only way to reach the shell
// and releases it on drop, whatever path the caller leaves by.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::transport::{Connector, Shell};

const BACKOFF_INITIAL: Duration = Duration::from_millis(100);
const BACKOFF_FACTOR: f64 = 1.5;
const BACKOFF_MAX: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Slot {
    shell: Option<Box<dyn Shell>>,
    /// Delay to wait before the next connect attempt; `None` after a
    /// successful connect.
    backoff: Option<Duration>,
    connects: u64,
}

/// Serializes all access to the device shell.
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    slot: Mutex<Slot>,
    acquire_timeout: Duration,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn Connector>, acquire_timeout: Duration) -> Self {
        Self {
            connector,
            slot: Mutex::new(Slot::default()),
            acquire_timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    /// Wait for the session, connecting first if no live shell exists.
    ///
    /// Fails with [`Error::AcquireTimeout`] if another holder keeps the
    /// session past the acquire timeout. Connect and authentication
    /// errors are returned as-is; authentication is never retried here.
    pub async fn acquire(&self) -> Result<SessionGuard<'_>, Error> {
        let mut slot = tokio::time::timeout(self.acquire_timeout, self.slot.lock())
            .await
            .map_err(|_| Error::AcquireTimeout {
                timeout_ms: u64::try_from(self.acquire_timeout.as_millis()).unwrap_or(u64::MAX),
            })?;

        if slot.shell.is_none() {
            if let Some(delay) = slot.backoff {
                debug!(delay_ms = delay.as_millis(), "waiting before reconnect");
                tokio::time::sleep(delay).await;
            }

            match self.connector.connect().await {
                Ok(shell) => {
                    slot.shell = Some(shell);
                    slot.backoff = None;
                    slot.connects += 1;
                    info!(endpoint = %self.connector.endpoint(), connects = slot.connects, "session established");
                }
                Err(e) => {
                    let next = slot
                        .backoff
                        .map_or(BACKOFF_INITIAL, |d| d.mul_f64(BACKOFF_FACTOR).min(BACKOFF_MAX));
                    slot.backoff = Some(next);
                    warn!(endpoint = %self.connector.endpoint(), error = %e, "connect failed");
                    return Err(e);
                }
            }
        }

        Ok(SessionGuard { slot })
    }

    /// Close the live shell, if any. Used on coordinator shutdown.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(mut shell) = slot.shell.take() {
            shell.close().await;
            debug!("session closed");
        }
    }

    /// Number of successful connects so far.
    pub async fn connect_count(&self) -> u64 {
        self.slot.lock().await.connects
    }
}

/// Exclusive access to the live shell.
///
/// Dropping the guard releases the session for the next caller. Call
/// [`invalidate`](Self::invalidate) when the shell can no longer be
/// trusted; the next [`SessionManager::acquire`] reconnects.
pub struct SessionGuard<'a> {
    slot: MutexGuard<'a, Slot>,
}

impl SessionGuard<'_> {
    pub fn shell(&mut self) -> Result<&mut (dyn Shell + 'static), Error> {
        self.slot
            .shell
            .as_deref_mut()
            .ok_or_else(|| Error::SessionClosed {
                reason: "session was invalidated".into(),
            })
    }

    /// Tear the shell down and release the session.
    pub async fn invalidate(mut self) {
        if let Some(mut shell) = self.slot.shell.take() {
            shell.close().await;
            debug!("session invalidated");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::MockSwitch;

    fn manager(switch: &MockSwitch) -> SessionManager {
        SessionManager::new(Arc::new(switch.clone()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn reuses_one_shell_across_acquisitions() {
        let switch = MockSwitch::new();
        let sessions = manager(&switch);

        drop(sessions.acquire().await.unwrap());
        drop(sessions.acquire().await.unwrap());

        assert_eq!(switch.connect_attempts(), 1);
        assert_eq!(sessions.connect_count().await, 1);
    }

    #[tokio::test]
    async fn invalidated_session_reconnects_on_next_acquire() {
        let switch = MockSwitch::new();
        let sessions = manager(&switch);

        sessions.acquire().await.unwrap().invalidate().await;
        drop(sessions.acquire().await.unwrap());

        assert_eq!(switch.connect_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_caller_times_out_while_first_holds_session() {
        let switch = MockSwitch::new();
        let sessions = SessionManager::new(Arc::new(switch.clone()), Duration::from_millis(200));

        let _held = sessions.acquire().await.unwrap();
        let err = sessions.acquire().await.err().unwrap();

        assert!(matches!(err, Error::AcquireTimeout { timeout_ms: 200 }));
    }

    #[tokio::test]
    async fn authentication_failure_is_reported_distinctly() {
        let switch = MockSwitch::new().reject_password();
        let sessions = manager(&switch);

        let err = sessions.acquire().await.err().unwrap();
        assert!(matches!(err, Error::Authentication { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connects_back_off_before_retrying() {
        let switch = MockSwitch::new().fail_connects(2);
        let sessions = manager(&switch);

        assert!(sessions.acquire().await.is_err());
        let started = tokio::time::Instant::now();
        assert!(sessions.acquire().await.is_err());
        assert!(started.elapsed() >= BACKOFF_INITIAL);

        let started = tokio::time::Instant::now();
        drop(sessions.acquire().await.unwrap());
        assert!(started.elapsed() >= BACKOFF_INITIAL.mul_f64(BACKOFF_FACTOR));
        assert_eq!(switch.connect_attempts(), 3);
    }
}
