use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cityroute_lib::Error as LibError;
use tracing::{error, warn};

use crate::error::{from_lib_error, ServiceError};
use crate::metrics::record_operation_timeout;

const PENDING: u8 = 0;
const PUBLISHED: u8 = 1;
const WITHDRAWN: u8 = 2;

/// Decides, exactly once, whether blocking work may publish its result.
///
/// The worker calls [`PublishGate::try_publish`] right before making its
/// result visible; a request that gave up waiting calls `withdraw`. Whichever
/// comes first wins, so a request reported as timed out never has side
/// effects, and a result that was published is never reported as a timeout.
#[derive(Debug, Clone)]
pub struct PublishGate {
    state: Arc<AtomicU8>,
    budget: Duration,
}

impl PublishGate {
    /// Gate for work bounded by `budget`.
    pub fn new(budget: Duration) -> Self {
        Self {
            state: Arc::new(AtomicU8::new(PENDING)),
            budget,
        }
    }

    /// Gate that is never withdrawn.
    pub fn open() -> Self {
        Self::new(Duration::MAX)
    }

    /// Claim the right to publish. `false` once the request has withdrawn.
    pub fn try_publish(&self) -> bool {
        self.transition(PUBLISHED)
    }

    pub(crate) fn withdraw(&self) -> bool {
        self.transition(WITHDRAWN)
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// The error reported for `operation` once the budget is exceeded.
    pub fn timeout_error(&self, operation: &str) -> LibError {
        LibError::Timeout {
            operation: operation.to_string(),
            budget: self.budget,
        }
    }
}

/// Run blocking library work on tokio's blocking pool, bounded by `timeout`.
///
/// Exceeding the budget yields a `Timeout` error; the detached task is left
/// to finish on its own. A panicking task becomes a 500.
pub async fn run_blocking<T, F>(
    operation: &'static str,
    timeout: Duration,
    work: F,
) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, LibError> + Send + 'static,
{
    run_gated(operation, timeout, move |_| work()).await
}

/// Like [`run_blocking`], for work with side effects.
///
/// `work` receives a [`PublishGate`] and must only publish after
/// `try_publish` returns `true`. On timeout the gate is withdrawn; if the
/// work already published, the call waits for it and returns its result.
pub async fn run_gated<T, F>(
    operation: &'static str,
    timeout: Duration,
    work: F,
) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce(&PublishGate) -> Result<T, LibError> + Send + 'static,
{
    let gate = PublishGate::new(timeout);
    let worker_gate = gate.clone();
    let mut handle = tokio::task::spawn_blocking(move || work(&worker_gate));

    let joined = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(joined) => joined,
        Err(_) if gate.withdraw() => {
            warn!(operation, budget = ?timeout, "blocking work abandoned");
            record_operation_timeout(operation);
            return Err(from_lib_error(&gate.timeout_error(operation)));
        }
        // Already published: the result is moments away.
        Err(_) => handle.await,
    };

    match joined {
        Ok(result) => result.map_err(|err| from_lib_error(&err)),
        Err(join_error) => {
            error!(operation, error = %join_error, "blocking task failed");
            Err(ServiceError::internal(format!("{operation} failed")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn returns_work_result() {
        let value = run_blocking("sum", Duration::from_secs(5), || Ok(2 + 2))
            .await
            .unwrap();
        assert_eq!(value, 4);
    }

    #[tokio::test]
    async fn maps_library_errors() {
        let err = run_blocking::<(), _>("initialize", Duration::from_secs(5), || {
            Err(LibError::NotInitialized)
        })
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn slow_work_times_out_with_millisecond_budget() {
        let err = run_blocking("render", Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "render timed out after 20ms");
    }

    #[tokio::test]
    async fn abandoned_work_cannot_publish() {
        let published = Arc::new(AtomicBool::new(false));
        let flag = published.clone();
        let err = run_gated("initialize", Duration::from_millis(20), move |gate| {
            std::thread::sleep(Duration::from_millis(200));
            if gate.try_publish() {
                flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.message.contains("timed out"));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!published.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn published_work_is_reported_even_when_late() {
        let value = run_gated("initialize", Duration::from_millis(200), |gate| {
            assert!(gate.try_publish());
            std::thread::sleep(Duration::from_millis(600));
            Ok(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn gate_decides_once() {
        let gate = PublishGate::new(Duration::from_secs(1));
        assert!(gate.withdraw());
        assert!(!gate.try_publish());
        assert!(PublishGate::open().try_publish());
    }
}
