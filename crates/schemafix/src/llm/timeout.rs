//! Bounded capability calls.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::{Result, SchemafixError};

/// Run a capability call on a worker thread, giving up after `timeout`.
///
/// A call that outlives its timeout is abandoned: its thread finishes in the
/// background and the answer is dropped. Timeouts are reported as
/// [`SchemafixError::CapabilityUnavailable`] and are never retried.
pub fn call_with_timeout<T, F>(capability: &str, timeout: Duration, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name(format!("capability-{}", capability))
        .spawn(move || {
            let _ = tx.send(f());
        })
        .map_err(|e| SchemafixError::CapabilityUnavailable {
            capability: capability.to_string(),
            reason: format!("failed to spawn worker: {}", e),
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(capability, timeout_ms = timeout.as_millis() as u64, "capability timed out");
            Err(SchemafixError::CapabilityUnavailable {
                capability: capability.to_string(),
                reason: format!("timed out after {} ms", timeout.as_millis()),
            })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(SchemafixError::CapabilityUnavailable {
            capability: capability.to_string(),
            reason: "worker exited without an answer".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_call_returns_value() {
        let value = call_with_timeout("test", Duration::from_secs(1), || Ok(42)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_slow_call_times_out() {
        let result: Result<u32> = call_with_timeout("slow", Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            Ok(1)
        });

        match result {
            Err(SchemafixError::CapabilityUnavailable { capability, reason }) => {
                assert_eq!(capability, "slow");
                assert!(reason.contains("timed out"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_error_passes_through() {
        let result: Result<u32> = call_with_timeout("err", Duration::from_secs(1), || {
            Err(SchemafixError::Config("boom".to_string()))
        });
        assert!(matches!(result, Err(SchemafixError::Config(_))));
    }

    #[test]
    fn test_panicking_worker_is_unavailable() {
        let result: Result<u32> =
            call_with_timeout("panics", Duration::from_secs(1), || panic!("worker failed"));
        assert!(matches!(
            result,
            Err(SchemafixError::CapabilityUnavailable { .. })
        ));
    }
}
