//! Throughput Monitoring
//!
//! The controller consumes a single capability: a point-in-time qps
//! estimate. It lives behind a trait so the state machine stays testable
//! against deterministic fake readings.

use async_trait::async_trait;
use thiserror::Error;

/// Result type for monitor probes
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Throughput measurement failures
///
/// A failed probe is never treated as a zero reading; the caller drops
/// the sample and carries on.
#[derive(Debug, Clone, Error)]
pub enum MonitorError {
    #[error("qps probe timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("qps source unavailable: {0}")]
    Unavailable(String),
}

/// Source of throughput estimates.
///
/// Implementations must answer promptly; the sampler additionally bounds
/// every probe with `monitor_timeout_ms` and skips the sample when the
/// bound is exceeded.
#[async_trait]
pub trait QpsMonitor: Send + Sync + 'static {
    /// Point-in-time throughput estimate, in requests per second.
    async fn qps(&self) -> MonitorResult<u64>;
}


#[cfg(test)]
mod tests {
    use super::mock::ScriptedMonitor;
    use super::*;

    #[tokio::test]
    async fn test_scripted_monitor_replays_then_reports_unavailable() {
        let monitor = ScriptedMonitor::new([Ok(1200), Err(MonitorError::Unavailable("glitch".into()))]);
        assert_eq!(monitor.qps().await.unwrap(), 1200);
        assert!(monitor.qps().await.is_err());
        // Exhausted scripts keep failing rather than inventing readings.
        assert!(monitor.qps().await.is_err());
    }

    #[test]
    fn test_error_display() {
        let err = MonitorError::Timeout { timeout_ms: 3000 };
        assert!(err.to_string().contains("3000"));
    }
}
