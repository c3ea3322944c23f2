//! Sampler Loop
//!
//! A background task that polls the throughput monitor once per
//! configured interval and feeds each reading into the controller's
//! state machine. Probes are bounded by `monitor_timeout_ms`; a probe
//! that fails or times out is logged and the sample skipped outright,
//! so a failed read never masquerades as a zero reading.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::admission::AdmissionController;
use crate::monitor::QpsMonitor;

/// Periodic driver of an [`AdmissionController`].
pub struct Sampler<M: QpsMonitor> {
    controller: Arc<AdmissionController>,
    monitor: Arc<M>,
}

impl<M: QpsMonitor> Sampler<M> {
    pub fn new(controller: Arc<AdmissionController>, monitor: Arc<M>) -> Self {
        Self {
            controller,
            monitor,
        }
    }

    /// Spawn the sampling loop.
    ///
    /// Ticks fire on a steady cadence while probes complete within the
    /// period; a probe that overruns delays subsequent ticks instead of
    /// bursting to catch up.
    pub fn start(self) -> SamplerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let period = Duration::from_millis(self.controller.config().sample_interval_ms);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.sample_once().await,
                    _ = &mut shutdown_rx => break,
                }
            }
        });
        SamplerHandle {
            task,
            shutdown: shutdown_tx,
        }
    }

    async fn sample_once(&self) {
        let timeout = Duration::from_millis(self.controller.config().monitor_timeout_ms);
        match tokio::time::timeout(timeout, self.monitor.qps()).await {
            Ok(Ok(qps)) => self.controller.apply_sample(qps),
            // Skipped samples neither advance nor reset the hysteresis
            // streak.
            Ok(Err(err)) => warn!(error = %err, "qps probe failed; sample skipped"),
            Err(_) => warn!(
                timeout_ms = timeout.as_millis() as u64,
                "qps probe timed out; sample skipped"
            ),
        }
    }
}

/// Handle controlling a running sampler loop.
///
/// `stop` is the deterministic teardown; dropping the handle without
/// calling it also shuts the loop down, so the task cannot outlive its
/// owner.
pub struct SamplerHandle {
    task: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

impl SamplerHandle {
    /// Signal the loop to exit and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            if err.is_panic() {
                std::panic::resume_unwind(err.into_panic());
            }
        }
    }
}
