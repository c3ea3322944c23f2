//! Adaptive Admission Control
//!
//! Protects a backend from overload by gating non-privileged traffic off
//! an observed throughput signal. Privileged traffic is never throttled.
//!
//! Three states:
//! - `Healthy`: everything is admitted.
//! - `RateLimited`: only privileged requests get through.
//! - `Recovering`: non-privileged traffic is admitted at a percentage
//!   that ramps up while the backend stays quiet and drops the moment
//!   it does not.
//!
//! Degradation is immediate (a single hot sample backs recovery off)
//! while each recovery step demands a sustained run of quiet samples.

use std::sync::{Mutex, RwLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info};

use crate::config::AdmissionConfig;

mod errors;
mod sampler;

pub use errors::{AdmissionError, AdmissionResult};
pub use sampler::{Sampler, SamplerHandle};

/// Controller state. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Backend within capacity; everything is admitted.
    Healthy,
    /// Sustained overload; only privileged requests are admitted.
    RateLimited,
    /// Ramping non-privileged traffic back up after an overload.
    Recovering,
}

/// Per-request attributes consulted on the decision path.
///
/// Privilege is an explicit typed field rather than a string-keyed
/// context lookup; an absent marker (`Default`) means non-privileged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestAttributes {
    pub privileged: bool,
}

impl RequestAttributes {
    /// Marker for privileged ("VIP") traffic, exempt from throttling.
    pub fn vip() -> Self {
        Self { privileged: true }
    }

    /// Marker for ordinary traffic.
    pub fn regular() -> Self {
        Self::default()
    }
}

/// Consistent point-in-time view of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub state: ControllerState,
    /// Percentage of non-privileged traffic admitted while `Recovering`.
    pub admission_rate: u8,
}

/// Anything that can answer "must this request be rejected?".
pub trait Limiter {
    fn should_reject(&self, attrs: &RequestAttributes) -> AdmissionResult<bool>;
}

/// Mutable gate record. Single writer (the sampler), many readers.
#[derive(Debug)]
struct Gate {
    state: ControllerState,
    /// Admission percentage in [0, 100]; consulted only while `Recovering`.
    admission_rate: u8,
    /// Consecutive qualifying samples toward the pending transition.
    consecutive: u32,
}

/// Adaptive admission controller.
///
/// Construct once, share behind an `Arc`, and either start a [`Sampler`]
/// against a [`crate::monitor::QpsMonitor`] or drive [`apply_sample`]
/// from your own cadence.
///
/// [`apply_sample`]: AdmissionController::apply_sample
pub struct AdmissionController {
    config: AdmissionConfig,
    gate: RwLock<Gate>,
    /// Admission draws come from an owned, seedable source so behavior
    /// while `Recovering` is reproducible under test.
    rng: Mutex<StdRng>,
}

impl AdmissionController {
    /// Build a controller from a validated configuration.
    pub fn new(config: AdmissionConfig) -> AdmissionResult<Self> {
        config.validate().map_err(AdmissionError::InvalidConfig)?;
        Ok(Self {
            config,
            gate: RwLock::new(Gate {
                state: ControllerState::Healthy,
                admission_rate: 100,
                consecutive: 0,
            }),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Replace the random source with a deterministically seeded one.
    pub fn with_rng_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Consistent snapshot of state and admission rate.
    pub fn snapshot(&self) -> AdmissionResult<ControllerSnapshot> {
        let gate = self.gate.read().map_err(|_| AdmissionError::StatePoisoned)?;
        Ok(ControllerSnapshot {
            state: gate.state,
            admission_rate: gate.admission_rate,
        })
    }

    /// Decide whether a request must be rejected.
    ///
    /// Privileged requests are admitted in every state. The rest branch
    /// on the current state under shared access: admitted while
    /// `Healthy`, rejected while `RateLimited`, and admitted with
    /// probability `admission_rate / 100` while `Recovering`. Never
    /// mutates the gate and never blocks on I/O.
    pub fn should_reject(&self, attrs: &RequestAttributes) -> AdmissionResult<bool> {
        if attrs.privileged {
            return Ok(false);
        }
        let gate = self.gate.read().map_err(|_| AdmissionError::StatePoisoned)?;
        match gate.state {
            ControllerState::Healthy => Ok(false),
            ControllerState::RateLimited => Ok(true),
            ControllerState::Recovering => {
                // A poisoned draw source is still a usable draw source.
                let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
                let draw = rng.gen_range(0u8..100);
                Ok(draw >= gate.admission_rate)
            }
        }
    }

    /// Apply one observed throughput sample to the state machine.
    ///
    /// This is the single writer path: the sampler calls it once per
    /// tick, and embedders running their own cadence may call it
    /// directly. A sample that does not qualify for the pending
    /// transition resets the hysteresis streak.
    pub fn apply_sample(&self, qps: u64) {
        let Ok(mut gate) = self.gate.write() else {
            error!("admission gate poisoned; sample dropped");
            return;
        };
        match gate.state {
            ControllerState::Healthy => self.sample_healthy(&mut gate, qps),
            ControllerState::RateLimited => self.sample_rate_limited(&mut gate, qps),
            ControllerState::Recovering => self.sample_recovering(&mut gate, qps),
        }
    }

    fn sample_healthy(&self, gate: &mut Gate, qps: u64) {
        if qps >= self.config.upper_limit {
            gate.consecutive += 1;
            if gate.consecutive >= self.config.required_samples {
                gate.state = ControllerState::RateLimited;
                // Not consulted until recovery begins.
                gate.admission_rate = 100;
                gate.consecutive = 0;
                info!(
                    qps,
                    upper_limit = self.config.upper_limit,
                    "sustained overload, gating non-privileged traffic"
                );
            }
        } else {
            gate.consecutive = 0;
        }
    }

    fn sample_rate_limited(&self, gate: &mut Gate, qps: u64) {
        if qps < self.config.recover_enter_threshold() {
            gate.consecutive += 1;
            if gate.consecutive >= self.config.required_samples {
                gate.state = ControllerState::Recovering;
                gate.admission_rate = self.config.rate_step_percent;
                gate.consecutive = 0;
                info!(
                    qps,
                    admission_rate = gate.admission_rate,
                    "load receded, ramping non-privileged traffic back up"
                );
            }
        } else {
            gate.consecutive = 0;
        }
    }

    fn sample_recovering(&self, gate: &mut Gate, qps: u64) {
        if qps >= self.config.upper_limit {
            // One hot sample is enough to back off.
            gate.admission_rate = gate
                .admission_rate
                .saturating_sub(self.config.rate_step_percent);
            gate.consecutive = 0;
            info!(
                qps,
                admission_rate = gate.admission_rate,
                "overload during recovery, backing off"
            );
        } else if qps < self.config.recover_step_threshold() {
            gate.consecutive += 1;
            if gate.consecutive >= self.config.required_samples {
                gate.admission_rate = gate
                    .admission_rate
                    .saturating_add(self.config.rate_step_percent)
                    .min(100);
                gate.consecutive = 0;
                if gate.admission_rate >= 100 {
                    gate.state = ControllerState::Healthy;
                    info!("recovery complete, admitting all traffic");
                } else {
                    debug!(admission_rate = gate.admission_rate, "recovery step");
                }
            }
        } else {
            // Between the step threshold and the ceiling: hold position.
            gate.consecutive = 0;
        }
    }
}

impl Limiter for AdmissionController {
    fn should_reject(&self, attrs: &RequestAttributes) -> AdmissionResult<bool> {
        AdmissionController::should_reject(self, attrs)
    }
}
