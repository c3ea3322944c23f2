//! loadgate - adaptive admission control for overload protection
//!
//! A feedback-driven gate that watches observed throughput and sheds
//! non-privileged traffic when a backend runs hot, then conservatively
//! ramps it back up. Privileged traffic always gets through.

pub mod admission;
pub mod config;
pub mod monitor;

pub use admission::{
    AdmissionController, AdmissionError, AdmissionResult, ControllerSnapshot, ControllerState,
    Limiter, RequestAttributes, Sampler, SamplerHandle,
};
pub use config::{AdmissionConfig, ConfigError};
pub use monitor::{MonitorError, MonitorResult, QpsMonitor};
