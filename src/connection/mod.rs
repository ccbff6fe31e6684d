//! Connection supervision: liveness, backoff and clocks.
//!
//! - [`ConnectionLivenessMonitor`] - forces reconnects on silence and
//!   schedules them with capped exponential backoff
//! - [`BackoffConfig`] / [`ResyncThrottle`] - delay curves
//! - [`Clock`] - injectable time source ([`SystemClock`], [`ManualClock`])

pub mod backoff;
pub mod clock;
pub mod monitor;

pub use backoff::{BackoffConfig, ResyncThrottle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use monitor::{
    ConnectionLivenessMonitor, LivenessCheck, LivenessConfig, ReconnectDecision, ReconnectTicket,
};
