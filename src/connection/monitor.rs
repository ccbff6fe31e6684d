//! Supervisory connection liveness and reconnect scheduling.
//!
//! The monitor is a plain state machine: it never sleeps or touches the
//! network. Callers feed it connection events and clock ticks and act on
//! what it returns (force a disconnect, arm a timer, attempt a connect).
//! This keeps every timing decision testable with a [`ManualClock`].
//!
//! It sits above whatever reconnection the transport does on its own and
//! will force a reconnect when data goes silent even if the transport
//! still believes it is connected.
//!
//! [`ManualClock`]: super::ManualClock

use std::time::Duration;

use tracing::{debug, info, warn};

use super::backoff::BackoffConfig;
use super::clock::{Clock, SystemClock};
use crate::types::ConnectionState;

/// Timing parameters for the monitor
#[derive(Debug, Clone, PartialEq)]
pub struct LivenessConfig {
    /// How often the periodic liveness check runs
    pub check_interval: Duration,
    /// Silence longer than this while connected forces a reconnect
    pub silence_threshold: Duration,
    /// Reconnect delay curve
    pub backoff: BackoffConfig,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            silence_threshold: Duration::from_secs(10),
            backoff: BackoffConfig::default(),
        }
    }
}

/// A scheduled reconnect attempt
///
/// Only the most recently issued ticket is live; older ones are ignored
/// when they fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectTicket {
    /// Monotonic id of this schedule
    pub generation: u64,
    /// How long to wait before firing
    pub delay: Duration,
}

/// Result of the periodic liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessCheck {
    /// Not connected; nothing to supervise
    Idle,
    /// Connected and data is flowing
    Healthy,
    /// Connected but silent for too long; the caller must disconnect the
    /// transport. A reconnect has been scheduled.
    Stale {
        /// How long the feed has been silent
        silent_for: Duration,
        /// The reconnect that was scheduled
        ticket: ReconnectTicket,
    },
}

/// What to do when a reconnect timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Call `connect()` now; `attempt` is 1-based
    Attempt {
        /// Attempt number
        attempt: u32,
    },
    /// A connection was established before the timer fired
    AlreadyConnected,
    /// The ticket was superseded or cancelled
    Stale,
    /// The attempt budget is spent; stop reconnecting
    GiveUp {
        /// Attempts made
        attempts: u32,
    },
}

/// Connection liveness monitor for one subscription.
///
/// # State machine
///
/// `Disconnected -> Connecting -> Connected -> Disconnected -> ...`
///
/// - Entering `Connected` resets the attempt counter and cancels any
///   pending reconnect.
/// - Every disconnect (explicit, transport-reported, or forced by the
///   liveness check) schedules at most one reconnect, delayed by
///   `backoff.delay_for_attempt(attempts)`.
/// - The attempt counter is incremented only when a reconnect actually
///   fires while not connected.
#[derive(Debug)]
pub struct ConnectionLivenessMonitor<C: Clock = SystemClock> {
    clock: C,
    config: LivenessConfig,
    state: ConnectionState,
    last_message_ms: u64,
    reconnect_attempts: u32,
    pending: Option<ReconnectTicket>,
    next_generation: u64,
    stopped: bool,
}

impl ConnectionLivenessMonitor<SystemClock> {
    /// Create a monitor on the tokio clock
    pub fn new(config: LivenessConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> ConnectionLivenessMonitor<C> {
    /// Create a monitor with an injected clock
    pub fn with_clock(config: LivenessConfig, clock: C) -> Self {
        let now = clock.now_ms();
        Self {
            clock,
            config,
            state: ConnectionState::Disconnected,
            last_message_ms: now,
            reconnect_attempts: 0,
            pending: None,
            next_generation: 1,
            stopped: false,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts fired since the last successful connect
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Timestamp of the last processed batch (or connect)
    pub fn last_message_ms(&self) -> u64 {
        self.last_message_ms
    }

    /// The reconnect currently scheduled, if any
    pub fn pending_reconnect(&self) -> Option<ReconnectTicket> {
        self.pending
    }

    /// Monitor configuration
    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    /// The transport started a handshake
    pub fn on_connecting(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!("connection state -> connecting");
        }
        self.state = ConnectionState::Connecting;
    }

    /// The transport is connected
    ///
    /// Resets the attempt counter, cancels any pending reconnect and
    /// restarts the silence window.
    pub fn on_connected(&mut self) {
        info!(
            attempts = self.reconnect_attempts,
            "connection state -> connected"
        );
        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
        self.pending = None;
        self.stopped = false;
        self.last_message_ms = self.clock.now_ms();
    }

    /// A batch was successfully processed
    pub fn on_batch(&mut self) {
        self.last_message_ms = self.clock.now_ms();
    }

    /// The connection went down
    ///
    /// Returns the newly scheduled reconnect, or `None` if one is already
    /// pending or the monitor is stopped.
    pub fn on_disconnected(&mut self, reason: &str) -> Option<ReconnectTicket> {
        if self.state != ConnectionState::Disconnected {
            info!(reason, "connection state -> disconnected");
        }
        self.state = ConnectionState::Disconnected;
        self.schedule_reconnect()
    }

    /// Periodic liveness check
    ///
    /// If connected and the last batch is older than the silence
    /// threshold, moves to `Disconnected` and schedules exactly one
    /// reconnect.
    pub fn check(&mut self) -> LivenessCheck {
        if self.state != ConnectionState::Connected {
            return LivenessCheck::Idle;
        }

        let silent_ms = self.clock.now_ms().saturating_sub(self.last_message_ms);
        let silent_for = Duration::from_millis(silent_ms);
        if silent_for <= self.config.silence_threshold {
            return LivenessCheck::Healthy;
        }

        warn!(
            silent_ms,
            threshold_ms = self.config.silence_threshold.as_millis() as u64,
            "no updates within liveness threshold, forcing reconnect"
        );
        self.state = ConnectionState::Disconnected;
        match self.schedule_reconnect() {
            Some(ticket) => LivenessCheck::Stale { silent_for, ticket },
            None => LivenessCheck::Idle,
        }
    }

    /// A reconnect timer fired
    pub fn on_reconnect_due(&mut self, ticket: ReconnectTicket) -> ReconnectDecision {
        match self.pending {
            Some(pending) if pending.generation == ticket.generation => {}
            _ => return ReconnectDecision::Stale,
        }
        self.pending = None;

        if self.state == ConnectionState::Connected {
            return ReconnectDecision::AlreadyConnected;
        }

        if self.config.backoff.exhausted(self.reconnect_attempts) {
            self.stopped = true;
            return ReconnectDecision::GiveUp {
                attempts: self.reconnect_attempts,
            };
        }

        self.reconnect_attempts += 1;
        warn!(attempt = self.reconnect_attempts, "attempting to reconnect");
        ReconnectDecision::Attempt {
            attempt: self.reconnect_attempts,
        }
    }

    /// Stop supervising: cancel the pending reconnect and never schedule
    /// another until the next `on_connected`
    pub fn shutdown(&mut self) {
        self.pending = None;
        self.stopped = true;
        self.state = ConnectionState::Disconnected;
    }

    /// Whether the monitor has stopped scheduling reconnects
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn schedule_reconnect(&mut self) -> Option<ReconnectTicket> {
        if self.stopped || self.pending.is_some() {
            return None;
        }
        let ticket = ReconnectTicket {
            generation: self.next_generation,
            delay: self.config.backoff.delay_for_attempt(self.reconnect_attempts),
        };
        self.next_generation += 1;
        self.pending = Some(ticket);
        debug!(
            generation = ticket.generation,
            delay_ms = ticket.delay.as_millis() as u64,
            "reconnect scheduled"
        );
        Some(ticket)
    }
}
