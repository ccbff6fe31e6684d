//! Event loop tying a transport, the reconciliation engine and the
//! liveness monitor together for one symbol.
//!
//! All mutation happens on the task running [`OrderbookSession::run`]:
//! batches are applied strictly in arrival order and no batch is ever
//! processed concurrently with another. The presentation layer reads
//! through a [`BookHandle`] from any task.
//!
//! # Example
//!
//! ```rust,no_run
//! use orderbook_sync::{Config, OrderbookSession};
//! use orderbook_sync::types::Side;
//!
//! # async fn example() -> orderbook_sync::Result<()> {
//! let config = Config::new("wss://feed.example.com/connection/websocket", "BTC-USD")
//!     .with_token("jwt-token");
//! let session = OrderbookSession::centrifugo(config)?;
//! let handle = session.handle();
//!
//! let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
//! let task = tokio::spawn(session.run(async move {
//!     let _ = stop_rx.await;
//! }));
//!
//! // Render loop
//! for row in handle.display_rows(Side::Ask, 11) {
//!     println!("{} {} {}", row.price, row.size, row.total);
//! }
//!
//! let _ = stop_tx.send(());
//! let _ = task.await;
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::client::{CentrifugoClient, Transport, TransportEvent};
use crate::config::Config;
use crate::connection::{
    Clock, ConnectionLivenessMonitor, LivenessCheck, ReconnectDecision, ReconnectTicket,
    ResyncThrottle, SystemClock,
};
use crate::error::Error;
use crate::orderbook::{ApplyOutcome, BookHandle, ReconciliationState};
use crate::types::UpdateBatch;

/// Live order book subscription for one symbol
pub struct OrderbookSession<T: Transport, C: Clock = SystemClock> {
    channel: String,
    transport: T,
    monitor: ConnectionLivenessMonitor<C>,
    throttle: ResyncThrottle,
    handle: BookHandle,
    /// Armed reconnect timer
    reconnect_at: Option<(Instant, ReconnectTicket)>,
    /// Armed (throttled) resubscribe timer
    resync_at: Option<Instant>,
    subscribed: bool,
    check_interval: std::time::Duration,
}

impl<T: Transport, C: Clock> std::fmt::Debug for OrderbookSession<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderbookSession")
            .field("channel", &self.channel)
            .field("state", &self.monitor.state())
            .field("reconnect_attempts", &self.monitor.reconnect_attempts())
            .field("subscribed", &self.subscribed)
            .field("resync_pending", &self.resync_at.is_some())
            .finish()
    }
}

impl OrderbookSession<CentrifugoClient> {
    /// Create a session over a Centrifugo WebSocket connection
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] or [`Error::Url`] if the configuration is
    /// invalid.
    pub fn centrifugo(config: Config) -> Result<Self, Error> {
        let transport = CentrifugoClient::new(config.clone());
        Self::new(config, transport)
    }
}

impl<T: Transport> OrderbookSession<T> {
    /// Create a session over any transport, timed by the tokio clock
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config, transport: T) -> Result<Self, Error> {
        Self::with_clock(config, transport, SystemClock::new())
    }
}

impl<T: Transport, C: Clock> OrderbookSession<T, C> {
    /// Create a session with an injected clock
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_clock(config: Config, transport: T, clock: C) -> Result<Self, Error> {
        config.validate()?;
        let liveness = config.liveness().clone();
        Ok(Self {
            channel: config.channel(),
            transport,
            throttle: ResyncThrottle::new(liveness.backoff.clone()),
            check_interval: liveness.check_interval,
            monitor: ConnectionLivenessMonitor::with_clock(liveness, clock),
            handle: BookHandle::with_depth(config.depth()),
            reconnect_at: None,
            resync_at: None,
            subscribed: false,
        })
    }

    /// Handle for reading the book from other tasks
    pub fn handle(&self) -> BookHandle {
        self.handle.clone()
    }

    /// Channel this session follows
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Connect and process events until `shutdown` resolves or the
    /// transport finishes
    ///
    /// On exit any pending reconnect or resync is cancelled, the channel
    /// is unsubscribed and the transport disconnected.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let period = self.check_interval;
        let mut liveness = tokio::time::interval_at(Instant::now() + period, period);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(channel = %self.channel, "starting order book session");
        if let Err(e) = self.transport.connect().await {
            warn!(error = %e, "initial connect failed");
        }

        loop {
            let reconnect_deadline = self.reconnect_at.map(|(at, _)| at);
            let resync_deadline = self.resync_at;

            tokio::select! {
                _ = &mut shutdown => {
                    info!(channel = %self.channel, "shutdown requested");
                    break;
                }
                event = self.transport.next_event() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!(channel = %self.channel, "transport finished");
                        break;
                    }
                },
                _ = liveness.tick() => self.check_liveness().await,
                _ = sleep_until_opt(reconnect_deadline) => self.fire_reconnect().await,
                _ = sleep_until_opt(resync_deadline) => self.resubscribe().await,
            }
        }

        self.teardown().await;
    }

    async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connecting => {
                self.monitor.on_connecting();
                self.publish_state();
            }
            TransportEvent::Connected => {
                self.monitor.on_connected();
                self.reconnect_at = None;
                // A new connection starts a new gap streak
                self.throttle.on_applied();
                self.publish_state();
                self.start_subscription().await;
            }
            TransportEvent::Disconnected { reason } => {
                self.subscribed = false;
                self.resync_at = None;
                if let Some(ticket) = self.monitor.on_disconnected(&reason) {
                    self.arm_reconnect(ticket);
                }
                self.publish_state();
            }
            TransportEvent::Publication { channel, data } => {
                if channel == self.channel {
                    self.on_publication(data).await;
                } else {
                    debug!(channel = %channel, "ignoring publication on foreign channel");
                }
            }
            TransportEvent::SubscriptionError { channel, message } => {
                error!(channel = %channel, message = %message, "subscription error");
                if channel == self.channel {
                    self.force_reconnect(&format!("subscription error: {}", message))
                        .await;
                }
            }
        }
    }

    async fn on_publication(&mut self, data: serde_json::Value) {
        if self.resync_at.is_some() {
            trace!(channel = %self.channel, "dropping batch while resync is pending");
            return;
        }

        let batch = match UpdateBatch::from_json(data) {
            Ok(batch) => batch,
            Err(e) => {
                error!(channel = %self.channel, error = %e, "dropping malformed batch");
                return;
            }
        };

        match self.handle.write(|book| book.apply(&batch)) {
            Ok(ApplyOutcome::Applied { changed }) => {
                self.monitor.on_batch();
                self.throttle.on_applied();
                trace!(
                    channel = %self.channel,
                    sequence = batch.sequence,
                    changed = changed.len(),
                    "applied batch"
                );
            }
            Ok(ApplyOutcome::ResyncRequired { last, got }) => {
                warn!(
                    channel = %self.channel,
                    last,
                    got,
                    "out of order sequence received, resubscribing"
                );
                let delay = self.throttle.on_gap();
                if delay.is_zero() {
                    self.resubscribe().await;
                } else {
                    debug!(delay_ms = delay.as_millis() as u64, "resync throttled");
                    self.resync_at = Some(Instant::now() + delay);
                }
            }
            Err(e) => {
                error!(
                    channel = %self.channel,
                    sequence = batch.sequence,
                    error = %e,
                    "dropping malformed batch"
                );
            }
        }
    }

    async fn check_liveness(&mut self) {
        if let LivenessCheck::Stale { silent_for, ticket } = self.monitor.check() {
            info!(
                channel = %self.channel,
                silent_ms = silent_for.as_millis() as u64,
                "no messages received within threshold, reconnecting"
            );
            self.arm_reconnect(ticket);
            self.subscribed = false;
            self.resync_at = None;
            self.publish_state();
            if let Err(e) = self.transport.disconnect().await {
                warn!(error = %e, "forced disconnect failed");
            }
        }
    }

    async fn fire_reconnect(&mut self) {
        let Some((_, ticket)) = self.reconnect_at.take() else {
            return;
        };

        match self.monitor.on_reconnect_due(ticket) {
            ReconnectDecision::Attempt { attempt } => {
                if let Err(e) = self.transport.connect().await {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                }
            }
            ReconnectDecision::AlreadyConnected | ReconnectDecision::Stale => {
                debug!(generation = ticket.generation, "reconnect no longer needed");
            }
            ReconnectDecision::GiveUp { attempts } => {
                error!(
                    channel = %self.channel,
                    attempts,
                    "reconnect attempts exhausted, giving up"
                );
                self.publish_state();
            }
        }
    }

    /// Treat a transport-level failure like a disconnect
    async fn force_reconnect(&mut self, reason: &str) {
        self.subscribed = false;
        self.resync_at = None;
        if let Some(ticket) = self.monitor.on_disconnected(reason) {
            self.arm_reconnect(ticket);
        }
        self.publish_state();
        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "disconnect failed");
        }
    }

    /// Drop the channel and start a fresh subscription cycle
    async fn resubscribe(&mut self) {
        self.resync_at = None;
        if self.subscribed {
            if let Err(e) = self.transport.unsubscribe(&self.channel).await {
                warn!(channel = %self.channel, error = %e, "unsubscribe failed");
            }
        }
        self.start_subscription().await;
    }

    async fn start_subscription(&mut self) {
        self.handle.write(ReconciliationState::reset);
        match self.transport.subscribe(&self.channel).await {
            Ok(()) => {
                self.subscribed = true;
                info!(channel = %self.channel, "subscribing");
            }
            Err(e) => {
                self.subscribed = false;
                // Transport failures are picked up by the reconnect policy
                if e.is_transport() {
                    warn!(channel = %self.channel, error = %e, "subscribe failed");
                } else {
                    error!(channel = %self.channel, error = %e, "subscribe failed");
                }
            }
        }
    }

    fn arm_reconnect(&mut self, ticket: ReconnectTicket) {
        info!(
            delay_ms = ticket.delay.as_millis() as u64,
            attempt = self.monitor.reconnect_attempts() + 1,
            "reconnect scheduled"
        );
        self.reconnect_at = Some((Instant::now() + ticket.delay, ticket));
    }

    async fn teardown(&mut self) {
        self.monitor.shutdown();
        self.reconnect_at = None;
        self.resync_at = None;

        if self.subscribed {
            if let Err(e) = self.transport.unsubscribe(&self.channel).await {
                debug!(error = %e, "unsubscribe during teardown failed");
            }
            self.subscribed = false;
        }
        if let Err(e) = self.transport.disconnect().await {
            debug!(error = %e, "disconnect during teardown failed");
        }
        self.publish_state();
        info!(channel = %self.channel, "order book session stopped");
    }

    fn publish_state(&self) {
        self.handle.set_connection_state(self.monitor.state());
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
