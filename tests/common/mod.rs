//! Scripted in-memory transport shared by the integration tests.
//!
//! `MockTransport` is handed to the session; `MockRemote` stays with the
//! test and plays the server side: it pushes events, refuses connects
//! and reads back every call the session made, stamped with tokio time.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use orderbook_sync::client::{Transport, TransportEvent};
use orderbook_sync::{Config, Error};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const ENDPOINT: &str = "ws://localhost:8000/connection/websocket";
pub const SYMBOL: &str = "BTC-USD";
pub const CHANNEL: &str = "orderbook:BTC-USD";

/// Call made by the session on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Disconnect,
    Subscribe(String),
    Unsubscribe(String),
}

type CallLog = Arc<Mutex<Vec<(Instant, Call)>>>;

pub struct MockTransport {
    queued: VecDeque<TransportEvent>,
    feed: mpsc::UnboundedReceiver<TransportEvent>,
    connected: bool,
    refuse: Arc<AtomicBool>,
    log: CallLog,
}

pub struct MockRemote {
    feed: mpsc::UnboundedSender<TransportEvent>,
    refuse: Arc<AtomicBool>,
    log: CallLog,
    start: Instant,
}

pub fn mock_transport() -> (MockTransport, MockRemote) {
    let (tx, rx) = mpsc::unbounded_channel();
    let refuse = Arc::new(AtomicBool::new(false));
    let log = CallLog::default();

    let transport = MockTransport {
        queued: VecDeque::new(),
        feed: rx,
        connected: false,
        refuse: Arc::clone(&refuse),
        log: Arc::clone(&log),
    };
    let remote = MockRemote {
        feed: tx,
        refuse,
        log,
        start: Instant::now(),
    };
    (transport, remote)
}

pub fn test_config() -> Config {
    Config::new(ENDPOINT, SYMBOL).with_token("test-token")
}

pub fn batch(bids: &[(&str, &str)], asks: &[(&str, &str)], sequence: u64) -> Value {
    json!({
        "bids": bids.iter().map(|(p, s)| json!([p, s])).collect::<Vec<_>>(),
        "asks": asks.iter().map(|(p, s)| json!([p, s])).collect::<Vec<_>>(),
        "sequence": sequence,
    })
}

/// Let the session drain everything that is ready
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

impl MockTransport {
    fn record(&self, call: Call) {
        self.log.lock().push((Instant::now(), call));
    }
}

impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), Error> {
        self.record(Call::Connect);
        if self.connected {
            return Ok(());
        }
        self.queued.push_back(TransportEvent::Connecting);
        if self.refuse.load(Ordering::SeqCst) {
            self.queued.push_back(TransportEvent::Disconnected {
                reason: "connection refused".to_string(),
            });
            return Err(Error::ConnectionClosed);
        }
        self.connected = true;
        self.queued.push_back(TransportEvent::Connected);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        self.record(Call::Disconnect);
        if self.connected {
            self.connected = false;
            self.queued.push_back(TransportEvent::Disconnected {
                reason: "client disconnect".to_string(),
            });
        }
        Ok(())
    }

    async fn subscribe(&mut self, channel: &str) -> Result<(), Error> {
        self.record(Call::Subscribe(channel.to_string()));
        if self.connected {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    async fn unsubscribe(&mut self, channel: &str) -> Result<(), Error> {
        self.record(Call::Unsubscribe(channel.to_string()));
        if self.connected {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.queued.pop_front() {
            return Some(event);
        }
        if !self.connected {
            return std::future::pending().await;
        }
        let event = self.feed.recv().await?;
        if matches!(event, TransportEvent::Disconnected { .. }) {
            self.connected = false;
        }
        Some(event)
    }
}

impl MockRemote {
    pub fn publish(&self, data: Value) {
        self.push(TransportEvent::Publication {
            channel: CHANNEL.to_string(),
            data,
        });
    }

    pub fn push(&self, event: TransportEvent) {
        let _ = self.feed.send(event);
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Calls made so far, stamped relative to the remote's creation
    pub fn calls(&self) -> Vec<(Duration, Call)> {
        self.log
            .lock()
            .iter()
            .map(|(at, call)| (at.duration_since(self.start), call.clone()))
            .collect()
    }

    pub fn times_of(&self, wanted: &Call) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter(|(_, call)| call == wanted)
            .map(|(at, _)| at)
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.times_of(wanted).len()
    }
}
