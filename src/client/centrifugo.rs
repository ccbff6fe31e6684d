//! WebSocket transport speaking the Centrifugo client protocol.
//!
//! This module provides [`CentrifugoClient`], a [`Transport`] that:
//!
//! - Authenticates with an optional connection token
//! - Subscribes and unsubscribes channels by name
//! - Turns channel publications into [`TransportEvent::Publication`]
//! - Answers server pings and protocol-level WebSocket pings
//!
//! It does not reconnect on its own; reconnection is driven by the
//! session's liveness monitor.
//!
//! # Example
//!
//! ```rust,no_run
//! use orderbook_sync::client::{CentrifugoClient, Transport};
//! use orderbook_sync::Config;
//!
//! # async fn example() -> orderbook_sync::Result<()> {
//! let config = Config::new("wss://feed.example.com/connection/websocket", "BTC-USD")
//!     .with_token("jwt-token");
//! let mut client = CentrifugoClient::new(config.clone());
//!
//! client.connect().await?;
//! client.subscribe(&config.channel()).await?;
//!
//! while let Some(event) = client.next_event().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{Transport, TransportEvent};
use crate::config::Config;
use crate::error::Error;
use crate::types::messages::{ChannelRequest, Command, CommandMethod, ConnectRequest, Reply};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Name reported to the server in the connect command
const CLIENT_NAME: &str = "orderbook-sync";

/// Pong answer to a server ping
const PONG: &str = "{}";

struct Socket {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
}

/// Command awaiting its reply
#[derive(Debug, Clone)]
enum PendingCommand {
    Subscribe(String),
    Unsubscribe(String),
}

/// Centrifugo WebSocket client
///
/// # Thread Safety
///
/// This client is NOT thread-safe. It is owned by a single session task.
pub struct CentrifugoClient {
    config: Config,
    socket: Option<Socket>,
    /// Events produced but not yet handed out
    events: VecDeque<TransportEvent>,
    next_id: u32,
    /// Commands awaiting replies, by id
    pending: FxHashMap<u32, PendingCommand>,
    /// Channels requested on the current connection
    subscriptions: FxHashSet<String>,
}

impl std::fmt::Debug for CentrifugoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CentrifugoClient")
            .field("endpoint", &self.config.endpoint())
            .field("connected", &self.socket.is_some())
            .field("queued_events", &self.events.len())
            .field("pending_commands", &self.pending.len())
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

impl CentrifugoClient {
    /// Create a disconnected client for the configured endpoint
    pub fn new(config: Config) -> Self {
        Self {
            config,
            socket: None,
            events: VecDeque::new(),
            next_id: 1,
            pending: FxHashMap::default(),
            subscriptions: FxHashSet::default(),
        }
    }

    /// Check if a socket is currently open
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Channels subscribed on the current connection
    pub fn subscriptions(&self) -> &FxHashSet<String> {
        &self.subscriptions
    }

    /// Get the next command id without incrementing
    pub fn next_command_id(&self) -> u32 {
        self.next_id
    }

    fn take_command_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    /// Open the socket and complete the connect command round trip
    async fn handshake(&mut self) -> Result<Socket, Error> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(self.config.endpoint()).await?;
        let (mut write, mut read) = ws_stream.split();

        let id = self.take_command_id();
        let cmd = Command {
            id,
            method: CommandMethod::Connect(ConnectRequest {
                token: self.config.token().map(str::to_owned),
                name: Some(CLIENT_NAME.to_string()),
            }),
        };
        write.send(Message::Text(serde_json::to_string(&cmd)?)).await?;

        loop {
            let frame = read.next().await.ok_or(Error::ConnectionClosed)??;
            match frame {
                Message::Text(text) => {
                    for reply in parse_frames(&text)? {
                        if reply.id != id {
                            continue;
                        }
                        if let Some(error) = reply.error {
                            return Err(Error::Server {
                                code: error.code,
                                message: error.message,
                            });
                        }
                        if let Some(result) = reply.connect {
                            info!(
                                client = ?result.client,
                                version = ?result.version,
                                "connected to pub/sub server"
                            );
                            return Ok(Socket { write, read });
                        }
                    }
                }
                Message::Ping(data) => write.send(Message::Pong(data)).await?,
                Message::Close(_) => return Err(Error::ConnectionClosed),
                _ => {}
            }
        }
    }

    /// Send a command on the open socket, returning its id
    async fn send_command(&mut self, method: CommandMethod) -> Result<u32, Error> {
        let id = self.take_command_id();
        let json = serde_json::to_string(&Command { id, method })?;
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        if let Err(e) = socket.write.send(Message::Text(json)).await {
            self.drop_socket(format!("send failed: {}", e));
            return Err(e.into());
        }
        Ok(id)
    }

    /// Forget the socket and report the disconnect
    fn drop_socket(&mut self, reason: impl Into<String>) {
        self.socket = None;
        self.pending.clear();
        self.subscriptions.clear();
        self.events.push_back(TransportEvent::Disconnected {
            reason: reason.into(),
        });
    }

    /// Route every reply in a text frame
    async fn handle_text(&mut self, text: &str) {
        let replies = match parse_frames(text) {
            Ok(replies) => replies,
            Err(e) => {
                warn!(error = %e, "ignoring undecodable server frame");
                return;
            }
        };

        for reply in replies {
            if reply.is_ping() {
                if let Some(socket) = self.socket.as_mut() {
                    if let Err(e) = socket.write.send(Message::Text(PONG.to_string())).await {
                        self.drop_socket(format!("pong failed: {}", e));
                        return;
                    }
                }
                continue;
            }

            if let Some(push) = reply.push {
                if let Some(publication) = push.publication {
                    self.events.push_back(TransportEvent::Publication {
                        channel: push.channel,
                        data: publication.data,
                    });
                } else if let Some(disconnect) = push.disconnect {
                    self.drop_socket(format!(
                        "server disconnect ({}): {}",
                        disconnect.code, disconnect.reason
                    ));
                    return;
                }
                continue;
            }

            match self.pending.remove(&reply.id) {
                Some(PendingCommand::Subscribe(channel)) => match reply.error {
                    Some(error) => {
                        self.subscriptions.remove(&channel);
                        self.events.push_back(TransportEvent::SubscriptionError {
                            channel,
                            message: format!("({}) {}", error.code, error.message),
                        });
                    }
                    None => info!(channel = %channel, "subscribed"),
                },
                Some(PendingCommand::Unsubscribe(channel)) => {
                    debug!(channel = %channel, "unsubscribed");
                }
                None => {
                    if let Some(error) = reply.error {
                        warn!(id = reply.id, code = error.code, message = %error.message, "unmatched error reply");
                    }
                }
            }
        }
    }
}

impl Transport for CentrifugoClient {
    async fn connect(&mut self) -> Result<(), Error> {
        if self.socket.is_some() {
            return Ok(());
        }
        self.events.push_back(TransportEvent::Connecting);

        let timeout = self.config.connect_timeout();
        let result = match tokio::time::timeout(timeout, self.handshake()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        };

        match result {
            Ok(socket) => {
                self.socket = Some(socket);
                self.events.push_back(TransportEvent::Connected);
                Ok(())
            }
            Err(e) => {
                self.events.push_back(TransportEvent::Disconnected {
                    reason: format!("connect failed: {}", e),
                });
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.write.close().await {
                debug!(error = %e, "error closing socket");
            }
            self.pending.clear();
            self.subscriptions.clear();
            self.events.push_back(TransportEvent::Disconnected {
                reason: "client disconnect".to_string(),
            });
        }
        Ok(())
    }

    async fn subscribe(&mut self, channel: &str) -> Result<(), Error> {
        let id = self
            .send_command(CommandMethod::Subscribe(ChannelRequest {
                channel: channel.to_string(),
            }))
            .await?;
        self.pending
            .insert(id, PendingCommand::Subscribe(channel.to_string()));
        self.subscriptions.insert(channel.to_string());
        Ok(())
    }

    async fn unsubscribe(&mut self, channel: &str) -> Result<(), Error> {
        let id = self
            .send_command(CommandMethod::Unsubscribe(ChannelRequest {
                channel: channel.to_string(),
            }))
            .await?;
        self.pending
            .insert(id, PendingCommand::Unsubscribe(channel.to_string()));
        self.subscriptions.remove(channel);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Some(event);
            }

            let Some(socket) = self.socket.as_mut() else {
                // Nothing to report until someone calls connect()
                return std::future::pending().await;
            };

            match socket.read.next().await {
                Some(Ok(Message::Text(text))) => self.handle_text(&text).await,
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = socket.write.send(Message::Pong(data)).await {
                        self.drop_socket(format!("pong failed: {}", e));
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("closed by server: {}", f.reason))
                        .unwrap_or_else(|| "closed by server".to_string());
                    self.drop_socket(reason);
                }
                Some(Ok(_)) => {
                    // Binary, Pong and raw frames carry nothing for us
                }
                Some(Err(e)) => self.drop_socket(format!("read error: {}", e)),
                None => self.drop_socket("stream ended"),
            }
        }
    }
}

/// Split a text frame into protocol replies (one JSON object per line)
fn parse_frames(text: &str) -> Result<Vec<Reply>, Error> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}
