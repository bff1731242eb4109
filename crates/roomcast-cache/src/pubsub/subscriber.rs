//! Redis Pub/Sub subscriber.
//!
//! One dedicated pub/sub connection per process. The listener task owns it,
//! reconnects after a fixed delay, and restores every channel in the wanted
//! set before reading again. Messages are fanned out on a broadcast channel.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use redis::aio::PubSub;
use roomcast_core::RoomEvent;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

use crate::pool::redact_url;
use crate::pubsub::PubSubChannel;

#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("invalid event payload: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("subscriber task is gone")]
    ChannelClosed,

    #[error("pub/sub connection lost: {0}")]
    Connection(String),
}

pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// A message as it came off the pub/sub connection
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub channel: PubSubChannel,
    /// `None` when the payload is not a [`RoomEvent`]
    pub event: Option<RoomEvent>,
    pub payload: String,
}

impl ReceivedMessage {
    fn from_redis(channel_name: &str, payload: String) -> Self {
        Self {
            channel: PubSubChannel::parse(channel_name),
            event: serde_json::from_str(&payload).ok(),
            payload,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub redis_url: String,
    /// Capacity of the broadcast channel feeding local relays
    pub broadcast_buffer: usize,
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Subscribe,
    Unsubscribe,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

#[derive(Debug)]
enum Command {
    Change {
        op: Op,
        channels: Vec<String>,
        ack: oneshot::Sender<SubscriberResult<()>>,
    },
    Shutdown,
}

/// Why a listener connection ended
enum Exit {
    Shutdown,
    Reconnect(SubscriberError),
}

type Wanted = Arc<RwLock<HashSet<String>>>;

/// Redis Pub/Sub subscriber
pub struct Subscriber {
    /// Channels to hold on the current and every future connection
    wanted: Wanted,
    broadcast_tx: broadcast::Sender<ReceivedMessage>,
    control_tx: mpsc::Sender<Command>,
}

impl Subscriber {
    /// Start the listener task. The first connection is made in the background.
    pub fn new(config: SubscriberConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer.max(1));
        let (control_tx, control_rx) = mpsc::channel(32);
        let wanted = Wanted::default();

        tokio::spawn(listen(config, wanted.clone(), broadcast_tx.clone(), control_rx));

        Self {
            wanted,
            broadcast_tx,
            control_tx,
        }
    }

    async fn request(&self, op: Op, channels: &[PubSubChannel]) -> SubscriberResult<()> {
        let (ack, done) = oneshot::channel();
        let command = Command::Change {
            op,
            channels: channels.iter().map(PubSubChannel::name).collect(),
            ack,
        };

        self.control_tx
            .send(command)
            .await
            .map_err(|_| SubscriberError::ChannelClosed)?;
        done.await.map_err(|_| SubscriberError::ChannelClosed)?
    }

    /// Subscribe to channels, resolving once Redis has confirmed
    pub async fn subscribe(&self, channels: &[PubSubChannel]) -> SubscriberResult<()> {
        self.request(Op::Subscribe, channels).await
    }

    pub async fn unsubscribe(&self, channels: &[PubSubChannel]) -> SubscriberResult<()> {
        self.request(Op::Unsubscribe, channels).await
    }

    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedMessage> {
        self.broadcast_tx.subscribe()
    }

    /// Channels held now and restored after a reconnect
    pub async fn subscribed_channels(&self) -> Vec<String> {
        self.wanted.read().await.iter().cloned().collect()
    }

    pub async fn shutdown(&self) -> SubscriberResult<()> {
        self.control_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("receivers", &self.broadcast_tx.receiver_count())
            .finish_non_exhaustive()
    }
}

async fn listen(
    config: SubscriberConfig,
    wanted: Wanted,
    broadcast_tx: broadcast::Sender<ReceivedMessage>,
    mut control_rx: mpsc::Receiver<Command>,
) {
    let delay = Duration::from_millis(config.reconnect_delay_ms);

    loop {
        match connection(&config, &wanted, &broadcast_tx, &mut control_rx).await {
            Exit::Shutdown => {
                tracing::info!("Subscriber shutting down");
                return;
            }
            Exit::Reconnect(e) => {
                tracing::error!(error = %e, delay_ms = config.reconnect_delay_ms, "Pub/Sub connection lost, reconnecting");
            }
        }
        tokio::time::sleep(delay).await;
    }
}

/// Serve one pub/sub connection until it fails or shutdown is requested
async fn connection(
    config: &SubscriberConfig,
    wanted: &Wanted,
    broadcast_tx: &broadcast::Sender<ReceivedMessage>,
    control_rx: &mut mpsc::Receiver<Command>,
) -> Exit {
    let mut pubsub = match open(config, wanted).await {
        Ok(pubsub) => pubsub,
        Err(e) => return Exit::Reconnect(e),
    };

    loop {
        // The message stream borrows the connection, so it is rebuilt per turn
        let command = {
            let mut messages = pubsub.on_message();
            loop {
                tokio::select! {
                    msg = messages.next() => {
                        let Some(msg) = msg else {
                            return Exit::Reconnect(SubscriberError::Connection("stream ended".to_string()));
                        };
                        let channel = msg.get_channel_name().to_string();
                        let payload: String = msg.get_payload().unwrap_or_default();
                        tracing::trace!(channel = %channel, "Pub/Sub message");

                        // Nobody listening is fine
                        let _ = broadcast_tx.send(ReceivedMessage::from_redis(&channel, payload));
                    }
                    command = control_rx.recv() => break command,
                }
            }
        };

        match command {
            Some(Command::Change { op, channels, ack }) => {
                if abandoned(op, &ack) {
                    tracing::debug!(?channels, "Skipping subscribe nobody waits for");
                    continue;
                }

                let outcome = apply(&mut pubsub, wanted, op, &channels).await;
                let failed = outcome.is_err();
                let unclaimed = ack.send(outcome).is_err();

                // The requester timed out while Redis was confirming
                if unclaimed && !failed && op == Op::Subscribe {
                    tracing::debug!(?channels, "Reverting subscribe nobody waits for");
                    if apply(&mut pubsub, wanted, Op::Unsubscribe, &channels).await.is_err() {
                        return Exit::Reconnect(SubscriberError::Connection("unsubscribe failed".to_string()));
                    }
                }
                if failed {
                    return Exit::Reconnect(SubscriberError::Connection(format!("{} failed", op.as_str())));
                }
            }
            Some(Command::Shutdown) | None => return Exit::Shutdown,
        }
    }
}

/// A subscribe whose requester already gave up must not reach Redis.
/// Unsubscribes always run so the wanted set only shrinks.
fn abandoned(op: Op, ack: &oneshot::Sender<SubscriberResult<()>>) -> bool {
    op == Op::Subscribe && ack.is_closed()
}

async fn open(config: &SubscriberConfig, wanted: &Wanted) -> SubscriberResult<PubSub> {
    let client = redis::Client::open(config.redis_url.as_str())?;
    let mut pubsub = client.get_async_pubsub().await?;

    let restored: Vec<String> = wanted.read().await.iter().cloned().collect();
    for channel in &restored {
        pubsub.subscribe(channel).await?;
    }

    tracing::info!(
        url = %redact_url(&config.redis_url),
        channels = restored.len(),
        "Subscriber connected to Redis"
    );
    Ok(pubsub)
}

/// Update the wanted set first so a reconnect restores the intended state
async fn apply(
    pubsub: &mut PubSub,
    wanted: &Wanted,
    op: Op,
    channels: &[String],
) -> SubscriberResult<()> {
    for channel in channels {
        let result = match op {
            Op::Subscribe => {
                wanted.write().await.insert(channel.clone());
                pubsub.subscribe(channel).await
            }
            Op::Unsubscribe => {
                wanted.write().await.remove(channel);
                pubsub.unsubscribe(channel).await
            }
        };

        if let Err(e) = result {
            // A failed subscribe is rolled back by its caller, so it must not be restored
            if op == Op::Subscribe {
                wanted.write().await.remove(channel);
            }
            tracing::error!(channel = %channel, op = op.as_str(), error = %e, "Pub/Sub change failed");
            return Err(e.into());
        }
        tracing::debug!(channel = %channel, op = op.as_str(), "Pub/Sub change applied");
    }
    Ok(())
}
