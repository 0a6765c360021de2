/*
[INPUT]:  Stream-channel Connection and the login's streamSessionId
[OUTPUT]: Subscribe / unsubscribe and a demultiplexed feed of PushMessages
[POS]:    Stream layer - subscription multiplexer
[UPDATE]: When changing dispatch rules or the subscription registry
*/

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::socket::{Result, XapiError};
use crate::stream::message::{PushMessage, StreamFrame};
use crate::stream::topic::{Subscription, SubscriptionKey, Topic};
use crate::transport::Connection;
use crate::transport::connection::truncate_for_log;
use crate::types::Command;

const DROP_LOG_LIMIT: usize = 10;
const RAW_LOG_MAX_BYTES: usize = 256;

#[derive(Debug, Default)]
struct Registry {
    active: HashSet<SubscriptionKey>,
    consumers: HashMap<Topic, mpsc::UnboundedSender<PushMessage>>,
    /// Pushes dropped for lack of an active subscription
    dropped: usize,
}

/// Subscription multiplexer for the stream channel.
///
/// Stream commands get no reply: `subscribe` fires and returns. Pushes are
/// forwarded only while their (topic, symbol) key is active, so nothing is
/// dispatched for a topic once its unsubscribe has been issued.
#[derive(Debug)]
pub struct XapiStream {
    connection: Arc<Connection>,
    stream_session_id: String,
    registry: Mutex<Registry>,
}

impl XapiStream {
    pub fn new(connection: Connection, stream_session_id: impl Into<String>) -> Self {
        Self {
            connection: Arc::new(connection),
            stream_session_id: stream_session_id.into(),
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn stream_session_id(&self) -> &str {
        &self.stream_session_id
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a subscription. Returns `false` when the key is already active.
    pub async fn subscribe(&self, subscription: &Subscription) -> Result<bool> {
        let key = subscription.key();
        if !self.registry().active.insert(key.clone()) {
            debug!(key = %key, "already subscribed");
            return Ok(false);
        }

        let command = subscription.command(&self.stream_session_id);
        if let Err(err) = self.send(&command).await {
            self.registry().active.remove(&key);
            return Err(err);
        }
        info!(key = %key, "subscribed");
        Ok(true)
    }

    /// Stop a subscription. Returns `false` when the key was not active.
    ///
    /// Dispatch for the key stops before the stop command is written.
    pub async fn unsubscribe(&self, key: &SubscriptionKey) -> Result<bool> {
        if !self.registry().active.remove(key) {
            debug!(key = %key, "not subscribed");
            return Ok(false);
        }

        self.send(&key.unsubscribe_command(&self.stream_session_id))
            .await?;
        info!(key = %key, "unsubscribed");
        Ok(true)
    }

    /// Stream-channel keep-alive.
    pub async fn ping(&self) -> Result<()> {
        self.send(&Command::new("ping").with_stream_session(&self.stream_session_id))
            .await
    }

    pub fn is_active(&self, key: &SubscriptionKey) -> bool {
        self.registry().active.contains(key)
    }

    pub fn active_subscriptions(&self) -> Vec<SubscriptionKey> {
        self.registry().active.iter().cloned().collect()
    }

    /// Queue fed by `run` with every accepted push of `topic`.
    ///
    /// Replaces any earlier consumer of the same topic.
    pub fn consume(&self, topic: Topic) -> mpsc::UnboundedReceiver<PushMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry().consumers.insert(topic, tx);
        rx
    }

    async fn send(&self, command: &Command) -> Result<()> {
        self.connection.send(command.to_frame()?).await
    }

    /// Continuous read loop over the connection.
    ///
    /// Yields each push whose key is active, in wire order. Ends after yielding
    /// one error: `ConnectionClosed` on transport loss, or a protocol error after
    /// which the connection has been closed. Only one listener should run per
    /// stream; `run` is one.
    pub fn listen(&self) -> impl Stream<Item = Result<PushMessage>> + '_ {
        futures_util::stream::unfold(false, move |finished| async move {
            if finished {
                return None;
            }
            match self.next_accepted().await {
                Ok(push) => Some((Ok(push), false)),
                Err(err) => Some((Err(err), true)),
            }
        })
    }

    async fn next_accepted(&self) -> Result<PushMessage> {
        loop {
            let frame = self.connection.receive().await?;
            match StreamFrame::decode(&frame) {
                Ok(StreamFrame::Push(push)) => {
                    if self.accepts(&push) {
                        return Ok(push);
                    }
                    self.log_dropped(&push);
                }
                Ok(StreamFrame::Status(reply)) => {
                    if reply.status {
                        debug!("stream status frame");
                    } else {
                        warn!(
                            code = ?reply.error_code,
                            description = ?reply.error_descr,
                            "stream command rejected"
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        frame = %truncate_for_log(&frame, RAW_LOG_MAX_BYTES),
                        "stream protocol error; closing connection"
                    );
                    self.connection.close_now();
                    return Err(err);
                }
            }
        }
    }

    fn accepts(&self, push: &PushMessage) -> bool {
        match push.key() {
            Some(key) => self.registry().active.contains(&key),
            None => false,
        }
    }

    /// Drain `listen` into the per-topic consumer queues until the connection ends.
    ///
    /// Always returns an error: `ConnectionClosed` or the protocol error that
    /// tore the connection down.
    pub async fn run(&self) -> Result<()> {
        let mut events = std::pin::pin!(self.listen());
        while let Some(event) = events.next().await {
            let push = event?;
            self.route(push);
        }
        Err(XapiError::ConnectionClosed)
    }

    fn route(&self, push: PushMessage) {
        let Some(topic) = push.topic() else {
            return;
        };
        let mut registry = self.registry();
        let Some(consumer) = registry.consumers.get(&topic) else {
            debug!(topic = %topic, "no consumer for topic");
            return;
        };
        if consumer.send(push).is_err() {
            debug!(topic = %topic, "consumer gone");
            registry.consumers.remove(&topic);
        }
    }

    /// Samples the first few dropped pushes of this stream.
    fn log_dropped(&self, push: &PushMessage) {
        let count = {
            let mut registry = self.registry();
            registry.dropped = registry.dropped.saturating_add(1);
            registry.dropped
        };
        if count <= DROP_LOG_LIMIT {
            debug!(
                sample_index = count,
                sample_limit = DROP_LOG_LIMIT,
                command = %push.command,
                symbol = ?push.symbol(),
                "dropping push without active subscription"
            );
        }
    }

    pub async fn close(&self) {
        self.connection.close().await;
    }
}
