//! Redis Pub/Sub broker for relays spread over several processes.
//!
//! `PUBLISH` and `PUBSUB NUMSUB` go over a multiplexed connection. Every
//! subscription gets its own pub/sub connection, driven by a forwarding
//! task that feeds the subscription's delivery queue and runs
//! `UNSUBSCRIBE` when asked. Closing the subscription ends the task and
//! drops the connection.
//!
//! Every command is bounded by the configured timeout.

use std::future::Future;
use std::time::Duration;

use ::redis::aio::{MultiplexedConnection, PubSub};
use ::redis::{AsyncCommands, Msg, RedisResult};
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::{Broker, BrokerError, Subscription};
use crate::shared::BrokerMessage;

/// Broker backed by a Redis server. Clones share the same client.
#[derive(Clone, Debug)]
pub struct RedisBroker {
    client: ::redis::Client,
    command_timeout: Duration,
    buffer: usize,
}

impl RedisBroker {
    /// Open a client for `url` and check that the server answers.
    ///
    /// Subscriptions buffer up to `buffer` undelivered messages.
    pub async fn connect(url: &str, command_timeout: Duration, buffer: usize) -> Result<Self, BrokerError> {
        let client = ::redis::Client::open(url).map_err(|e| BrokerError::Unavailable(e.to_string()))?;
        let broker = Self {
            client,
            command_timeout,
            buffer: buffer.max(1),
        };

        let mut conn = broker.connection().await?;
        let _: String = broker
            .bounded(::redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(BrokerError::Unavailable)?;
        tracing::info!(timeout = ?command_timeout, "[Broker] Connected to Redis");
        Ok(broker)
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, String>
    where
        F: Future<Output = RedisResult<T>>,
    {
        bounded(self.command_timeout, op).await
    }

    async fn connection(&self) -> Result<MultiplexedConnection, BrokerError> {
        self.bounded(self.client.get_multiplexed_async_connection())
            .await
            .map_err(BrokerError::Unavailable)
    }
}

async fn bounded<T, F>(after: Duration, op: F) -> Result<T, String>
where
    F: Future<Output = RedisResult<T>>,
{
    match timeout(after, op).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(_) => Err(format!("redis timeout after {:?}", after)),
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, BrokerError> {
        let mut conn = self.connection().await?;
        let receivers: usize = self
            .bounded(conn.publish(channel, payload))
            .await
            .map_err(|message| BrokerError::Publish {
                channel: channel.to_string(),
                message,
            })?;
        tracing::debug!(channel, receivers, "[Broker] Published to Redis");
        Ok(receivers)
    }

    async fn subscribe(&self, channels: &[String]) -> Result<Box<dyn Subscription>, BrokerError> {
        let mut pubsub = self
            .bounded(self.client.get_async_pubsub())
            .await
            .map_err(BrokerError::Subscribe)?;
        // SUBSCRIBE without arguments is an error; an empty set just never delivers
        if !channels.is_empty() {
            self.bounded(pubsub.subscribe(channels.to_vec()))
                .await
                .map_err(BrokerError::Subscribe)?;
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        let (control, control_rx) = mpsc::channel(1);
        let task = tokio::spawn(forward(pubsub, channels.to_vec(), tx, control_rx, self.command_timeout));

        Ok(Box::new(RedisSubscription {
            channels: channels.to_vec(),
            messages: Some(rx),
            control: Some(control),
            task: Some(task),
            command_timeout: self.command_timeout,
        }))
    }

    async fn subscriber_count(&self, channel: &str) -> Result<usize, BrokerError> {
        let mut conn = self.connection().await?;
        let mut numsub = ::redis::cmd("PUBSUB");
        numsub.arg("NUMSUB").arg(channel);
        let counts: Vec<(String, usize)> = self
            .bounded(numsub.query_async(&mut conn))
            .await
            .map_err(BrokerError::Unavailable)?;
        Ok(counts
            .into_iter()
            .find(|(name, _)| name == channel)
            .map_or(0, |(_, count)| count))
    }
}

enum Control {
    Unsubscribe(oneshot::Sender<Result<(), String>>),
}

/// Subscription handed out by `RedisBroker`
pub struct RedisSubscription {
    channels: Vec<String>,
    messages: Option<mpsc::Receiver<BrokerMessage>>,
    control: Option<mpsc::Sender<Control>>,
    task: Option<JoinHandle<()>>,
    command_timeout: Duration,
}

#[async_trait]
impl Subscription for RedisSubscription {
    fn channels(&self) -> &[String] {
        &self.channels
    }

    fn take_messages(&mut self) -> Option<mpsc::Receiver<BrokerMessage>> {
        self.messages.take()
    }

    async fn unsubscribe(&mut self) -> Result<(), BrokerError> {
        let Some(control) = &self.control else {
            return Ok(());
        };
        let (reply, response) = oneshot::channel();
        control
            .send(Control::Unsubscribe(reply))
            .await
            .map_err(|_| BrokerError::Closed)?;

        match timeout(self.command_timeout, response).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(message))) => Err(BrokerError::Unsubscribe(message)),
            Ok(Err(_)) => Err(BrokerError::Closed),
            Err(_) => Err(BrokerError::Unsubscribe(format!(
                "redis timeout after {:?}",
                self.command_timeout
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        // The forwarding task exits once its control channel is gone.
        self.control = None;
        if let Some(mut task) = self.task.take() {
            if timeout(self.command_timeout, &mut task).await.is_err() {
                task.abort();
                tracing::warn!(channels = ?self.channels, "[Broker] Redis subscription task aborted");
            }
        }
        Ok(())
    }
}

impl Drop for RedisSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Drive one pub/sub connection until the subscription is closed
async fn forward(
    mut pubsub: PubSub,
    channels: Vec<String>,
    tx: mpsc::Sender<BrokerMessage>,
    mut control: mpsc::Receiver<Control>,
    command_timeout: Duration,
) {
    let mut command = {
        let messages = pubsub.on_message();
        tokio::pin!(messages);
        loop {
            tokio::select! {
                command = control.recv() => break command,
                message = messages.next() => match message {
                    Some(message) => deliver(&tx, message),
                    None => {
                        tracing::warn!(?channels, "[Broker] Redis pub/sub connection lost");
                        break control.recv().await;
                    }
                },
            }
        }
    };

    // Delivery has stopped; only teardown requests are served from here.
    while let Some(Control::Unsubscribe(reply)) = command {
        let result = if channels.is_empty() {
            Ok(())
        } else {
            bounded(command_timeout, pubsub.unsubscribe(channels.clone())).await
        };
        let _ = reply.send(result);
        command = control.recv().await;
    }
    tracing::debug!(?channels, "[Broker] Redis subscription closed");
}

fn deliver(tx: &mpsc::Sender<BrokerMessage>, message: Msg) {
    let channel = message.get_channel_name();
    let payload: String = match message.get_payload() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(channel, "[Broker] Undecodable Redis payload dropped: {}", e);
            return;
        }
    };

    match tx.try_send(BrokerMessage::new(channel, payload)) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(channel, "[Broker] Delivery queue full, message dropped");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(channel, "[Broker] Subscriber gone, message dropped");
        }
    }
}
