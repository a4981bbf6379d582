use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::dispatch::{EventDispatcher, HandlerResult};
use crate::events::{EventContext, SlackEnvelope};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("event source failed to connect: {0}")]
    Connect(String),
    #[error("event source read failed: {0}")]
    Receive(String),
    #[error("event source ack failed: {0}")]
    Acknowledge(String),
    #[error("event source disconnect failed: {0}")]
    Disconnect(String),
    #[error("event queue is closed")]
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = 1_u64 << attempt.min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms))
    }
}

/// A stream of decoded Slack envelopes. `Ok(None)` from `next_envelope` ends the stream.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn connect(&self) -> Result<(), SourceError>;
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, SourceError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), SourceError>;
    async fn disconnect(&self) -> Result<(), SourceError>;
}

/// Producer half of [`ChannelEventSource`], held by the HTTP ingress.
#[derive(Clone, Debug)]
pub struct EventSender {
    inner: mpsc::Sender<SlackEnvelope>,
}

impl EventSender {
    pub async fn enqueue(&self, envelope: SlackEnvelope) -> Result<(), SourceError> {
        self.inner.send(envelope).await.map_err(|_| SourceError::Closed)
    }
}

/// Queue-backed source. The HTTP layer acknowledges Slack before enqueueing,
/// so `acknowledge` only records the hand-off.
pub struct ChannelEventSource {
    receiver: Mutex<mpsc::Receiver<SlackEnvelope>>,
}

impl ChannelEventSource {
    pub fn channel(capacity: usize) -> (EventSender, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (EventSender { inner: sender }, Self { receiver: Mutex::new(receiver) })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn connect(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, SourceError> {
        Ok(self.receiver.lock().await.recv().await)
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), SourceError> {
        debug!(envelope_id, "envelope already acknowledged over http");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SourceError> {
        self.receiver.lock().await.close();
        Ok(())
    }
}

pub struct EventSourceRunner {
    source: Arc<dyn EventSource>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl EventSourceRunner {
    pub fn new(
        source: Arc<dyn EventSource>,
        dispatcher: Arc<EventDispatcher>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { source, dispatcher, reconnect_policy }
    }

    /// Pumps envelopes until the source closes. Retries exhausted are logged,
    /// never propagated.
    pub async fn start(&self) {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return,
                Err(source_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %source_error,
                        "event source failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "event source retries exhausted; no further events will be routed"
                        );
                        return;
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), SourceError> {
        self.source.connect().await?;
        info!(attempt, "event source connected");

        loop {
            let Some(envelope) = self.source.next_envelope().await? else {
                info!(attempt, "event source closed");
                self.source.disconnect().await?;
                return Ok(());
            };
            let user = envelope.event.user();

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                user_id = %user.id,
                callback_id = envelope.event.callback_id().unwrap_or("none"),
                "received slack envelope"
            );

            if let Err(error) = self.source.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Delivered { route, sessions }) => debug!(
                    correlation_id = %envelope.envelope_id,
                    route = route.unwrap_or("none"),
                    sessions = sessions.len(),
                    "slack envelope handled"
                ),
                Ok(HandlerResult::Rejected(errors)) => warn!(
                    correlation_id = %envelope.envelope_id,
                    errors = errors.len(),
                    "queued submission failed validation; errors cannot reach the dialog"
                ),
                Ok(HandlerResult::Ignored) => debug!(
                    correlation_id = %envelope.envelope_id,
                    "slack envelope ignored"
                ),
                Err(error) => warn!(
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "event dispatch failed; continuing event loop"
                ),
            }
        }
    }
}
