use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use awebot_core::ApplicationError;

use crate::payload::ReplyPayload;
use crate::sink::{ReplySink, ReplyTarget, SendError};

/// One scripted message. `delay_ms` is the minimum wait after the previous send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub payload: ReplyPayload,
    pub delay_ms: u64,
}

impl Turn {
    pub fn immediate(payload: ReplyPayload) -> Self {
        Self { payload, delay_ms: 0 }
    }

    pub fn after(delay_ms: u64, payload: ReplyPayload) -> Self {
        Self { payload, delay_ms }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub total_turns: usize,
    pub delivered: usize,
    pub failure: Option<SendError>,
}

impl SessionReport {
    pub fn completed(&self) -> bool {
        self.failure.is_none() && self.delivered == self.total_turns
    }
}

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("conversation task ended abnormally: {0}")]
    Join(String),
}

/// Handle to a running conversation. Dropping it does not stop the session.
pub struct SessionHandle {
    total_turns: usize,
    task: JoinHandle<SessionReport>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").field("total_turns", &self.total_turns).finish()
    }
}

impl SessionHandle {
    pub fn total_turns(&self) -> usize {
        self.total_turns
    }

    pub async fn wait(self) -> Result<SessionReport, ConversationError> {
        self.task.await.map_err(|error| ConversationError::Join(error.to_string()))
    }
}

/// Spawns the session on the current runtime and returns immediately.
pub fn start(
    sink: Arc<dyn ReplySink>,
    target: ReplyTarget,
    turns: Vec<Turn>,
    correlation_id: String,
) -> SessionHandle {
    let total_turns = turns.len();
    info!(
        event_name = "conversation.started",
        correlation_id = %correlation_id,
        channel_id = %target.channel_id,
        total_turns,
        "starting conversation session"
    );
    let task = tokio::spawn(run_session(sink, target, turns, correlation_id));
    SessionHandle { total_turns, task }
}

async fn run_session(
    sink: Arc<dyn ReplySink>,
    target: ReplyTarget,
    turns: Vec<Turn>,
    correlation_id: String,
) -> SessionReport {
    let total_turns = turns.len();
    let mut delivered = 0;

    for (index, turn) in turns.into_iter().enumerate() {
        if turn.delay_ms > 0 {
            tokio::time::sleep(turn.delay()).await;
        }

        match sink.post_message(&target, &turn.payload).await {
            Ok(_) => {
                delivered += 1;
                debug!(
                    event_name = "conversation.turn_sent",
                    correlation_id = %correlation_id,
                    turn = index,
                    "conversation turn delivered"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "conversation.turn_failed",
                    correlation_id = %correlation_id,
                    turn = index,
                    error = %error,
                    "conversation turn failed; ending session"
                );
                send_apology(sink.as_ref(), &target, &error, &correlation_id).await;
                return SessionReport { total_turns, delivered, failure: Some(error) };
            }
        }
    }

    info!(
        event_name = "conversation.finished",
        correlation_id = %correlation_id,
        delivered,
        "conversation session drained"
    );
    SessionReport { total_turns, delivered, failure: None }
}

async fn send_apology(
    sink: &dyn ReplySink,
    target: &ReplyTarget,
    error: &SendError,
    correlation_id: &str,
) {
    let interface =
        ApplicationError::DownstreamSend(error.to_string()).into_interface(correlation_id);
    let apology = ReplyPayload::text(interface.user_message());

    if let Err(apology_error) = sink.post_message(target, &apology).await {
        warn!(
            correlation_id = %correlation_id,
            error = %apology_error,
            "apology after failed conversation turn could not be delivered"
        );
    }
}
