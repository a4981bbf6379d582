use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::payload::{DialogSpec, ReplyPayload};

/// Where a reply goes. `response_url` and `trigger_id` are only present on
/// events Slack issued them for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplyTarget {
    pub channel_id: String,
    pub user_id: String,
    pub response_url: Option<String>,
    pub trigger_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ack {
    pub message_ts: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("event carried no response_url to reply through")]
    MissingResponseUrl,
    #[error("event carried no trigger_id; dialogs cannot be opened")]
    MissingTriggerId,
    #[error("slack rejected `{method}`: {error}")]
    Rejected { method: String, error: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Posts alongside the original message.
    async fn reply(&self, target: &ReplyTarget, payload: &ReplyPayload) -> Result<Ack, SendError>;
    async fn replace_original(
        &self,
        target: &ReplyTarget,
        payload: &ReplyPayload,
    ) -> Result<Ack, SendError>;
    async fn open_dialog(&self, target: &ReplyTarget, dialog: &DialogSpec)
        -> Result<Ack, SendError>;
    /// Fresh message in the target channel; used for conversation turns.
    async fn post_message(
        &self,
        target: &ReplyTarget,
        payload: &ReplyPayload,
    ) -> Result<Ack, SendError>;
}

/// Stands in for Slack when no bot token is configured.
#[derive(Default)]
pub struct LoggingSink;

impl LoggingSink {
    fn log(method: &'static str, target: &ReplyTarget, body: Result<String, serde_json::Error>) {
        let body = body.unwrap_or_else(|error| format!("<unserializable: {error}>"));
        info!(
            event_name = "egress.slack.logged",
            method,
            channel_id = %target.channel_id,
            user_id = %target.user_id,
            body = %body,
            "no bot token configured; logging outbound payload instead of sending"
        );
    }
}

#[async_trait]
impl ReplySink for LoggingSink {
    async fn reply(&self, target: &ReplyTarget, payload: &ReplyPayload) -> Result<Ack, SendError> {
        Self::log("reply", target, serde_json::to_string(payload));
        Ok(Ack::default())
    }

    async fn replace_original(
        &self,
        target: &ReplyTarget,
        payload: &ReplyPayload,
    ) -> Result<Ack, SendError> {
        Self::log("replace_original", target, serde_json::to_string(payload));
        Ok(Ack::default())
    }

    async fn open_dialog(
        &self,
        target: &ReplyTarget,
        dialog: &DialogSpec,
    ) -> Result<Ack, SendError> {
        Self::log("dialog.open", target, serde_json::to_string(dialog));
        Ok(Ack::default())
    }

    async fn post_message(
        &self,
        target: &ReplyTarget,
        payload: &ReplyPayload,
    ) -> Result<Ack, SendError> {
        Self::log("chat.postMessage", target, serde_json::to_string(payload));
        Ok(Ack::default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkCall {
    Reply(ReplyPayload),
    ReplaceOriginal(ReplyPayload),
    OpenDialog(DialogSpec),
    PostMessage(ReplyPayload),
}

#[derive(Clone, Debug)]
pub struct RecordedSend {
    pub call: SinkCall,
    pub target: ReplyTarget,
    pub at: tokio::time::Instant,
}

/// In-memory sink that records every call, optionally failing chosen calls.
#[derive(Default)]
pub struct RecordingSink {
    state: Mutex<RecordingState>,
}

#[derive(Default)]
struct RecordingState {
    sent: Vec<RecordedSend>,
    attempts: usize,
    fail_on_attempts: Vec<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the listed zero-based call attempts with a transport error.
    pub fn failing_on(attempts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            state: Mutex::new(RecordingState {
                fail_on_attempts: attempts.into_iter().collect(),
                ..RecordingState::default()
            }),
        }
    }

    pub async fn sent(&self) -> Vec<RecordedSend> {
        self.state.lock().await.sent.clone()
    }

    pub async fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().await.sent.iter().map(|send| send.call.clone()).collect()
    }

    async fn record(&self, target: &ReplyTarget, call: SinkCall) -> Result<Ack, SendError> {
        let mut state = self.state.lock().await;
        let attempt = state.attempts;
        state.attempts += 1;
        if state.fail_on_attempts.contains(&attempt) {
            return Err(SendError::Transport(format!("scripted failure on attempt {attempt}")));
        }

        state.sent.push(RecordedSend {
            call,
            target: target.clone(),
            at: tokio::time::Instant::now(),
        });
        Ok(Ack { message_ts: Some(format!("{attempt}.000100")) })
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn reply(&self, target: &ReplyTarget, payload: &ReplyPayload) -> Result<Ack, SendError> {
        self.record(target, SinkCall::Reply(payload.clone())).await
    }

    async fn replace_original(
        &self,
        target: &ReplyTarget,
        payload: &ReplyPayload,
    ) -> Result<Ack, SendError> {
        self.record(target, SinkCall::ReplaceOriginal(payload.clone())).await
    }

    async fn open_dialog(
        &self,
        target: &ReplyTarget,
        dialog: &DialogSpec,
    ) -> Result<Ack, SendError> {
        self.record(target, SinkCall::OpenDialog(dialog.clone())).await
    }

    async fn post_message(
        &self,
        target: &ReplyTarget,
        payload: &ReplyPayload,
    ) -> Result<Ack, SendError> {
        self.record(target, SinkCall::PostMessage(payload.clone())).await
    }
}
