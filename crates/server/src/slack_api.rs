use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use awebot_core::config::SlackConfig;
use awebot_slack::payload::{DialogSpec, ReplyPayload};
use awebot_slack::sink::{Ack, ReplySink, ReplyTarget, SendError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers replies through `response_url` and the Web API.
pub struct SlackApiSink {
    client: Client,
    api_base_url: String,
    bot_token: SecretString,
}

#[derive(Debug, Deserialize)]
struct WebApiResponse {
    ok: bool,
    error: Option<String>,
    ts: Option<String>,
}

#[derive(Serialize)]
struct ResponseUrlBody<'a> {
    #[serde(flatten)]
    payload: &'a ReplyPayload,
    replace_original: bool,
}

#[derive(Serialize)]
struct PostMessageBody<'a> {
    channel: &'a str,
    #[serde(flatten)]
    payload: &'a ReplyPayload,
}

#[derive(Serialize)]
struct OpenDialogBody<'a> {
    trigger_id: &'a str,
    dialog: &'a DialogSpec,
}

impl SlackApiSink {
    pub fn new(config: &SlackConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
        })
    }

    async fn post_to_response_url(
        &self,
        target: &ReplyTarget,
        payload: &ReplyPayload,
        replace_original: bool,
    ) -> Result<Ack, SendError> {
        if payload.is_empty() {
            debug!(channel_id = %target.channel_id, "skipping empty response_url payload");
            return Ok(Ack::default());
        }
        let url = target.response_url.as_deref().ok_or(SendError::MissingResponseUrl)?;

        let response = self
            .client
            .post(url)
            .json(&ResponseUrlBody { payload, replace_original })
            .send()
            .await
            .map_err(|error| SendError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(SendError::Rejected {
                method: "response_url".to_owned(),
                error: format!("response_url returned {}", response.status()),
            });
        }
        Ok(Ack::default())
    }

    async fn call_web_api<B: Serialize + Sync>(
        &self,
        method: &'static str,
        body: &B,
    ) -> Result<Ack, SendError> {
        let response = self
            .client
            .post(format!("{}/{method}", self.api_base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| SendError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(SendError::Rejected {
                method: method.to_owned(),
                error: format!("http status {}", response.status()),
            });
        }

        let decoded: WebApiResponse = response.json().await.map_err(|error| {
            SendError::Transport(format!("undecodable {method} response: {error}"))
        })?;
        if !decoded.ok {
            let error = decoded.error.unwrap_or_else(|| "unknown_error".to_owned());
            warn!(
                event_name = "egress.slack.rejected",
                method,
                error = %error,
                "slack web api call rejected"
            );
            return Err(SendError::Rejected { method: method.to_owned(), error });
        }

        Ok(Ack { message_ts: decoded.ts })
    }
}

#[async_trait]
impl ReplySink for SlackApiSink {
    /// Events API messages carry no `response_url`; those replies go to the channel.
    async fn reply(&self, target: &ReplyTarget, payload: &ReplyPayload) -> Result<Ack, SendError> {
        if target.response_url.is_none() {
            return self.post_message(target, payload).await;
        }
        self.post_to_response_url(target, payload, false).await
    }

    async fn replace_original(
        &self,
        target: &ReplyTarget,
        payload: &ReplyPayload,
    ) -> Result<Ack, SendError> {
        self.post_to_response_url(target, payload, true).await
    }

    async fn open_dialog(
        &self,
        target: &ReplyTarget,
        dialog: &DialogSpec,
    ) -> Result<Ack, SendError> {
        let trigger_id = target.trigger_id.as_deref().ok_or(SendError::MissingTriggerId)?;
        self.call_web_api("dialog.open", &OpenDialogBody { trigger_id, dialog }).await
    }

    async fn post_message(
        &self,
        target: &ReplyTarget,
        payload: &ReplyPayload,
    ) -> Result<Ack, SendError> {
        if payload.is_empty() {
            debug!(channel_id = %target.channel_id, "skipping empty chat.postMessage payload");
            return Ok(Ack::default());
        }
        let body = PostMessageBody { channel: &target.channel_id, payload };
        self.call_web_api("chat.postMessage", &body).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    use awebot_core::config::SlackConfig;
    use awebot_slack::cards;
    use awebot_slack::dispatch::OutcomeExecutor;
    use awebot_slack::events::{DirectMessage, EventContext, InboundEvent, SlackUser};
    use awebot_slack::payload::ReplyPayload;
    use awebot_slack::router::Router as SlackRouter;
    use awebot_slack::sink::{ReplySink, ReplyTarget, SendError};

    use super::SlackApiSink;

    #[derive(Clone, Default)]
    struct Captured {
        requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    }

    async fn capture(
        State(captured): State<Captured>,
        uri: axum::http::Uri,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        captured.requests.lock().await.push((uri.path().to_owned(), auth, body));
        if uri.path().ends_with("dialog.open") {
            Json(json!({ "ok": false, "error": "expired_trigger_id" }))
        } else {
            Json(json!({ "ok": true, "ts": "1700000000.000100" }))
        }
    }

    async fn fake_slack() -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/api/{method}", post(capture))
            .route("/hooks/{id}", post(capture))
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{address}"), captured)
    }

    fn sink(base: &str) -> SlackApiSink {
        SlackApiSink::new(&SlackConfig {
            bot_token: SecretString::from("xoxb-test".to_owned()),
            signing_secret: None,
            client_id: None,
            client_secret: None,
            api_base_url: format!("{base}/api/"),
        })
        .expect("client builds")
    }

    fn target(base: &str) -> ReplyTarget {
        ReplyTarget {
            channel_id: "D1".to_owned(),
            user_id: "U1".to_owned(),
            response_url: Some(format!("{base}/hooks/1")),
            trigger_id: Some("trig-1".to_owned()),
        }
    }

    #[tokio::test]
    async fn replace_original_posts_flag_to_response_url() {
        let (base, captured) = fake_slack().await;

        sink(&base)
            .replace_original(&target(&base), &cards::card_rejected())
            .await
            .expect("send");

        let requests = captured.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "/hooks/1");
        assert_eq!(requests[0].2["replace_original"], json!(true));
        assert_eq!(requests[0].2["text"], json!("...Damn you savage."));
    }

    #[tokio::test]
    async fn post_message_uses_bot_token_and_returns_timestamp() {
        let (base, captured) = fake_slack().await;

        let ack = sink(&base)
            .post_message(&target(&base), &ReplyPayload::text("hi"))
            .await
            .expect("send");

        let requests = captured.requests.lock().await;
        assert_eq!(ack.message_ts.as_deref(), Some("1700000000.000100"));
        assert_eq!(requests[0].0, "/api/chat.postMessage");
        assert_eq!(requests[0].1.as_deref(), Some("Bearer xoxb-test"));
        assert_eq!(requests[0].2["channel"], json!("D1"));
    }

    #[tokio::test]
    async fn empty_payloads_are_not_sent() {
        let (base, captured) = fake_slack().await;

        sink(&base).post_message(&target(&base), &ReplyPayload::empty()).await.expect("skip");

        assert!(captured.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn web_api_rejection_is_reported() {
        let (base, _captured) = fake_slack().await;
        let dialog = cards::intro_card_dialog().expect("dialog");

        let result = sink(&base).open_dialog(&target(&base), &dialog).await;

        assert_eq!(
            result,
            Err(SendError::Rejected {
                method: "dialog.open".to_owned(),
                error: "expired_trigger_id".to_owned()
            })
        );
    }

    #[tokio::test]
    async fn missing_handles_fail_without_network() {
        let sink = sink("http://127.0.0.1:9");
        let bare = ReplyTarget { channel_id: "D1".to_owned(), ..ReplyTarget::default() };

        assert_eq!(
            sink.replace_original(&bare, &ReplyPayload::text("hi")).await,
            Err(SendError::MissingResponseUrl)
        );
        let dialog = cards::intro_card_dialog().expect("dialog");
        assert_eq!(sink.open_dialog(&bare, &dialog).await, Err(SendError::MissingTriggerId));
    }

    #[tokio::test]
    async fn direct_message_reply_is_posted_to_the_dm_channel() {
        let (base, captured) = fake_slack().await;
        let event = InboundEvent::DirectMessage(DirectMessage {
            text: "something interactive please".to_owned(),
            user: SlackUser::new("U1", None),
            channel_id: "D42".to_owned(),
        });
        let resolution = SlackRouter::default().route(&event).expect("route");
        let executor = OutcomeExecutor::new(Arc::new(sink(&base)));

        executor
            .execute(resolution, &event.reply_target(), &EventContext::default())
            .await
            .expect("demo menu delivered");

        let requests = captured.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "/api/chat.postMessage");
        assert_eq!(requests[0].2["channel"], json!("D42"));
        assert_eq!(requests[0].2["attachments"][0]["callback_id"], json!("123"));
    }
}
