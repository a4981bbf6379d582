use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

use awebot_slack::dispatch::{EventDispatcher, HandlerResult};
use awebot_slack::events::{EventContext, InboundEvent, SlackEnvelope};
use awebot_slack::source::EventSender;
use awebot_slack::wire::{self, IngressRequest};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-slack-signature";
const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const MAX_REQUEST_AGE_SECS: i64 = 300;

#[derive(Clone)]
pub struct WebhookState {
    dispatcher: Arc<EventDispatcher>,
    events: EventSender,
    signing_secret: Option<SecretString>,
}

impl WebhookState {
    pub fn new(
        dispatcher: Arc<EventDispatcher>,
        events: EventSender,
        signing_secret: Option<SecretString>,
    ) -> Self {
        Self { dispatcher, events, signing_secret }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("request timestamp is not a unix timestamp")]
    InvalidTimestamp,
    #[error("request timestamp is outside the replay window")]
    Stale,
    #[error("signature does not match request body")]
    Mismatch,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/slack/receive", post(receive)).with_state(state)
}

/// Checks Slack's v0 request signature: `HMAC-SHA256(secret, "v0:{ts}:{body}")`.
pub fn verify_signature(
    secret: &[u8],
    headers: &HeaderMap,
    body: &[u8],
    now_unix: i64,
) -> Result<(), SignatureError> {
    let timestamp = header_str(headers, TIMESTAMP_HEADER)
        .ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
    let signature = header_str(headers, SIGNATURE_HEADER)
        .ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

    let sent_at: i64 = timestamp.parse().map_err(|_| SignatureError::InvalidTimestamp)?;
    if (now_unix - sent_at).abs() > MAX_REQUEST_AGE_SECS {
        return Err(SignatureError::Stale);
    }

    let expected = signature
        .strip_prefix("v0=")
        .and_then(|digest| hex::decode(digest).ok())
        .ok_or(SignatureError::Mismatch)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::Mismatch)?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

async fn receive(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(secret) = &state.signing_secret {
        let verified = verify_signature(
            secret.expose_secret().as_bytes(),
            &headers,
            &body,
            Utc::now().timestamp(),
        );
        if let Err(error) = verified {
            warn!(
                event_name = "ingress.slack.rejected",
                error = %error,
                "rejected webhook request"
            );
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let is_form = header_str(&headers, CONTENT_TYPE.as_str())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
    let parsed = if is_form { wire::parse_form_body(&body) } else { wire::parse_json_body(&body) };

    match parsed {
        Ok(IngressRequest::UrlVerification { challenge }) => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(IngressRequest::Ignored { reason }) => {
            info!(event_name = "ingress.slack.ignored", reason = %reason, "ignored slack request");
            StatusCode::OK.into_response()
        }
        Ok(IngressRequest::Event(envelope)) => accept(&state, envelope).await,
        Err(error) => {
            warn!(
                event_name = "ingress.slack.malformed",
                error = %error,
                "undecodable slack request"
            );
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

/// Dialog submissions are answered inline so validation errors reach the
/// open dialog; everything else is queued and acknowledged immediately.
async fn accept(state: &WebhookState, envelope: SlackEnvelope) -> Response {
    if !matches!(envelope.event, InboundEvent::DialogSubmission(_)) {
        return match state.events.enqueue(envelope).await {
            Ok(()) => StatusCode::OK.into_response(),
            Err(error) => {
                warn!(
                    event_name = "ingress.slack.enqueue_failed",
                    error = %error,
                    "event queue unavailable"
                );
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
        };
    }

    let context = EventContext { correlation_id: envelope.envelope_id.clone() };
    match state.dispatcher.dispatch(&envelope, &context).await {
        Ok(HandlerResult::Rejected(errors)) => Json(json!({ "errors": errors })).into_response(),
        Ok(_) => StatusCode::OK.into_response(),
        Err(error) => {
            warn!(
                correlation_id = %context.correlation_id,
                error = %error,
                "dialog submission dispatch failed"
            );
            StatusCode::OK.into_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
