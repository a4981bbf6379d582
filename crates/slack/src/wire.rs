//! Decoding of Slack's HTTP deliveries into [`SlackEnvelope`]s.
//!
//! Slash commands arrive form-encoded, legacy interactive messages and dialog
//! submissions arrive form-encoded under a `payload=` JSON field, and the
//! Events API posts JSON.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use thiserror::Error;

use crate::events::{
    ActionInvocation, DialogSubmission, DirectMessage, InboundEvent, InteractiveInvocation,
    RoutingHandles, SelectedOption, SlackEnvelope, SlackUser, SlashCommand,
};

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("request body is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngressRequest {
    UrlVerification { challenge: String },
    Event(SlackEnvelope),
    Ignored { reason: String },
}

impl IngressRequest {
    fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored { reason: reason.into() }
    }
}

/// Decodes an `application/x-www-form-urlencoded` body.
pub fn parse_form_body(body: &[u8]) -> Result<IngressRequest, EventParseError> {
    std::str::from_utf8(body).map_err(|_| EventParseError::InvalidUtf8)?;
    let params: HashMap<String, String> = form_urlencoded::parse(body).into_owned().collect();

    match params.get("payload") {
        Some(payload) => parse_interactive_payload(payload),
        None => slash_command_from_params(&params),
    }
}

/// Decodes an Events API JSON body.
pub fn parse_json_body(body: &[u8]) -> Result<IngressRequest, EventParseError> {
    let wire: EventsApiWire = serde_json::from_slice(body)?;
    Ok(match wire {
        EventsApiWire::UrlVerification { challenge } => {
            IngressRequest::UrlVerification { challenge }
        }
        EventsApiWire::EventCallback { event_id, event } => direct_message(event_id, event)?,
        EventsApiWire::Other => IngressRequest::ignored("unsupported events api envelope"),
    })
}

/// Decodes the JSON carried in the `payload` form field.
pub fn parse_interactive_payload(payload: &str) -> Result<IngressRequest, EventParseError> {
    let wire: InteractivePayloadWire = serde_json::from_str(payload)?;
    let user = wire.user.ok_or(EventParseError::MissingField("user"))?;
    let user = SlackUser { id: user.id, name: user.name };
    let channel_id = wire.channel.map(|channel| channel.id).unwrap_or_default();
    let handles = RoutingHandles { response_url: wire.response_url, trigger_id: wire.trigger_id };
    let envelope_id = wire
        .action_ts
        .clone()
        .or_else(|| handles.trigger_id.clone())
        .unwrap_or_else(generated_envelope_id);

    let event = match wire.kind.as_str() {
        "interactive_message" => InboundEvent::InteractiveInvocation(InteractiveInvocation {
            callback_id: wire.callback_id,
            actions: wire.actions.into_iter().map(ActionInvocation::from).collect(),
            user,
            channel_id,
            original_message_ts: wire.message_ts,
            handles,
        }),
        "dialog_submission" => InboundEvent::DialogSubmission(DialogSubmission {
            callback_id: wire.callback_id,
            submission: wire
                .submission
                .into_iter()
                .filter_map(|(name, value)| value.map(|value| (name, value)))
                .collect(),
            user,
            channel_id,
            handles,
        }),
        other => return Ok(IngressRequest::ignored(format!("unsupported interaction `{other}`"))),
    };

    Ok(IngressRequest::Event(SlackEnvelope { envelope_id, event }))
}

/// Decodes a payload captured to disk: JSON (Events API, interactive payload,
/// or a slash command object) or a raw form body.
pub fn parse_recorded(raw: &str) -> Result<IngressRequest, EventParseError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('{') {
        return parse_form_body(trimmed.as_bytes());
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    if value.get("command").is_some() {
        let params: HashMap<String, String> = serde_json::from_value(value)?;
        return slash_command_from_params(&params);
    }

    match value.get("type").and_then(serde_json::Value::as_str) {
        Some("interactive_message" | "dialog_submission") => parse_interactive_payload(trimmed),
        _ => parse_json_body(trimmed.as_bytes()),
    }
}

fn slash_command_from_params(
    params: &HashMap<String, String>,
) -> Result<IngressRequest, EventParseError> {
    let command =
        params.get("command").cloned().ok_or(EventParseError::MissingField("command"))?;
    let user_id = params.get("user_id").cloned().ok_or(EventParseError::MissingField("user_id"))?;
    let trigger_id = params.get("trigger_id").cloned();
    let envelope_id = trigger_id.clone().unwrap_or_else(generated_envelope_id);

    let event = InboundEvent::SlashCommand(SlashCommand {
        command,
        text: params.get("text").cloned().unwrap_or_default(),
        user: SlackUser { id: user_id, name: params.get("user_name").cloned() },
        channel_id: params.get("channel_id").cloned().unwrap_or_default(),
        handles: RoutingHandles { response_url: params.get("response_url").cloned(), trigger_id },
    });

    Ok(IngressRequest::Event(SlackEnvelope { envelope_id, event }))
}

/// Only `message` events are decoded; other event types shape `user` and
/// `channel` differently and are ignored untouched.
fn direct_message(
    event_id: Option<String>,
    event: serde_json::Value,
) -> Result<IngressRequest, EventParseError> {
    let kind = event.get("type").and_then(serde_json::Value::as_str).unwrap_or("unknown");
    if kind != "message" {
        return Ok(IngressRequest::ignored(format!("unsupported event `{kind}`")));
    }

    let event: MessageEventWire = serde_json::from_value(event)?;
    if event.channel_type.as_deref() != Some("im") {
        return Ok(IngressRequest::ignored("message outside a direct conversation"));
    }
    if event.bot_id.is_some() || event.subtype.is_some() {
        return Ok(IngressRequest::ignored("bot or edited message"));
    }
    let (Some(user), Some(channel)) = (event.user, event.channel) else {
        return Ok(IngressRequest::ignored("message without user or channel"));
    };

    Ok(IngressRequest::Event(SlackEnvelope {
        envelope_id: event_id.unwrap_or_else(generated_envelope_id),
        event: InboundEvent::DirectMessage(DirectMessage {
            text: event.text.unwrap_or_default(),
            user: SlackUser { id: user, name: None },
            channel_id: channel,
        }),
    }))
}

fn generated_envelope_id() -> String {
    format!("awebot-{}", uuid::Uuid::new_v4())
}

#[derive(Deserialize)]
struct UserWire {
    id: String,
    #[serde(default, alias = "username")]
    name: Option<String>,
}

#[derive(Deserialize)]
struct ChannelWire {
    id: String,
}

#[derive(Deserialize)]
struct SelectedOptionWire {
    value: String,
}

#[derive(Deserialize)]
struct ActionWire {
    #[serde(default)]
    name: String,
    value: Option<String>,
    #[serde(default)]
    selected_options: Vec<SelectedOptionWire>,
}

impl From<ActionWire> for ActionInvocation {
    fn from(wire: ActionWire) -> Self {
        Self {
            name: wire.name,
            value: wire.value,
            selected_option: wire
                .selected_options
                .into_iter()
                .next()
                .map(|option| SelectedOption { value: option.value }),
        }
    }
}

#[derive(Deserialize)]
struct InteractivePayloadWire {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    callback_id: String,
    #[serde(default)]
    actions: Vec<ActionWire>,
    user: Option<UserWire>,
    channel: Option<ChannelWire>,
    message_ts: Option<String>,
    action_ts: Option<String>,
    response_url: Option<String>,
    trigger_id: Option<String>,
    #[serde(default)]
    submission: BTreeMap<String, Option<String>>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventsApiWire {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event_id: Option<String>,
        event: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct MessageEventWire {
    channel_type: Option<String>,
    text: Option<String>,
    user: Option<String>,
    channel: Option<String>,
    bot_id: Option<String>,
    subtype: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        parse_form_body, parse_interactive_payload, parse_json_body, parse_recorded,
        EventParseError, IngressRequest,
    };
    use crate::events::InboundEvent;

    fn form_encode(pairs: &[(&str, &str)]) -> String {
        form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish()
    }

    fn event(request: IngressRequest) -> InboundEvent {
        match request {
            IngressRequest::Event(envelope) => envelope.event,
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn slash_command_form_keeps_text_untrimmed() {
        let body = form_encode(&[
            ("command", "/introcards"),
            ("text", " Ada "),
            ("user_id", "U1"),
            ("user_name", "ada"),
            ("channel_id", "C1"),
            ("response_url", "https://hooks.slack.test/commands/1"),
            ("trigger_id", "trig-1"),
        ]);

        let InboundEvent::SlashCommand(command) = event(parse_form_body(body.as_bytes()).expect("parse"))
        else {
            panic!("expected slash command");
        };

        assert_eq!(command.command, "/introcards");
        assert_eq!(command.text, " Ada ");
        assert_eq!(command.user.name.as_deref(), Some("ada"));
        assert_eq!(command.handles.trigger_id.as_deref(), Some("trig-1"));
    }

    #[test]
    fn interactive_message_payload_uses_first_selected_option() {
        let payload = json!({
            "type": "interactive_message",
            "callback_id": "123",
            "actions": [{ "name": "form", "type": "select", "selected_options": [{ "value": "002" }] }],
            "user": { "id": "U1", "name": "ada" },
            "channel": { "id": "D1", "name": "directmessage" },
            "action_ts": "1700000000.1",
            "message_ts": "1700000000.0",
            "response_url": "https://hooks.slack.test/actions/1",
            "trigger_id": "trig-2"
        })
        .to_string();
        let body = form_encode(&[("payload", &payload)]);

        let request = parse_form_body(body.as_bytes()).expect("parse");
        let IngressRequest::Event(envelope) = request else {
            panic!("expected event");
        };
        let InboundEvent::InteractiveInvocation(invocation) = envelope.event else {
            panic!("expected interactive invocation");
        };

        assert_eq!(envelope.envelope_id, "1700000000.1");
        assert_eq!(invocation.callback_id, "123");
        assert_eq!(
            invocation.actions[0].selected_option.as_ref().map(|option| option.value.as_str()),
            Some("002")
        );
        assert_eq!(invocation.original_message_ts.as_deref(), Some("1700000000.0"));
    }

    #[test]
    fn dialog_submission_drops_null_optional_fields() {
        let payload = json!({
            "type": "dialog_submission",
            "callback_id": "dialog",
            "submission": { "name": "Ada", "email": "ada@berkeley.edu", "num": null },
            "user": { "id": "U1", "name": "ada" },
            "channel": { "id": "D1" },
            "response_url": "https://hooks.slack.test/dialog/1"
        })
        .to_string();

        let InboundEvent::DialogSubmission(submission) =
            event(parse_interactive_payload(&payload).expect("parse"))
        else {
            panic!("expected dialog submission");
        };

        assert_eq!(submission.submission.len(), 2);
        assert_eq!(submission.submission.get("name").map(String::as_str), Some("Ada"));
    }

    #[test]
    fn interactive_payload_without_user_is_rejected() {
        let payload = json!({ "type": "interactive_message", "callback_id": "123" }).to_string();

        assert!(matches!(
            parse_interactive_payload(&payload),
            Err(EventParseError::MissingField("user"))
        ));
    }

    #[test]
    fn block_kit_interactions_are_ignored() {
        let payload = json!({ "type": "block_actions", "user": { "id": "U1" } }).to_string();

        assert!(matches!(
            parse_interactive_payload(&payload).expect("parse"),
            IngressRequest::Ignored { .. }
        ));
    }

    #[test]
    fn url_verification_echoes_challenge() {
        let body = json!({ "type": "url_verification", "challenge": "abc123" }).to_string();

        assert_eq!(
            parse_json_body(body.as_bytes()).expect("parse"),
            IngressRequest::UrlVerification { challenge: "abc123".to_owned() }
        );
    }

    #[test]
    fn non_message_events_with_object_fields_are_ignored() {
        let team_join = json!({
            "type": "event_callback",
            "event_id": "Ev2",
            "event": { "type": "team_join", "user": { "id": "U9", "name": "newbie" } }
        })
        .to_string();
        let channel_created = json!({
            "type": "event_callback",
            "event": { "type": "channel_created", "channel": { "id": "C9", "name": "general" } }
        })
        .to_string();

        for body in [team_join, channel_created] {
            assert!(matches!(
                parse_json_body(body.as_bytes()).expect("parse"),
                IngressRequest::Ignored { .. }
            ));
        }
    }

    #[test]
    fn direct_messages_become_events_but_bot_messages_do_not() {
        let human = json!({
            "type": "event_callback",
            "event_id": "Ev1",
            "event": { "type": "message", "channel_type": "im", "text": "interactive please", "user": "U1", "channel": "D1" }
        })
        .to_string();
        let bot = json!({
            "type": "event_callback",
            "event": { "type": "message", "channel_type": "im", "text": "interactive", "bot_id": "B1", "channel": "D1" }
        })
        .to_string();

        let InboundEvent::DirectMessage(message) =
            event(parse_json_body(human.as_bytes()).expect("parse"))
        else {
            panic!("expected direct message");
        };
        assert_eq!(message.text, "interactive please");
        assert!(matches!(
            parse_json_body(bot.as_bytes()).expect("parse"),
            IngressRequest::Ignored { .. }
        ));
    }

    #[test]
    fn recorded_payloads_are_detected_by_shape() {
        let slash = json!({ "command": "/introcards", "text": "", "user_id": "U1", "user_name": "ada" });
        assert!(matches!(
            event(parse_recorded(&slash.to_string()).expect("parse")),
            InboundEvent::SlashCommand(_)
        ));

        let interactive = json!({
            "type": "interactive_message",
            "callback_id": "introcard",
            "actions": [{ "name": "no2" }],
            "user": { "id": "U1", "name": "ada" }
        });
        assert!(matches!(
            event(parse_recorded(&interactive.to_string()).expect("parse")),
            InboundEvent::InteractiveInvocation(_)
        ));

        let form = "command=%2Fintrocards&text=Ada&user_id=U1&user_name=ada\n";
        assert!(matches!(event(parse_recorded(form).expect("parse")), InboundEvent::SlashCommand(_)));
    }
}
