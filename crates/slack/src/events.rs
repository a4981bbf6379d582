use serde::Serialize;

use awebot_core::FormSubmission;

use crate::sink::ReplyTarget;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: InboundEvent,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SlackUser {
    pub id: String,
    pub name: Option<String>,
}

impl SlackUser {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self { id: id.into(), name: name.map(str::to_owned) }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RoutingHandles {
    pub response_url: Option<String>,
    pub trigger_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectedOption {
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionInvocation {
    pub name: String,
    pub value: Option<String>,
    pub selected_option: Option<SelectedOption>,
}

impl ActionInvocation {
    pub fn button(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: Some(value.into()), selected_option: None }
    }

    pub fn menu(name: impl Into<String>, selected: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            selected_option: Some(SelectedOption { value: selected.into() }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectMessage {
    pub text: String,
    pub user: SlackUser,
    pub channel_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InteractiveInvocation {
    pub callback_id: String,
    pub actions: Vec<ActionInvocation>,
    pub user: SlackUser,
    pub channel_id: String,
    pub original_message_ts: Option<String>,
    pub handles: RoutingHandles,
}

impl InteractiveInvocation {
    /// Only the first action is authoritative.
    pub fn first_action(&self) -> Option<&ActionInvocation> {
        self.actions.first()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DialogSubmission {
    pub callback_id: String,
    pub submission: FormSubmission,
    pub user: SlackUser,
    pub channel_id: String,
    pub handles: RoutingHandles,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlashCommand {
    pub command: String,
    pub text: String,
    pub user: SlackUser,
    pub channel_id: String,
    pub handles: RoutingHandles,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    DirectMessage(DirectMessage),
    InteractiveInvocation(InteractiveInvocation),
    DialogSubmission(DialogSubmission),
    SlashCommand(SlashCommand),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InboundEventType {
    DirectMessage,
    InteractiveInvocation,
    DialogSubmission,
    SlashCommand,
}

impl InboundEvent {
    pub fn event_type(&self) -> InboundEventType {
        match self {
            Self::DirectMessage(_) => InboundEventType::DirectMessage,
            Self::InteractiveInvocation(_) => InboundEventType::InteractiveInvocation,
            Self::DialogSubmission(_) => InboundEventType::DialogSubmission,
            Self::SlashCommand(_) => InboundEventType::SlashCommand,
        }
    }

    pub fn user(&self) -> &SlackUser {
        match self {
            Self::DirectMessage(event) => &event.user,
            Self::InteractiveInvocation(event) => &event.user,
            Self::DialogSubmission(event) => &event.user,
            Self::SlashCommand(event) => &event.user,
        }
    }

    pub fn callback_id(&self) -> Option<&str> {
        match self {
            Self::InteractiveInvocation(event) => Some(&event.callback_id),
            Self::DialogSubmission(event) => Some(&event.callback_id),
            Self::DirectMessage(_) | Self::SlashCommand(_) => None,
        }
    }

    pub fn reply_target(&self) -> ReplyTarget {
        let (channel_id, handles) = match self {
            Self::DirectMessage(event) => (&event.channel_id, None),
            Self::InteractiveInvocation(event) => (&event.channel_id, Some(&event.handles)),
            Self::DialogSubmission(event) => (&event.channel_id, Some(&event.handles)),
            Self::SlashCommand(event) => (&event.channel_id, Some(&event.handles)),
        };

        ReplyTarget {
            channel_id: channel_id.clone(),
            user_id: self.user().id.clone(),
            response_url: handles.and_then(|handles| handles.response_url.clone()),
            trigger_id: handles.and_then(|handles| handles.trigger_id.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ActionInvocation, InboundEvent, InboundEventType, InteractiveInvocation, RoutingHandles,
        SlackUser,
    };

    #[test]
    fn reply_target_carries_routing_handles() {
        let event = InboundEvent::InteractiveInvocation(InteractiveInvocation {
            callback_id: "introcard".to_owned(),
            actions: vec![ActionInvocation::button("yes", "yes")],
            user: SlackUser::new("U1", Some("ada")),
            channel_id: "D1".to_owned(),
            original_message_ts: Some("1.2".to_owned()),
            handles: RoutingHandles {
                response_url: Some("https://hooks.slack.test/r/1".to_owned()),
                trigger_id: Some("trig-1".to_owned()),
            },
        });

        let target = event.reply_target();

        assert_eq!(event.event_type(), InboundEventType::InteractiveInvocation);
        assert_eq!(event.callback_id(), Some("introcard"));
        assert_eq!(target.channel_id, "D1");
        assert_eq!(target.user_id, "U1");
        assert_eq!(target.trigger_id.as_deref(), Some("trig-1"));
    }

    #[test]
    fn blank_user_names_are_not_display_names() {
        assert_eq!(SlackUser::new("U1", Some("  ")).display_name(), None);
        assert_eq!(SlackUser::new("U1", Some("ada")).display_name(), Some("ada"));
    }
}
