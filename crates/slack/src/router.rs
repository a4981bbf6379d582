//! Resolves one inbound event to the ordered outcomes the send boundary should
//! perform.
//!
//! Routes live in an explicit table of `(priority, pattern, handler)` entries
//! built when the router is constructed. The lowest priority number that
//! matches wins, so exact action names are registered ahead of the prefix
//! fallbacks that share their callback id. The router holds no mutable state
//! and never performs I/O.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use awebot_core::config::IntroCardConfig;
use awebot_core::{ApplicationError, DomainError};

use crate::cards;
use crate::conversation::Turn;
use crate::events::{InboundEvent, InteractiveInvocation};
use crate::payload::{DialogSpec, PayloadError, ReplyPayload};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "payload", rename_all = "snake_case")]
pub enum RouterOutcome {
    Reply(ReplyPayload),
    ReplaceOriginal(ReplyPayload),
    OpenDialog(DialogSpec),
    StartConversation(Vec<Turn>),
    Acknowledge,
    NoMatch,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub route: Option<&'static str>,
    pub outcomes: Vec<RouterOutcome>,
}

impl Resolution {
    pub fn no_match() -> Self {
        Self { route: None, outcomes: vec![RouterOutcome::NoMatch] }
    }

    pub fn is_no_match(&self) -> bool {
        self.route.is_none()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("malformed event: missing or empty `{field}`")]
    MalformedEvent { field: &'static str },
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl From<RouterError> for ApplicationError {
    fn from(value: RouterError) -> Self {
        match value {
            RouterError::MalformedEvent { field } => {
                DomainError::MalformedEvent { field: field.to_owned() }.into()
            }
            RouterError::Payload(error) => DomainError::InvariantViolation(error.to_string()).into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterSettings {
    pub conversation_delay_ms: u64,
    pub community_name: String,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self { conversation_delay_ms: 2_000, community_name: "AWE".to_owned() }
    }
}

impl From<&IntroCardConfig> for RouterSettings {
    fn from(config: &IntroCardConfig) -> Self {
        Self {
            conversation_delay_ms: config.conversation_delay_ms,
            community_name: config.community_name.clone(),
        }
    }
}

/// Matching key for interactive events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteKey<'a> {
    pub callback_id: &'a str,
    pub action_name: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionMatcher {
    Any,
    Exact(&'static str),
    Prefix(&'static str),
}

impl ActionMatcher {
    fn matches(&self, action_name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => action_name == *expected,
            Self::Prefix(prefix) => action_name.starts_with(prefix),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutePattern {
    Interactive { callback_ids: &'static [&'static str], action: ActionMatcher },
    SlashCommand { command: &'static str },
    /// Case-insensitive substring match on a direct message.
    DirectMessageContaining { needle: &'static str },
    DialogSubmission,
}

impl RoutePattern {
    fn matches(&self, event: &InboundEvent, key: Option<RouteKey<'_>>) -> bool {
        match (self, event) {
            (Self::Interactive { callback_ids, action }, InboundEvent::InteractiveInvocation(_)) => {
                key.is_some_and(|key| {
                    callback_ids.contains(&key.callback_id) && action.matches(key.action_name)
                })
            }
            (Self::SlashCommand { command }, InboundEvent::SlashCommand(slash)) => {
                slash.command == *command
            }
            (Self::DirectMessageContaining { needle }, InboundEvent::DirectMessage(message)) => {
                message.text.to_lowercase().contains(&needle.to_lowercase())
            }
            (Self::DialogSubmission, InboundEvent::DialogSubmission(_)) => true,
            _ => false,
        }
    }
}

pub struct RouteRequest<'a> {
    pub event: &'a InboundEvent,
    pub settings: &'a RouterSettings,
}

pub type RouteHandler = fn(&RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError>;

#[derive(Clone, Copy)]
pub struct RouteEntry {
    pub name: &'static str,
    pub priority: u16,
    pub pattern: RoutePattern,
    pub handler: RouteHandler,
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

const DEMO: &[&str] = &[cards::DEMO_CALLBACK_ID];
const DIALOG: &[&str] = &[cards::DIALOG_CALLBACK_ID];
const INTRO_CARD: &[&str] =
    &[cards::INTRO_CARD_CALLBACK_ID, cards::INTRO_CARD_CONFIRM_CALLBACK_ID];

pub fn intro_card_routes() -> Vec<RouteEntry> {
    use ActionMatcher::{Any, Exact, Prefix};

    let interactive = |callback_ids, action| RoutePattern::Interactive { callback_ids, action };

    vec![
        RouteEntry {
            name: "demo.yes",
            priority: 10,
            pattern: interactive(DEMO, Exact("yes")),
            handler: demo_yes,
        },
        RouteEntry {
            name: "demo.no",
            priority: 11,
            pattern: interactive(DEMO, Prefix("no")),
            handler: demo_no,
        },
        RouteEntry {
            name: "demo.form",
            priority: 12,
            pattern: interactive(DEMO, Exact("form")),
            handler: demo_form,
        },
        RouteEntry {
            name: "dialog.open",
            priority: 20,
            pattern: interactive(DIALOG, Any),
            handler: open_intro_card_dialog,
        },
        RouteEntry {
            name: "introcard.yes2",
            priority: 30,
            pattern: interactive(INTRO_CARD, Exact("yes2")),
            handler: intro_card_second_chance,
        },
        RouteEntry {
            name: "introcard.yes",
            priority: 31,
            pattern: interactive(INTRO_CARD, Exact("yes")),
            handler: intro_card_accepted,
        },
        RouteEntry {
            name: "introcard.no2",
            priority: 32,
            pattern: interactive(INTRO_CARD, Exact("no2")),
            handler: intro_card_rejected,
        },
        RouteEntry {
            name: "introcard.no",
            priority: 33,
            pattern: interactive(INTRO_CARD, Exact("no")),
            handler: intro_card_confirm_reject,
        },
        RouteEntry {
            name: "introcard.yes_fallback",
            priority: 38,
            pattern: interactive(INTRO_CARD, Prefix("yes")),
            handler: acknowledge,
        },
        RouteEntry {
            name: "introcard.no_fallback",
            priority: 39,
            pattern: interactive(INTRO_CARD, Prefix("no")),
            handler: acknowledge,
        },
        RouteEntry {
            name: "slash.introcards",
            priority: 40,
            pattern: RoutePattern::SlashCommand { command: cards::INTRO_CARDS_COMMAND },
            handler: intro_cards_command,
        },
        RouteEntry {
            name: "dm.interactive",
            priority: 50,
            pattern: RoutePattern::DirectMessageContaining { needle: "interactive" },
            handler: demo_menu,
        },
        RouteEntry {
            name: "dialog.submission",
            priority: 60,
            pattern: RoutePattern::DialogSubmission,
            handler: submission_accepted,
        },
    ]
}

pub struct Router {
    settings: RouterSettings,
    routes: Vec<RouteEntry>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterSettings::default())
    }
}

impl Router {
    pub fn new(settings: RouterSettings) -> Self {
        Self::with_routes(settings, intro_card_routes())
    }

    pub fn with_routes(settings: RouterSettings, mut routes: Vec<RouteEntry>) -> Self {
        routes.sort_by_key(|route| route.priority);
        Self { settings, routes }
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn route(&self, event: &InboundEvent) -> Result<Resolution, RouterError> {
        check_well_formed(event)?;
        let key = route_key(event);

        let Some(entry) = self.routes.iter().find(|entry| entry.pattern.matches(event, key)) else {
            debug!(
                callback_id = event.callback_id().unwrap_or("none"),
                action_name = key.map_or("none", |key| key.action_name),
                "no route matched inbound event"
            );
            return Ok(Resolution::no_match());
        };

        let request = RouteRequest { event, settings: &self.settings };
        let outcomes = (entry.handler)(&request)?;
        debug!(
            route = entry.name,
            callback_id = event.callback_id().unwrap_or("none"),
            outcomes = outcomes.len(),
            "inbound event routed"
        );

        Ok(Resolution { route: Some(entry.name), outcomes })
    }
}

fn route_key(event: &InboundEvent) -> Option<RouteKey<'_>> {
    let InboundEvent::InteractiveInvocation(invocation) = event else {
        return None;
    };
    invocation.first_action().map(|action| RouteKey {
        callback_id: invocation.callback_id.as_str(),
        action_name: action.name.as_str(),
    })
}

fn check_well_formed(event: &InboundEvent) -> Result<(), RouterError> {
    let malformed = |field| Err(RouterError::MalformedEvent { field });

    match event {
        InboundEvent::InteractiveInvocation(invocation) => {
            if invocation.callback_id.trim().is_empty() {
                return malformed("callback_id");
            }
            let Some(action) = invocation.first_action() else {
                return malformed("actions");
            };
            if action.name.trim().is_empty() {
                return malformed("actions[0].name");
            }
            if invocation.user.display_name().is_none() {
                return malformed("user.name");
            }
        }
        InboundEvent::DialogSubmission(submission) => {
            if submission.callback_id.trim().is_empty() {
                return malformed("callback_id");
            }
        }
        InboundEvent::SlashCommand(command) => {
            if command.command.trim().is_empty() {
                return malformed("command");
            }
            if command.user.display_name().is_none() {
                return malformed("user_name");
            }
        }
        InboundEvent::DirectMessage(_) => {}
    }

    Ok(())
}

fn invocation<'a>(request: &RouteRequest<'a>) -> Result<&'a InteractiveInvocation, RouterError> {
    match request.event {
        InboundEvent::InteractiveInvocation(invocation) => Ok(invocation),
        _ => Err(RouterError::MalformedEvent { field: "callback_id" }),
    }
}

fn demo_yes(request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    let invocation = invocation(request)?;
    Ok(vec![RouterOutcome::ReplaceOriginal(cards::demo_followup(&invocation.callback_id))])
}

fn demo_no(_request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    Ok(vec![RouterOutcome::Reply(cards::demo_declined())])
}

fn demo_form(request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    let invocation = invocation(request)?;
    let selected = invocation
        .first_action()
        .and_then(|action| action.selected_option.as_ref())
        .ok_or(RouterError::MalformedEvent { field: "actions[0].selected_options" })?;
    let user_name =
        invocation.user.display_name().ok_or(RouterError::MalformedEvent { field: "user.name" })?;

    debug!(
        selected_option = %selected.value,
        user_id = %invocation.user.id,
        "form menu option selected"
    );
    Ok(vec![RouterOutcome::OpenDialog(cards::getting_to_know_you_dialog(user_name)?)])
}

fn open_intro_card_dialog(_request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    let dialog = cards::intro_card_dialog()?;
    Ok(vec![
        RouterOutcome::ReplaceOriginal(cards::dialog_notice()),
        RouterOutcome::OpenDialog(dialog),
    ])
}

fn intro_card_second_chance(
    _request: &RouteRequest<'_>,
) -> Result<Vec<RouterOutcome>, RouterError> {
    Ok(vec![RouterOutcome::ReplaceOriginal(cards::card_second_chance())])
}

fn intro_card_accepted(request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    Ok(vec![
        RouterOutcome::ReplaceOriginal(cards::card_accepted()),
        RouterOutcome::StartConversation(cards::card_conversation(
            request.settings.conversation_delay_ms,
        )),
    ])
}

fn intro_card_rejected(_request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    Ok(vec![RouterOutcome::ReplaceOriginal(cards::card_rejected())])
}

fn intro_card_confirm_reject(
    _request: &RouteRequest<'_>,
) -> Result<Vec<RouterOutcome>, RouterError> {
    Ok(vec![RouterOutcome::ReplaceOriginal(cards::card_reject_confirmation())])
}

fn acknowledge(_request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    Ok(vec![RouterOutcome::Acknowledge])
}

fn intro_cards_command(request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    let InboundEvent::SlashCommand(command) = request.event else {
        return Err(RouterError::MalformedEvent { field: "command" });
    };

    let text = command.text.as_str();
    let reply = if text.is_empty() {
        cards::card_entry()
    } else if is_plain_name(text) {
        cards::name_search(text)
    } else {
        cards::name_rejected(text, &request.settings.community_name)
    };

    Ok(vec![RouterOutcome::Reply(reply)])
}

/// Letters, commas and spaces only.
fn is_plain_name(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| ch.is_ascii_alphabetic() || ch == ',' || ch == ' ')
}

fn demo_menu(_request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    Ok(vec![RouterOutcome::Reply(cards::demo_menu())])
}

fn submission_accepted(request: &RouteRequest<'_>) -> Result<Vec<RouterOutcome>, RouterError> {
    Ok(vec![
        RouterOutcome::Acknowledge,
        RouterOutcome::Reply(cards::submission_success(&request.settings.community_name)),
    ])
}
