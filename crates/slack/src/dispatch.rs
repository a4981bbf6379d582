use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use awebot_core::{DomainError, FormValidator, ProfileStore, UserProfile, ValidationError};

use crate::conversation::{self, SessionHandle};
use crate::events::{
    DialogSubmission, EventContext, InboundEvent, InboundEventType, SlackEnvelope,
};
use crate::router::{Resolution, Router, RouterError, RouterOutcome};
use crate::sink::{ReplySink, ReplyTarget, SendError};

#[derive(Debug)]
pub enum HandlerResult {
    /// Outcomes were executed; `sessions` holds any conversations still running.
    Delivered { route: Option<&'static str>, sessions: Vec<SessionHandle> },
    /// The submission failed validation and must be answered with these errors.
    Rejected(Vec<ValidationError>),
    Ignored,
}

impl HandlerResult {
    pub fn route(&self) -> Option<&'static str> {
        match self {
            Self::Delivered { route, .. } => *route,
            Self::Rejected(_) | Self::Ignored => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] RouterError),
    #[error("outcome `{outcome}` could not be delivered: {source}")]
    Send { outcome: &'static str, source: SendError },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> InboundEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<InboundEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Wires every inbound event type to the router, with dialog submissions
/// passing through the validation guard first.
pub fn intro_card_dispatcher(
    router: Arc<Router>,
    executor: Arc<OutcomeExecutor>,
    guard: SubmissionGuard,
    profiles: Arc<dyn ProfileStore>,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    for event_type in [
        InboundEventType::DirectMessage,
        InboundEventType::InteractiveInvocation,
        InboundEventType::SlashCommand,
    ] {
        dispatcher.register(RoutedEventHandler::new(event_type, router.clone(), executor.clone()));
    }
    dispatcher.register(SubmissionHandler::new(guard, profiles, router, executor));
    dispatcher
}

/// Middleware run on dialog submissions before they reach the router.
#[derive(Clone, Debug)]
pub struct SubmissionGuard {
    validator: FormValidator,
}

pub enum GuardDecision {
    Proceed,
    Reject(Vec<ValidationError>),
}

impl GuardDecision {
    pub fn as_domain_error(&self) -> Option<DomainError> {
        match self {
            Self::Proceed => None,
            Self::Reject(errors) => Some(DomainError::ValidationFailed { count: errors.len() }),
        }
    }
}

impl SubmissionGuard {
    pub fn new(validator: FormValidator) -> Self {
        Self { validator }
    }

    pub fn check(&self, submission: &DialogSubmission) -> GuardDecision {
        let errors = self.validator.validate(&submission.submission);
        if errors.is_empty() {
            GuardDecision::Proceed
        } else {
            GuardDecision::Reject(errors)
        }
    }
}

/// Performs a resolution's outcomes in order against the send boundary.
pub struct OutcomeExecutor {
    sink: Arc<dyn ReplySink>,
}

impl OutcomeExecutor {
    pub fn new(sink: Arc<dyn ReplySink>) -> Self {
        Self { sink }
    }

    /// Stops at the first failed send; later outcomes are not attempted.
    pub async fn execute(
        &self,
        resolution: Resolution,
        target: &ReplyTarget,
        ctx: &EventContext,
    ) -> Result<Vec<SessionHandle>, EventHandlerError> {
        let mut sessions = Vec::new();

        for outcome in resolution.outcomes {
            let (label, sent) = match outcome {
                RouterOutcome::Reply(payload) => ("reply", self.sink.reply(target, &payload).await),
                RouterOutcome::ReplaceOriginal(payload) => {
                    ("replace_original", self.sink.replace_original(target, &payload).await)
                }
                RouterOutcome::OpenDialog(dialog) => {
                    ("open_dialog", self.sink.open_dialog(target, &dialog).await)
                }
                RouterOutcome::StartConversation(turns) => {
                    sessions.push(conversation::start(
                        self.sink.clone(),
                        target.clone(),
                        turns,
                        ctx.correlation_id.clone(),
                    ));
                    continue;
                }
                RouterOutcome::Acknowledge | RouterOutcome::NoMatch => continue,
            };

            if let Err(source) = sent {
                warn!(
                    event_name = "egress.slack.send_failed",
                    correlation_id = %ctx.correlation_id,
                    outcome = label,
                    error = %source,
                    "outcome delivery failed; skipping remaining outcomes"
                );
                return Err(EventHandlerError::Send { outcome: label, source });
            }

            debug!(
                event_name = "egress.slack.sent",
                correlation_id = %ctx.correlation_id,
                outcome = label,
                "outcome delivered"
            );
        }

        Ok(sessions)
    }
}

pub struct RoutedEventHandler {
    event_type: InboundEventType,
    router: Arc<Router>,
    executor: Arc<OutcomeExecutor>,
}

impl RoutedEventHandler {
    pub fn new(
        event_type: InboundEventType,
        router: Arc<Router>,
        executor: Arc<OutcomeExecutor>,
    ) -> Self {
        Self { event_type, router, executor }
    }
}

#[async_trait]
impl EventHandler for RoutedEventHandler {
    fn event_type(&self) -> InboundEventType {
        self.event_type
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        route_and_execute(&self.router, &self.executor, &envelope.event, ctx).await
    }
}

pub struct SubmissionHandler {
    guard: SubmissionGuard,
    profiles: Arc<dyn ProfileStore>,
    router: Arc<Router>,
    executor: Arc<OutcomeExecutor>,
}

impl SubmissionHandler {
    pub fn new(
        guard: SubmissionGuard,
        profiles: Arc<dyn ProfileStore>,
        router: Arc<Router>,
        executor: Arc<OutcomeExecutor>,
    ) -> Self {
        Self { guard, profiles, router, executor }
    }

    async fn save_profile(&self, submission: &DialogSubmission, ctx: &EventContext) {
        let profile = UserProfile {
            user_id: submission.user.id.clone(),
            user_name: submission.user.name.clone(),
            callback_id: submission.callback_id.clone(),
            fields: submission.submission.clone(),
            submitted_at: Utc::now(),
        };

        if let Err(error) = self.profiles.save(profile).await {
            warn!(
                event_name = "profile.save_failed",
                correlation_id = %ctx.correlation_id,
                user_id = %submission.user.id,
                error = %error,
                "intro card could not be stored; replying anyway"
            );
        }
    }
}

#[async_trait]
impl EventHandler for SubmissionHandler {
    fn event_type(&self) -> InboundEventType {
        InboundEventType::DialogSubmission
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let InboundEvent::DialogSubmission(submission) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let decision = self.guard.check(submission);
        if let Some(rejection) = decision.as_domain_error() {
            info!(
                event_name = "submission.rejected",
                correlation_id = %ctx.correlation_id,
                callback_id = %submission.callback_id,
                error = %rejection,
                "dialog submission failed validation"
            );
        }
        if let GuardDecision::Reject(errors) = decision {
            return Ok(HandlerResult::Rejected(errors));
        }

        self.save_profile(submission, ctx).await;
        route_and_execute(&self.router, &self.executor, &envelope.event, ctx).await
    }
}

async fn route_and_execute(
    router: &Router,
    executor: &OutcomeExecutor,
    event: &InboundEvent,
    ctx: &EventContext,
) -> Result<HandlerResult, EventHandlerError> {
    let resolution = router.route(event)?;
    let route = resolution.route;

    info!(
        event_name = "router.resolved",
        correlation_id = %ctx.correlation_id,
        callback_id = event.callback_id().unwrap_or("none"),
        route = route.unwrap_or("no_match"),
        "inbound event resolved"
    );

    if resolution.is_no_match() {
        return Ok(HandlerResult::Ignored);
    }

    let sessions = executor.execute(resolution, &event.reply_target(), ctx).await?;
    Ok(HandlerResult::Delivered { route, sessions })
}
