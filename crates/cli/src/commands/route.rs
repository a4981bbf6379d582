//! Offline routing of a captured Slack payload. Nothing is sent.

use std::fs;
use std::path::Path;

use awebot_core::config::{AppConfig, LoadOptions};
use awebot_core::ValidationError;
use awebot_slack::dispatch::{GuardDecision, SubmissionGuard};
use awebot_slack::events::InboundEvent;
use awebot_slack::router::{Router, RouterOutcome, RouterSettings};
use awebot_slack::wire::{self, IngressRequest};
use serde::Serialize;

use crate::commands::{to_json, CommandResult};

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RouteReport {
    Routed {
        event_type: String,
        route: Option<&'static str>,
        outcomes: Vec<RouterOutcome>,
    },
    Rejected {
        event_type: String,
        errors: Vec<ValidationError>,
    },
    Ignored {
        reason: String,
    },
}

pub fn run(path: &Path) -> CommandResult {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "route",
                "input",
                format!("could not read `{}`: {error}", path.display()),
                2,
            );
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "route",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    match route_payload(&raw, &config) {
        Ok(report) => CommandResult::report(0, to_json(&report)),
        Err((error_class, message)) => CommandResult::failure("route", error_class, message, 1),
    }
}

fn route_payload(raw: &str, config: &AppConfig) -> Result<RouteReport, (&'static str, String)> {
    let envelope = match wire::parse_recorded(raw).map_err(|error| ("parse", error.to_string()))? {
        IngressRequest::Event(envelope) => envelope,
        IngressRequest::UrlVerification { .. } => {
            return Ok(RouteReport::Ignored { reason: "url_verification handshake".to_owned() });
        }
        IngressRequest::Ignored { reason } => return Ok(RouteReport::Ignored { reason }),
    };
    let event_type = format!("{:?}", envelope.event.event_type());

    if let InboundEvent::DialogSubmission(submission) = &envelope.event {
        let guard = SubmissionGuard::new(config.intro_cards.form_validator());
        if let GuardDecision::Reject(errors) = guard.check(submission) {
            return Ok(RouteReport::Rejected { event_type, errors });
        }
    }

    let router = Router::new(RouterSettings::from(&config.intro_cards));
    let resolution =
        router.route(&envelope.event).map_err(|error| ("malformed_event", error.to_string()))?;

    Ok(RouteReport::Routed { event_type, route: resolution.route, outcomes: resolution.outcomes })
}
