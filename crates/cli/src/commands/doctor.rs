use awebot_core::config::{AppConfig, LoadOptions, StorageBackend};
use awebot_db::connection;
use serde::Serialize;

use crate::commands::{runtime, to_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output { to_json(&report) } else { render_human(&report) };
    CommandResult::report(exit_code, output)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_bot_token(&config));
            checks.push(check_signing_secret(&config));
            checks.push(check_storage(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()));
            for name in ["slack_bot_token", "slack_signing_secret", "storage_connectivity"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    // Skipped checks are optional capabilities, not failures.
    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let (overall_status, summary) = if failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_owned(), checks }
}

fn check_bot_token(config: &AppConfig) -> DoctorCheck {
    if config.slack.has_bot_token() {
        DoctorCheck::new("slack_bot_token", CheckStatus::Pass, "bot token configured")
    } else {
        DoctorCheck::new(
            "slack_bot_token",
            CheckStatus::Skipped,
            "no bot token; replies will be logged instead of sent",
        )
    }
}

fn check_signing_secret(config: &AppConfig) -> DoctorCheck {
    match &config.slack.signing_secret {
        Some(_) => DoctorCheck::new(
            "slack_signing_secret",
            CheckStatus::Pass,
            "request signatures will be verified",
        ),
        None => DoctorCheck::new(
            "slack_signing_secret",
            CheckStatus::Skipped,
            "no signing secret; inbound requests are not verified",
        ),
    }
}

fn check_storage(config: &AppConfig) -> DoctorCheck {
    if config.storage.backend == StorageBackend::Memory {
        return DoctorCheck::new(
            "storage_connectivity",
            CheckStatus::Pass,
            "memory backend; profiles are not persisted across restarts",
        );
    }

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::new(
                "storage_connectivity",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connection::connect_for(&config.storage)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;
        let ping = connection::ping(&pool).await;
        pool.close().await;
        ping.map_err(|error| format!("database query failed: {error}"))
    });

    match result {
        Ok(()) => DoctorCheck::new(
            "storage_connectivity",
            CheckStatus::Pass,
            format!("connected using `{}`", config.storage.url),
        ),
        Err(details) => DoctorCheck::new("storage_connectivity", CheckStatus::Fail, details),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
