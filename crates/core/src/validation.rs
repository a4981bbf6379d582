//! Field-level validation for dialog submissions.
//!
//! Every rule runs against every submission; failures are collected so the
//! submitting user sees all problems in one round trip.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type FormSubmission = BTreeMap<String, String>;

/// Serialized in Slack's `dialog_submission` error shape (`name` / `error`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(rename = "name")]
    pub field_name: String,
    #[serde(rename = "error")]
    pub message: String,
}

impl ValidationError {
    pub fn new(field_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_name: field_name.into(), message: message.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationRule {
    /// First character must be an ASCII uppercase letter (`A`..=`Z`).
    CapitalizedInitial { field: String, message: String },
    /// Value must contain `needle` somewhere.
    RequiredSubstring { field: String, needle: String, message: String },
}

impl ValidationRule {
    pub fn field(&self) -> &str {
        match self {
            Self::CapitalizedInitial { field, .. } | Self::RequiredSubstring { field, .. } => field,
        }
    }

    fn check(&self, submission: &FormSubmission) -> Option<ValidationError> {
        let value = submission.get(self.field()).map(String::as_str);
        match self {
            Self::CapitalizedInitial { field, message } => {
                let capitalized = value
                    .and_then(|value| value.as_bytes().first())
                    .is_some_and(u8::is_ascii_uppercase);
                (!capitalized).then(|| ValidationError::new(field.clone(), message.clone()))
            }
            Self::RequiredSubstring { field, needle, message } => {
                let contains = value.is_some_and(|value| value.contains(needle.as_str()));
                (!contains).then(|| ValidationError::new(field.clone(), message.clone()))
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormValidator {
    rules: Vec<ValidationRule>,
}

impl FormValidator {
    pub fn new(rules: Vec<ValidationRule>) -> Self {
        Self { rules }
    }

    /// The intro-card form: capitalised name and an email on `email_domain`.
    pub fn intro_card(email_domain: &str) -> Self {
        Self::new(vec![
            ValidationRule::CapitalizedInitial {
                field: "name".to_owned(),
                message: "Give your name some honor. Capitalize.".to_owned(),
            },
            ValidationRule::RequiredSubstring {
                field: "email".to_owned(),
                needle: email_domain.to_owned(),
                message: format!("Please use your {email_domain} email"),
            },
        ])
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn validate(&self, submission: &FormSubmission) -> Vec<ValidationError> {
        self.rules.iter().filter_map(|rule| rule.check(submission)).collect()
    }
}
