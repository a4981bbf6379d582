use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::ApplicationError;

/// An accepted intro-card submission, keyed by Slack user id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: Option<String>,
    pub callback_id: String,
    pub fields: BTreeMap<String, String>,
    pub submitted_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.fields
            .get("name")
            .map(String::as_str)
            .or(self.user_name.as_deref())
            .unwrap_or(self.user_id.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProfileStoreError {
    #[error("profile backend failure: {0}")]
    Backend(String),
    #[error("profile decode failure: {0}")]
    Decode(String),
}

impl From<ProfileStoreError> for ApplicationError {
    fn from(value: ProfileStoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

/// Last write wins: saving a profile for an existing user replaces it.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn save(&self, profile: UserProfile) -> Result<(), ProfileStoreError>;
    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, ProfileStoreError>;
    async fn count(&self) -> Result<u64, ProfileStoreError>;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::{ProfileStoreError, UserProfile};
    use crate::errors::ApplicationError;

    #[test]
    fn display_name_prefers_submitted_name() {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_owned(), "Ada".to_owned());
        let profile = UserProfile {
            user_id: "U1".to_owned(),
            user_name: Some("ada.l".to_owned()),
            callback_id: "dialog".to_owned(),
            fields,
            submitted_at: Utc::now(),
        };

        assert_eq!(profile.display_name(), "Ada");
    }

    #[test]
    fn display_name_falls_back_to_user_id() {
        let profile = UserProfile {
            user_id: "U2".to_owned(),
            user_name: None,
            callback_id: "dialog".to_owned(),
            fields: BTreeMap::new(),
            submitted_at: Utc::now(),
        };

        assert_eq!(profile.display_name(), "U2");
    }

    #[test]
    fn store_errors_surface_as_persistence_failures() {
        let error = ApplicationError::from(ProfileStoreError::Backend("disk full".to_owned()));
        assert!(matches!(error, ApplicationError::Persistence(ref message) if message.contains("disk full")));
    }
}
