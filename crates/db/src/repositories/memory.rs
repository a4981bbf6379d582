use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use awebot_core::{ProfileStore, ProfileStoreError, UserProfile};

#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

#[async_trait]
impl ProfileStore for InMemoryProfileRepository {
    async fn save(&self, profile: UserProfile) -> Result<(), ProfileStoreError> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, ProfileStoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user_id).cloned())
    }

    async fn count(&self) -> Result<u64, ProfileStoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.len() as u64)
    }
}
