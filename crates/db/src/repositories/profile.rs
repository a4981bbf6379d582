use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use awebot_core::{ProfileStore, ProfileStoreError, UserProfile};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlProfileRepository {
    pool: DbPool,
}

impl SqlProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        let fields_json = serde_json::to_string(&profile.fields)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO user_profiles (user_id, user_name, callback_id, fields_json,
                                        submitted_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 user_name = excluded.user_name,
                 callback_id = excluded.callback_id,
                 fields_json = excluded.fields_json,
                 submitted_at = excluded.submitted_at,
                 updated_at = excluded.updated_at",
        )
        .bind(&profile.user_id)
        .bind(&profile.user_name)
        .bind(&profile.callback_id)
        .bind(fields_json)
        .bind(profile.submitted_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn select(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, user_name, callback_id, fields_json, submitted_at
             FROM user_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn select_count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM user_profiles")
            .fetch_one(&self.pool)
            .await?
            .try_get("count")
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        Ok(count.max(0) as u64)
    }
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<UserProfile, RepositoryError> {
    let decode = |error: sqlx::Error| RepositoryError::Decode(error.to_string());

    let user_id: String = row.try_get("user_id").map_err(decode)?;
    let user_name: Option<String> = row.try_get("user_name").map_err(decode)?;
    let callback_id: String = row.try_get("callback_id").map_err(decode)?;
    let fields_json: String = row.try_get("fields_json").map_err(decode)?;
    let submitted_at_str: String = row.try_get("submitted_at").map_err(decode)?;

    let fields: BTreeMap<String, String> = serde_json::from_str(&fields_json).map_err(|error| {
        RepositoryError::Decode(format!("fields_json for `{user_id}`: {error}"))
    })?;
    let submitted_at = DateTime::parse_from_rfc3339(&submitted_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            RepositoryError::Decode(format!("submitted_at for `{user_id}`: {error}"))
        })?;

    Ok(UserProfile { user_id, user_name, callback_id, fields, submitted_at })
}

#[async_trait]
impl ProfileStore for SqlProfileRepository {
    async fn save(&self, profile: UserProfile) -> Result<(), ProfileStoreError> {
        self.upsert(&profile).await.map_err(Into::into)
    }

    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, ProfileStoreError> {
        self.select(user_id).await.map_err(Into::into)
    }

    async fn count(&self) -> Result<u64, ProfileStoreError> {
        self.select_count().await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use awebot_core::{ProfileStore, ProfileStoreError, UserProfile};

    use super::SqlProfileRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn card(user_id: &str, name: &str, pitch: &str) -> UserProfile {
        let fields = BTreeMap::from([
            ("name".to_owned(), name.to_owned()),
            ("email".to_owned(), format!("{}@berkeley.edu", name.to_lowercase())),
            ("pitch".to_owned(), pitch.to_owned()),
        ]);
        UserProfile {
            user_id: user_id.to_owned(),
            user_name: Some(name.to_lowercase()),
            callback_id: "dialog".to_owned(),
            fields,
            submitted_at: Utc.with_ymd_and_hms(2024, 9, 1, 18, 30, 0).single().expect("timestamp"),
        }
    }

    #[tokio::test]
    async fn sql_profile_repo_round_trip() {
        let repo = SqlProfileRepository::new(setup().await);
        let ada = card("U1", "Ada", "Engines, mostly");

        repo.save(ada.clone()).await.expect("save");
        let found = repo.find("U1").await.expect("find");

        assert_eq!(found, Some(ada));
        assert_eq!(repo.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn sql_profile_repo_last_write_wins() {
        let repo = SqlProfileRepository::new(setup().await);
        repo.save(card("U1", "Ada", "first")).await.expect("save first");
        repo.save(card("U1", "Ada", "second")).await.expect("save second");

        let found = repo.find("U1").await.expect("find").expect("present");
        assert_eq!(found.fields.get("pitch").map(String::as_str), Some("second"));
        assert_eq!(repo.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn sql_profile_repo_missing_user_returns_none() {
        let repo = SqlProfileRepository::new(setup().await);
        assert_eq!(repo.find("nobody").await.expect("find"), None);
    }

    #[tokio::test]
    async fn corrupt_fields_json_surfaces_decode_error() {
        let pool = setup().await;
        sqlx::query(
            "INSERT INTO user_profiles (user_id, user_name, callback_id, fields_json, submitted_at, updated_at)
             VALUES ('U9', NULL, 'dialog', 'not-json', '2024-09-01T00:00:00Z', '2024-09-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("seed corrupt row");

        let repo = SqlProfileRepository::new(pool);
        let result = repo.find("U9").await;

        assert!(matches!(result, Err(ProfileStoreError::Decode(ref message)) if message.contains("U9")));
    }
}
