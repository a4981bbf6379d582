use std::collections::BTreeMap;

use awebot_core::{ProfileStore, UserProfile};
use awebot_db::{connect_with_settings, migrations, InMemoryProfileRepository, SqlProfileRepository};
use chrono::Utc;

fn profile(user_id: &str, name: &str, email: &str) -> UserProfile {
    let mut fields = BTreeMap::new();
    fields.insert("name".to_owned(), name.to_owned());
    fields.insert("email".to_owned(), email.to_owned());
    UserProfile {
        user_id: user_id.to_owned(),
        user_name: Some(name.to_lowercase()),
        callback_id: "dialog".to_owned(),
        fields,
        submitted_at: Utc::now(),
    }
}

async fn sqlite_store() -> SqlProfileRepository {
    let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    SqlProfileRepository::new(pool)
}

async fn exercise(store: &dyn ProfileStore) {
    assert_eq!(store.count().await.expect("count"), 0);
    assert!(store.find("U1").await.expect("find").is_none());

    store.save(profile("U1", "Ada", "ada@berkeley.edu")).await.expect("save");
    store.save(profile("U2", "Grace", "grace@berkeley.edu")).await.expect("save");
    store.save(profile("U1", "Ada Lovelace", "ada.l@berkeley.edu")).await.expect("resave");

    assert_eq!(store.count().await.expect("count"), 2);
    let stored = store.find("U1").await.expect("find").expect("profile present");
    assert_eq!(stored.display_name(), "Ada Lovelace");
    assert_eq!(stored.fields.get("email").map(String::as_str), Some("ada.l@berkeley.edu"));
}

#[tokio::test]
async fn memory_store_keeps_last_submission_per_user() {
    exercise(&InMemoryProfileRepository::default()).await;
}

#[tokio::test]
async fn sqlite_store_keeps_last_submission_per_user() {
    exercise(&sqlite_store().await).await;
}
