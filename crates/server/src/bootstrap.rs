use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use awebot_core::config::{AppConfig, ConfigError, StorageBackend};
use awebot_core::ProfileStore;
use awebot_db::{connection, migrations, InMemoryProfileRepository, SqlProfileRepository};
use awebot_slack::dispatch::{
    intro_card_dispatcher, EventDispatcher, OutcomeExecutor, SubmissionGuard,
};
use awebot_slack::router::{Router, RouterSettings};
use awebot_slack::sink::{LoggingSink, ReplySink};
use awebot_slack::source::{ChannelEventSource, EventSender, EventSourceRunner, ReconnectPolicy};

use crate::health::StorageProbe;
use crate::slack_api::SlackApiSink;

const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkMode {
    SlackApi,
    Logging,
}

impl SinkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SlackApi => "slack_api",
            Self::Logging => "logging",
        }
    }
}

pub struct Application {
    pub config: AppConfig,
    pub storage: StorageProbe,
    pub sink_mode: SinkMode,
    pub dispatcher: Arc<EventDispatcher>,
    pub events: EventSender,
    pub runner: EventSourceRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("slack http client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let (profiles, storage) = open_storage(&config).await?;

    let (sink, sink_mode) = if config.slack.has_bot_token() {
        let sink: Arc<dyn ReplySink> =
            Arc::new(SlackApiSink::new(&config.slack).map_err(BootstrapError::HttpClient)?);
        (sink, SinkMode::SlackApi)
    } else {
        let sink: Arc<dyn ReplySink> = Arc::new(LoggingSink);
        (sink, SinkMode::Logging)
    };
    info!(
        event_name = "system.bootstrap.sink_selected",
        correlation_id = "bootstrap",
        sink_mode = sink_mode.as_str(),
        "reply sink initialized"
    );

    let router = Arc::new(Router::new(RouterSettings::from(&config.intro_cards)));
    let dispatcher = Arc::new(intro_card_dispatcher(
        router,
        Arc::new(OutcomeExecutor::new(sink)),
        SubmissionGuard::new(config.intro_cards.form_validator()),
        profiles,
    ));

    let (events, source) = ChannelEventSource::channel(EVENT_QUEUE_CAPACITY);
    let runner =
        EventSourceRunner::new(Arc::new(source), dispatcher.clone(), ReconnectPolicy::default());

    Ok(Application { config, storage, sink_mode, dispatcher, events, runner })
}

async fn open_storage(
    config: &AppConfig,
) -> Result<(Arc<dyn ProfileStore>, StorageProbe), BootstrapError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!(
                event_name = "system.bootstrap.storage_ready",
                correlation_id = "bootstrap",
                backend = "memory",
                "profiles are kept in memory"
            );
            let profiles: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileRepository::default());
            Ok((profiles, StorageProbe::Memory))
        }
        StorageBackend::Sqlite => {
            let pool = connection::connect_for(&config.storage)
                .await
                .map_err(BootstrapError::DatabaseConnect)?;
            migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.storage_ready",
                correlation_id = "bootstrap",
                backend = "sqlite",
                "database connected and migrations applied"
            );
            let profiles: Arc<dyn ProfileStore> = Arc::new(SqlProfileRepository::new(pool.clone()));
            Ok((profiles, StorageProbe::Sqlite(pool)))
        }
    }
}

#[cfg(test)]
mod tests {
    use awebot_core::config::{AppConfig, ConfigOverrides, LoadOptions, StorageBackend};

    use super::{bootstrap_with_config, Application, BootstrapError, SinkMode};
    use crate::health::StorageProbe;

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    fn options(overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions { overrides, ..LoadOptions::default() }
    }

    #[tokio::test]
    async fn bootstrap_rejects_app_level_token() {
        let result = bootstrap(options(ConfigOverrides {
            slack_bot_token: Some("xapp-1-socket".to_owned()),
            storage_backend: Some(StorageBackend::Memory),
            ..ConfigOverrides::default()
        }))
        .await;

        let message = result.err().expect("bootstrap should fail").to_string();
        assert!(message.contains("slack.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_without_token_uses_logging_sink() {
        let app = bootstrap(options(ConfigOverrides {
            slack_bot_token: Some(String::new()),
            storage_backend: Some(StorageBackend::Memory),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("bootstrap");

        assert_eq!(app.sink_mode, SinkMode::Logging);
        assert!(matches!(app.storage, StorageProbe::Memory));
        assert_eq!(app.dispatcher.handler_count(), 4);
    }

    #[tokio::test]
    async fn sqlite_bootstrap_applies_profile_migration() {
        let app = bootstrap(options(ConfigOverrides {
            slack_bot_token: Some("xoxb-test".to_owned()),
            storage_backend: Some(StorageBackend::Sqlite),
            storage_url: Some("sqlite::memory:?cache=shared".to_owned()),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("bootstrap");

        let StorageProbe::Sqlite(pool) = &app.storage else {
            panic!("expected sqlite storage");
        };
        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'user_profiles'",
        )
        .fetch_one(pool)
        .await
        .expect("query");

        assert_eq!(tables, 1);
        assert_eq!(app.sink_mode, SinkMode::SlackApi);
        pool.close().await;
    }
}
