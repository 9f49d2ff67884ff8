//! Application state and composition.

use std::sync::Arc;

use anyhow::Context;
use emberrpg_domain::ProgressionEngine;

use crate::api::{HostEvent, HostEventHandler};
use crate::infrastructure::{
    clock::SystemClock,
    config::{AppConfig, ConfigError},
    persistence::{PersistenceGateway, SqliteProgressionRepo},
    ports::{ClockPort, HostPort, ProgressionRepo},
    save_queue::SaveStats,
};
use crate::stores::PlayerSessionRegistry;
use crate::use_cases::ProgressionUseCases;

/// Main application state.
///
/// Owns the session registry and the persistence gateway; the host feeds
/// it events through [`App::handle`] and must call [`App::shutdown`] so
/// queued saves reach storage.
pub struct App {
    pub sessions: Arc<PlayerSessionRegistry>,
    pub use_cases: Arc<ProgressionUseCases>,
    events: HostEventHandler,
    persistence: Arc<PersistenceGateway>,
    store: Option<Arc<SqliteProgressionRepo>>,
}

impl App {
    /// Open the configured SQLite database and wire everything to `host`.
    pub async fn start(config: &AppConfig, host: Arc<dyn HostPort>) -> anyhow::Result<Self> {
        Self::start_with_clock(config, Arc::new(SystemClock::new()), host).await
    }

    pub async fn start_with_clock(
        config: &AppConfig,
        clock: Arc<dyn ClockPort>,
        host: Arc<dyn HostPort>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        tracing::info!(path = %config.database.path, "Opening progression database");
        let store = Arc::new(
            SqliteProgressionRepo::connect(&config.database, clock.clone())
                .await
                .context("failed to open progression database")?,
        );

        let app = Self::with_repo(config, store.clone(), clock, host)?;
        app.persistence
            .ensure_schema()
            .await
            .context("failed to prepare progression schema")?;

        match store.count_players().await {
            Ok(players) => tracing::info!(stored_players = players, "Progression storage ready"),
            Err(e) => tracing::warn!(error = %e, "Progression storage ready, player count unavailable"),
        }

        Ok(Self {
            store: Some(store),
            ..app
        })
    }

    /// Compose the app over any repository. Must be called within a tokio runtime.
    pub fn with_repo(
        config: &AppConfig,
        repo: Arc<dyn ProgressionRepo>,
        clock: Arc<dyn ClockPort>,
        host: Arc<dyn HostPort>,
    ) -> Result<Self, ConfigError> {
        let engine = ProgressionEngine::new(config.rules()?);
        let persistence = Arc::new(PersistenceGateway::new(repo, &config.save_queue));
        let sessions = Arc::new(PlayerSessionRegistry::new(persistence.clone()));
        let use_cases = Arc::new(ProgressionUseCases::new(
            sessions.clone(),
            persistence.clone(),
            engine,
            clock,
        ));
        let events = HostEventHandler::new(
            use_cases.clone(),
            host,
            config.ability.cast_sound.clone(),
        );

        Ok(Self {
            sessions,
            use_cases,
            events,
            persistence,
            store: None,
        })
    }

    pub fn events(&self) -> &HostEventHandler {
        &self.events
    }

    pub async fn handle(&self, event: HostEvent) {
        self.events.handle(event).await;
    }

    pub fn save_stats(&self) -> SaveStats {
        self.persistence.stats()
    }

    /// Save every connected player, drain queued saves, then close the database.
    pub async fn shutdown(&self) -> SaveStats {
        let cached = self.sessions.cached();
        let cached_sessions = cached.len();
        for session in cached {
            let record = session.current().await;
            self.persistence.flush(record).await;
        }
        self.persistence.shutdown().await;
        if let Some(store) = &self.store {
            store.close().await;
        }

        let stats = self.persistence.stats();
        tracing::info!(
            cached_sessions,
            submitted = stats.submitted,
            written = stats.written,
            superseded = stats.superseded,
            failed = stats.failed,
            rejected = stats.rejected,
            "Engine stopped"
        );
        stats
    }
}
