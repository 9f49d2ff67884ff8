//! Per-player progression cache.
//!
//! Each identity maps to a shared cell that is filled by exactly one load,
//! no matter how many events for that player arrive while the load is in
//! flight. A session that started from defaults because storage was down is
//! reconciled with storage on its next use.

use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use emberrpg_domain::{PlayerId, PlayerProgression};
use tokio::sync::{Mutex, MutexGuard, OnceCell};

use crate::infrastructure::persistence::PersistenceGateway;

/// Where a session's record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOrigin {
    /// Loaded from (or created in) storage.
    Stored,
    /// Storage was unavailable; the record started from defaults.
    Fallback { reason: String },
}

/// A connected player's progression record.
pub struct PlayerSession {
    player_id: PlayerId,
    origin: RwLock<RecordOrigin>,
    record: Mutex<PlayerProgression>,
}

impl PlayerSession {
    fn new(record: PlayerProgression, origin: RecordOrigin) -> Self {
        Self {
            player_id: record.id(),
            origin: RwLock::new(origin),
            record: Mutex::new(record),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn origin(&self) -> RecordOrigin {
        self.origin
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.origin(), RecordOrigin::Fallback { .. })
    }

    fn mark_stored(&self) {
        *self.origin.write().unwrap_or_else(PoisonError::into_inner) = RecordOrigin::Stored;
    }

    /// Exclusive access to the record. Hold the guard for the whole
    /// read-modify-save sequence.
    pub async fn lock(&self) -> MutexGuard<'_, PlayerProgression> {
        self.record.lock().await
    }

    /// Copy of the current record.
    pub async fn current(&self) -> PlayerProgression {
        self.record.lock().await.clone()
    }
}

type SessionCell = Arc<OnceCell<Arc<PlayerSession>>>;

/// Authoritative in-memory view of connected players.
pub struct PlayerSessionRegistry {
    sessions: DashMap<PlayerId, SessionCell>,
    persistence: Arc<PersistenceGateway>,
}

impl PlayerSessionRegistry {
    pub fn new(persistence: Arc<PersistenceGateway>) -> Self {
        Self {
            sessions: DashMap::new(),
            persistence,
        }
    }

    /// Cached session for `id`, loading it on first use.
    ///
    /// Never fails: if storage cannot be read the session starts from a
    /// default record marked [`RecordOrigin::Fallback`], and later calls try
    /// to reconcile it with storage again.
    pub async fn get_or_create(&self, id: PlayerId) -> Arc<PlayerSession> {
        // Clone the cell out so the map shard isn't locked across the load.
        let cell = self.sessions.entry(id).or_default().value().clone();
        let mut loaded_now = false;
        let session = cell
            .get_or_init(|| {
                loaded_now = true;
                self.load(id)
            })
            .await
            .clone();

        if !loaded_now && session.is_fallback() {
            self.resync(&session).await;
        }
        session
    }

    /// Cached session for `id`, if its load has completed.
    pub fn lookup(&self, id: PlayerId) -> Option<Arc<PlayerSession>> {
        self.sessions
            .get(&id)
            .and_then(|cell| cell.value().get().cloned())
    }

    /// Evict `id`, returning the session so the caller can flush it.
    pub fn forget(&self, id: PlayerId) -> Option<Arc<PlayerSession>> {
        self.sessions
            .remove(&id)
            .and_then(|(_, cell)| cell.get().cloned())
    }

    /// Number of loaded sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All loaded sessions.
    pub fn cached(&self) -> Vec<Arc<PlayerSession>> {
        self.sessions
            .iter()
            .filter_map(|entry| entry.value().get().cloned())
            .collect()
    }

    async fn load(&self, id: PlayerId) -> Arc<PlayerSession> {
        let session = match self.persistence.load_or_create(id).await {
            Ok(record) => {
                tracing::debug!(
                    player_id = %id,
                    level = record.level(),
                    xp = record.xp(),
                    "Loaded progression"
                );
                PlayerSession::new(record, RecordOrigin::Stored)
            }
            Err(e) => {
                tracing::warn!(
                    player_id = %id,
                    error = %e,
                    "Failed to load progression, starting from defaults"
                );
                PlayerSession::new(
                    PlayerProgression::new(id),
                    RecordOrigin::Fallback {
                        reason: e.to_string(),
                    },
                )
            }
        };
        Arc::new(session)
    }

    /// Retry the load for a fallback session and merge what storage holds.
    async fn resync(&self, session: &PlayerSession) {
        let id = session.player_id();
        let mut record = session.lock().await;
        if !session.is_fallback() {
            return;
        }

        match self.persistence.load_or_create(id).await {
            Ok(stored) => {
                if record.reconcile(&stored) {
                    self.persistence.save(record.clone());
                }
                session.mark_stored();
                tracing::info!(
                    player_id = %id,
                    level = record.level(),
                    xp = record.xp(),
                    "Progression re-synced with storage"
                );
            }
            Err(e) => {
                tracing::debug!(player_id = %id, error = %e, "Storage still unavailable");
            }
        }
    }
}
