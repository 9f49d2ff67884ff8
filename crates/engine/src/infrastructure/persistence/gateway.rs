//! Single entry point for progression reads and writes.
//!
//! Writes are handed to the [`SaveQueue`] so callers on the game thread
//! never wait on storage. A read first waits for the player's queued saves,
//! so a reload never returns a row older than what was already submitted.

use std::sync::Arc;

use emberrpg_domain::{PlayerId, PlayerProgression};

use crate::infrastructure::config::SaveQueueConfig;
use crate::infrastructure::ports::{ProgressionRepo, RepoError};
use crate::infrastructure::save_queue::{SaveQueue, SaveReceipt, SaveStats};

pub struct PersistenceGateway {
    repo: Arc<dyn ProgressionRepo>,
    saves: SaveQueue,
}

impl PersistenceGateway {
    /// Wrap `repo` and start its save lanes. Requires a tokio runtime.
    pub fn new(repo: Arc<dyn ProgressionRepo>, config: &SaveQueueConfig) -> Self {
        let saves = SaveQueue::start(Arc::clone(&repo), config);
        Self { repo, saves }
    }

    pub async fn ensure_schema(&self) -> Result<(), RepoError> {
        self.repo.ensure_schema().await
    }

    pub async fn load_or_create(&self, id: PlayerId) -> Result<PlayerProgression, RepoError> {
        self.saves.settled(id).await;
        self.repo.load_or_create(id).await
    }

    /// Queue a snapshot of `record` for writing.
    pub fn save(&self, record: PlayerProgression) -> SaveReceipt {
        self.saves.submit(record)
    }

    /// Like [`Self::save`], but waits for lane capacity instead of rejecting.
    pub async fn flush(&self, record: PlayerProgression) -> SaveReceipt {
        self.saves.submit_waiting(record).await
    }

    pub fn stats(&self) -> SaveStats {
        self.saves.stats()
    }

    /// Flush queued saves and stop the writers.
    pub async fn shutdown(&self) {
        self.saves.shutdown().await;
    }
}
