use std::sync::Arc;

use emberrpg_domain::PlayerId;

use crate::infrastructure::persistence::PersistenceGateway;
use crate::infrastructure::save_queue::SaveReceipt;
use crate::stores::PlayerSessionRegistry;

/// Flush a leaving player's record and drop it from the cache.
pub struct DisconnectPlayer {
    sessions: Arc<PlayerSessionRegistry>,
    persistence: Arc<PersistenceGateway>,
}

impl DisconnectPlayer {
    pub fn new(sessions: Arc<PlayerSessionRegistry>, persistence: Arc<PersistenceGateway>) -> Self {
        Self {
            sessions,
            persistence,
        }
    }

    /// Returns the final save, or `None` if the player had no cached session.
    ///
    /// The save is queued before the session is evicted, so a reconnect
    /// cannot load the player ahead of it.
    pub async fn execute(&self, player_id: PlayerId) -> Option<SaveReceipt> {
        let Some(session) = self.sessions.lookup(player_id) else {
            tracing::debug!(player_id = %player_id, "Disconnect for player without a session");
            return None;
        };

        let record = session.lock().await;
        let receipt = self.persistence.save(record.clone());
        self.sessions.forget(player_id);
        tracing::info!(
            player_id = %player_id,
            level = record.level(),
            xp = record.xp(),
            "Player disconnected"
        );
        Some(receipt)
    }
}
