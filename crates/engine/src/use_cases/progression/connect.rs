use std::sync::Arc;

use emberrpg_domain::PlayerId;

use crate::stores::{PlayerSession, PlayerSessionRegistry};

/// Load (or create) a joining player's record so later commands hit the cache.
pub struct ConnectPlayer {
    sessions: Arc<PlayerSessionRegistry>,
}

impl ConnectPlayer {
    pub fn new(sessions: Arc<PlayerSessionRegistry>) -> Self {
        Self { sessions }
    }

    pub async fn execute(&self, player_id: PlayerId) -> Arc<PlayerSession> {
        let session = self.sessions.get_or_create(player_id).await;
        tracing::info!(
            player_id = %player_id,
            fallback = session.is_fallback(),
            "Player connected"
        );
        session
    }
}
