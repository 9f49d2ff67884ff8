use std::sync::Arc;

use emberrpg_domain::{PlayerId, ProgressionEngine, ProgressionSnapshot};

use crate::stores::PlayerSessionRegistry;

/// Read-only level/XP view for the stats command.
pub struct ShowStats {
    sessions: Arc<PlayerSessionRegistry>,
    engine: ProgressionEngine,
}

impl ShowStats {
    pub fn new(sessions: Arc<PlayerSessionRegistry>, engine: ProgressionEngine) -> Self {
        Self { sessions, engine }
    }

    pub async fn execute(&self, player_id: PlayerId) -> ProgressionSnapshot {
        let session = self.sessions.get_or_create(player_id).await;
        let record = session.lock().await;
        self.engine.snapshot(&record)
    }
}
