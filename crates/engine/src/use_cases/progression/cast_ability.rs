use std::sync::Arc;

use emberrpg_domain::{CastOutcome, PlayerId, ProgressionEngine, ProgressionSnapshot};

use crate::infrastructure::persistence::PersistenceGateway;
use crate::infrastructure::ports::ClockPort;
use crate::infrastructure::save_queue::SaveReceipt;
use crate::stores::PlayerSessionRegistry;

/// Result of an ability command.
#[derive(Debug)]
pub struct CastResult {
    pub outcome: CastOutcome,
    /// Progress after the attempt
    pub snapshot: ProgressionSnapshot,
    /// Queued save; `None` when the cast was refused
    pub save: Option<SaveReceipt>,
}

/// Use case for the rate-limited, XP-granting ability.
///
/// The cooldown check, the XP award and the save submission all happen
/// under the player's session lock, so two commands for the same player
/// are applied one after the other and their saves enter the writer lane
/// in the same order.
pub struct CastAbility {
    sessions: Arc<PlayerSessionRegistry>,
    persistence: Arc<PersistenceGateway>,
    engine: ProgressionEngine,
    clock: Arc<dyn ClockPort>,
}

impl CastAbility {
    pub fn new(
        sessions: Arc<PlayerSessionRegistry>,
        persistence: Arc<PersistenceGateway>,
        engine: ProgressionEngine,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            sessions,
            persistence,
            engine,
            clock,
        }
    }

    pub fn reward(&self) -> u32 {
        self.engine.rules().ability_reward()
    }

    pub async fn execute(&self, player_id: PlayerId) -> CastResult {
        let session = self.sessions.get_or_create(player_id).await;
        let mut record = session.lock().await;

        let outcome = self.engine.cast_ability(&mut record, self.clock.now());
        let snapshot = self.engine.snapshot(&record);

        let save = match outcome {
            CastOutcome::CooldownActive { remaining } => {
                tracing::debug!(
                    player_id = %player_id,
                    remaining_ms = remaining.num_milliseconds(),
                    "Ability still on cooldown"
                );
                None
            }
            CastOutcome::XpGained { .. } => Some(self.persistence.save(record.clone())),
            CastOutcome::LevelUp {
                new_level,
                levels_gained,
                ..
            } => {
                tracing::info!(
                    player_id = %player_id,
                    new_level,
                    levels_gained,
                    "Player levelled up"
                );
                Some(self.persistence.save(record.clone()))
            }
        };

        CastResult {
            outcome,
            snapshot,
            save,
        }
    }
}
