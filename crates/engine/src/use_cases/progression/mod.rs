//! Progression use cases.
//!
//! - `ConnectPlayer` - warm the session cache when a player joins
//! - `CastAbility` - cooldown check, XP award, queued save
//! - `ShowStats` - read-only snapshot for the stats command
//! - `DisconnectPlayer` - final save and eviction

mod cast_ability;
mod connect;
mod disconnect;
mod stats;

use std::sync::Arc;

use emberrpg_domain::ProgressionEngine;

use crate::infrastructure::persistence::PersistenceGateway;
use crate::infrastructure::ports::ClockPort;
use crate::stores::PlayerSessionRegistry;

pub use cast_ability::{CastAbility, CastResult};
pub use connect::ConnectPlayer;
pub use disconnect::DisconnectPlayer;
pub use stats::ShowStats;

/// Container for progression use cases.
pub struct ProgressionUseCases {
    pub connect: Arc<ConnectPlayer>,
    pub cast_ability: Arc<CastAbility>,
    pub stats: Arc<ShowStats>,
    pub disconnect: Arc<DisconnectPlayer>,
}

impl ProgressionUseCases {
    pub fn new(
        sessions: Arc<PlayerSessionRegistry>,
        persistence: Arc<PersistenceGateway>,
        engine: ProgressionEngine,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            connect: Arc::new(ConnectPlayer::new(sessions.clone())),
            cast_ability: Arc::new(CastAbility::new(
                sessions.clone(),
                persistence.clone(),
                engine,
                clock,
            )),
            stats: Arc::new(ShowStats::new(sessions.clone(), engine)),
            disconnect: Arc::new(DisconnectPlayer::new(sessions, persistence)),
        }
    }
}
