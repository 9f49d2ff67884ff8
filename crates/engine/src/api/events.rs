//! Host events and their dispatch.
//!
//! The host reports identities as `Option<u64>`; a player without an
//! authenticated identity cannot hold progression, so such events are
//! dropped here before any use case runs.

use std::sync::Arc;

use emberrpg_domain::{CastOutcome, PlayerId};
use serde::{Deserialize, Serialize};

use super::feedback;
use crate::infrastructure::ports::HostPort;
use crate::use_cases::ProgressionUseCases;

/// Something the game host observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    PlayerConnected { identity: Option<u64> },
    AbilityCommandInvoked { identity: Option<u64> },
    StatsCommandInvoked { identity: Option<u64> },
    PlayerDisconnected { identity: Option<u64> },
}

impl HostEvent {
    pub fn identity(&self) -> Option<u64> {
        match *self {
            Self::PlayerConnected { identity }
            | Self::AbilityCommandInvoked { identity }
            | Self::StatsCommandInvoked { identity }
            | Self::PlayerDisconnected { identity } => identity,
        }
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.identity().map(PlayerId::new)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerConnected { .. } => "player_connected",
            Self::AbilityCommandInvoked { .. } => "ability_command_invoked",
            Self::StatsCommandInvoked { .. } => "stats_command_invoked",
            Self::PlayerDisconnected { .. } => "player_disconnected",
        }
    }
}

/// Routes host events to the progression use cases and reports back
/// through [`HostPort`].
pub struct HostEventHandler {
    progression: Arc<ProgressionUseCases>,
    host: Arc<dyn HostPort>,
    cast_sound: String,
}

impl HostEventHandler {
    pub fn new(
        progression: Arc<ProgressionUseCases>,
        host: Arc<dyn HostPort>,
        cast_sound: impl Into<String>,
    ) -> Self {
        Self {
            progression,
            host,
            cast_sound: cast_sound.into(),
        }
    }

    pub async fn handle(&self, event: HostEvent) {
        let Some(player_id) = event.player_id() else {
            tracing::debug!(event = event.kind(), "Dropping event without player identity");
            return;
        };

        match event {
            HostEvent::PlayerConnected { .. } => {
                self.progression.connect.execute(player_id).await;
            }
            HostEvent::AbilityCommandInvoked { .. } => self.cast_ability(player_id).await,
            HostEvent::StatsCommandInvoked { .. } => {
                let snapshot = self.progression.stats.execute(player_id).await;
                self.host
                    .send_message(player_id, &feedback::stats_line(&snapshot));
            }
            HostEvent::PlayerDisconnected { .. } => {
                // Save failures are logged by the queue; nothing to tell a leaving player.
                let _ = self.progression.disconnect.execute(player_id).await;
            }
        }
    }

    async fn cast_ability(&self, player_id: PlayerId) {
        let cast = &self.progression.cast_ability;
        let result = cast.execute(player_id).await;

        match result.outcome {
            CastOutcome::CooldownActive { remaining } => {
                self.host
                    .send_message(player_id, &feedback::cooldown_notice(remaining));
                return;
            }
            CastOutcome::LevelUp { new_level, .. } => {
                self.host
                    .send_message(player_id, &feedback::level_up_notice(new_level));
            }
            CastOutcome::XpGained { .. } => {}
        }

        self.host.send_message(
            player_id,
            &feedback::cast_notice(cast.reward(), &result.snapshot),
        );
        self.host.play_sound(player_id, &self.cast_sound);
    }
}
