//! Progression outcome types

use chrono::Duration;
use serde::Serialize;

/// Outcome of attempting an ability cast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    /// Cooldown still running; the record was not touched
    CooldownActive { remaining: Duration },
    /// Cast succeeded without crossing a level threshold
    XpGained { gained: u32, xp: u32 },
    /// Cast succeeded and at least one level was gained
    LevelUp {
        new_level: u32,
        levels_gained: u32,
        xp: u32,
    },
}

impl CastOutcome {
    /// Whether the cast went through (XP was awarded).
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::CooldownActive { .. })
    }
}

/// The two observable states of the ability between casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityState {
    Ready,
    OnCooldown { remaining: Duration },
}

/// Read-only view of a record, as shown by the stats command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressionSnapshot {
    pub level: u32,
    pub xp: u32,
    /// XP needed to leave the current level (`level * XP_PER_LEVEL`)
    pub threshold: u32,
    pub xp_to_next: u32,
}
