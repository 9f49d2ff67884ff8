//! PlayerProgression aggregate - XP and level for one player identity
//!
//! # Invariants
//!
//! - `level >= 1`
//! - `xp < level * XP_PER_LEVEL` whenever the record is observable
//! - `last_ability_at` only moves forward through [`PlayerProgression::record_cast`]
//!
//! Fields are private. Records change through a successful ability cast
//! applied by [`crate::ProgressionEngine`], or by reconciling with a stored
//! copy that is further ahead.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DomainError;
use crate::ids::PlayerId;

/// XP needed per level: reaching level `n + 1` costs `n * XP_PER_LEVEL`.
pub const XP_PER_LEVEL: u32 = 100;

/// Progression state for a single player.
///
/// # Example
///
/// ```
/// use emberrpg_domain::{PlayerId, PlayerProgression};
///
/// let record = PlayerProgression::new(PlayerId::new(123));
/// assert_eq!(record.level(), 1);
/// assert_eq!(record.xp(), 0);
/// assert!(record.last_ability_at().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerProgression {
    id: PlayerId,
    xp: u32,
    level: u32,
    last_ability_at: Option<DateTime<Utc>>,
}

impl PlayerProgression {
    /// Fresh record for a player seen for the first time.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            xp: 0,
            level: 1,
            last_ability_at: None,
        }
    }

    /// Rebuild a record from persisted values.
    ///
    /// Rejects `level == 0`. XP at or above the level threshold (a row written
    /// under different reward rules) is normalized into levels.
    ///
    /// ```
    /// use emberrpg_domain::{PlayerId, PlayerProgression};
    ///
    /// let record = PlayerProgression::restore(PlayerId::new(7), 250, 1, None).expect("valid level");
    /// assert_eq!(record.level(), 2);
    /// assert_eq!(record.xp(), 150);
    /// ```
    pub fn restore(
        id: PlayerId,
        xp: u32,
        level: u32,
        last_ability_at: Option<DateTime<Utc>>,
    ) -> Result<Self, DomainError> {
        if level == 0 {
            return Err(DomainError::validation(format!(
                "player {id} has level 0; levels start at 1"
            )));
        }

        let mut record = Self {
            id,
            xp,
            level,
            last_ability_at,
        };
        record.normalize();
        Ok(record)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[inline]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn last_ability_at(&self) -> Option<DateTime<Utc>> {
        self.last_ability_at
    }

    /// XP required to leave the current level.
    pub fn xp_threshold(&self) -> u32 {
        Self::threshold_for(self.level)
    }

    /// XP still missing before the next level-up.
    pub fn xp_to_next_level(&self) -> u32 {
        self.xp_threshold().saturating_sub(self.xp)
    }

    // =========================================================================
    // Mutation (crate-internal, driven by ProgressionEngine)
    // =========================================================================

    /// Stamp a successful cast and award XP. Returns the number of levels gained.
    pub(crate) fn record_cast(&mut self, at: DateTime<Utc>, reward: u32) -> u32 {
        self.last_ability_at = Some(at);
        self.xp = self.xp.saturating_add(reward);
        self.normalize()
    }

    /// Catch up with `stored`, another copy of the same player's record.
    ///
    /// Keeps whichever `(level, xp)` is further ahead and the later cast time,
    /// so neither copy's progress or cooldown moves backwards. Returns whether
    /// anything changed. Records of different players are left untouched.
    pub fn reconcile(&mut self, stored: &PlayerProgression) -> bool {
        if stored.id != self.id {
            return false;
        }
        let before = self.clone();
        if (stored.level, stored.xp) > (self.level, self.xp) {
            self.level = stored.level;
            self.xp = stored.xp;
        }
        self.last_ability_at = self.last_ability_at.max(stored.last_ability_at);
        *self != before
    }

    /// Convert surplus XP into levels until `xp < threshold`.
    fn normalize(&mut self) -> u32 {
        let mut levels_gained = 0;
        while self.xp >= self.xp_threshold() {
            self.xp -= self.xp_threshold();
            self.level = self.level.saturating_add(1);
            levels_gained += 1;
        }
        levels_gained
    }

    fn threshold_for(level: u32) -> u32 {
        level.saturating_mul(XP_PER_LEVEL)
    }
}
