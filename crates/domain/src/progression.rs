//! Progression rules - cooldown check, XP award, level-up normalization.
//!
//! Everything here is pure: the only state touched is the record passed in,
//! and time is always supplied by the caller.

use chrono::{DateTime, Duration, Utc};

use crate::aggregates::PlayerProgression;
use crate::error::DomainError;
use crate::events::{AbilityState, CastOutcome, ProgressionSnapshot};

pub const DEFAULT_COOLDOWN_SECS: i64 = 30;
pub const DEFAULT_ABILITY_REWARD: u32 = 10;

/// Tunable parameters of the ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionRules {
    cooldown: Duration,
    ability_reward: u32,
}

impl ProgressionRules {
    pub fn new(cooldown: Duration, ability_reward: u32) -> Result<Self, DomainError> {
        if cooldown < Duration::zero() {
            return Err(DomainError::validation("ability cooldown cannot be negative"));
        }
        if ability_reward == 0 {
            return Err(DomainError::validation("ability reward must be at least 1 XP"));
        }
        Ok(Self {
            cooldown,
            ability_reward,
        })
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn ability_reward(&self) -> u32 {
        self.ability_reward
    }
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            ability_reward: DEFAULT_ABILITY_REWARD,
        }
    }
}

/// Applies [`ProgressionRules`] to [`PlayerProgression`] records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressionEngine {
    rules: ProgressionRules,
}

impl ProgressionEngine {
    pub fn new(rules: ProgressionRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ProgressionRules {
        &self.rules
    }

    /// Whether the ability can be cast at `now`.
    ///
    /// A `now` earlier than the last cast (clock skew) counts as zero elapsed
    /// time, so the remaining cooldown never exceeds the configured window.
    pub fn ability_state(&self, record: &PlayerProgression, now: DateTime<Utc>) -> AbilityState {
        let Some(last) = record.last_ability_at() else {
            return AbilityState::Ready;
        };

        let elapsed = (now - last).max(Duration::zero());
        if elapsed < self.rules.cooldown {
            AbilityState::OnCooldown {
                remaining: self.rules.cooldown - elapsed,
            }
        } else {
            AbilityState::Ready
        }
    }

    /// Attempt a cast at `now`.
    ///
    /// On cooldown the record is left untouched. Otherwise the cast is
    /// stamped, the reward added, and XP normalized into as many levels as
    /// it covers.
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use emberrpg_domain::{CastOutcome, PlayerId, PlayerProgression, ProgressionEngine};
    ///
    /// let engine = ProgressionEngine::default();
    /// let mut record = PlayerProgression::new(PlayerId::new(123));
    /// let t0 = Utc::now();
    ///
    /// assert_eq!(engine.cast_ability(&mut record, t0), CastOutcome::XpGained { gained: 10, xp: 10 });
    /// assert_eq!(
    ///     engine.cast_ability(&mut record, t0 + Duration::seconds(10)),
    ///     CastOutcome::CooldownActive { remaining: Duration::seconds(20) }
    /// );
    /// ```
    pub fn cast_ability(&self, record: &mut PlayerProgression, now: DateTime<Utc>) -> CastOutcome {
        if let AbilityState::OnCooldown { remaining } = self.ability_state(record, now) {
            return CastOutcome::CooldownActive { remaining };
        }

        let reward = self.rules.ability_reward;
        let levels_gained = record.record_cast(now, reward);
        if levels_gained > 0 {
            CastOutcome::LevelUp {
                new_level: record.level(),
                levels_gained,
                xp: record.xp(),
            }
        } else {
            CastOutcome::XpGained {
                gained: reward,
                xp: record.xp(),
            }
        }
    }

    pub fn snapshot(&self, record: &PlayerProgression) -> ProgressionSnapshot {
        ProgressionSnapshot {
            level: record.level(),
            xp: record.xp(),
            threshold: record.xp_threshold(),
            xp_to_next: record.xp_to_next_level(),
        }
    }
}
