//! Player-facing feedback lines.

use chrono::Duration;
use emberrpg_domain::ProgressionSnapshot;

/// `remaining` rounded up to whole seconds.
pub fn cooldown_notice(remaining: Duration) -> String {
    let micros = remaining.num_microseconds().unwrap_or(i64::MAX).max(0) as u64;
    format!("Ability is recharging! Ready in {}s.", micros.div_ceil(1_000_000))
}

pub fn cast_notice(reward: u32, snapshot: &ProgressionSnapshot) -> String {
    format!(
        "Ability cast! +{reward} XP ({}/{})",
        snapshot.xp, snapshot.threshold
    )
}

pub fn level_up_notice(level: u32) -> String {
    format!("Level up! You are now level {level}!")
}

pub fn stats_line(snapshot: &ProgressionSnapshot) -> String {
    format!(
        "Level: {} | XP: {}/{} ({} to next level)",
        snapshot.level, snapshot.xp, snapshot.threshold, snapshot.xp_to_next
    )
}
