//! Ports towards the hosting game server.

use emberrpg_domain::PlayerId;

/// Side effects requested from the game host.
///
/// Calls must not block: hosts typically queue them for their own main
/// thread.
#[cfg_attr(test, mockall::automock)]
pub trait HostPort: Send + Sync {
    /// Show a feedback line to one player (chat/console).
    fn send_message(&self, player_id: PlayerId, message: &str);

    /// Play a named sound asset for a player's successful cast.
    fn play_sound(&self, player_id: PlayerId, asset: &str);
}
