//! In-memory state storage modules.
//!
//! Stores manage runtime state that doesn't belong in the database:
//! - `PlayerSessionRegistry` - progression records of connected players

pub mod session;

// Re-export store types
pub use session::{PlayerSession, PlayerSessionRegistry, RecordOrigin};
