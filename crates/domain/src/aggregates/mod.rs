//! Aggregates - consistency boundaries for domain state.

pub mod player_progression;

pub use player_progression::{PlayerProgression, XP_PER_LEVEL};
