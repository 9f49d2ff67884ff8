//! EmberRPG domain crate.
//!
//! Pure progression types and rules: no I/O, no async runtime. The engine
//! crate drives these from host events and persists the results.

pub mod aggregates;
pub mod error;
pub mod events;
pub mod ids;
pub mod progression;

pub use aggregates::{PlayerProgression, XP_PER_LEVEL};
pub use error::DomainError;
pub use events::{AbilityState, CastOutcome, ProgressionSnapshot};
pub use ids::PlayerId;
pub use progression::{
    ProgressionEngine, ProgressionRules, DEFAULT_ABILITY_REWARD, DEFAULT_COOLDOWN_SECS,
};
