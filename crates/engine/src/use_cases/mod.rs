//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.
//! Use cases orchestrate the session registry, the progression rules and
//! the persistence gateway.

pub mod progression;

// Re-export main types
pub use progression::{
    CastAbility, CastResult, ConnectPlayer, DisconnectPlayer, ProgressionUseCases, ShowStats,
};
