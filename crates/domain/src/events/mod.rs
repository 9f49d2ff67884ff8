//! Domain outcome types.
//!
//! These enums communicate what happened when progression state was
//! evaluated or modified, allowing callers to react appropriately.

pub mod progression_events;

pub use progression_events::{AbilityState, CastOutcome, ProgressionSnapshot};
