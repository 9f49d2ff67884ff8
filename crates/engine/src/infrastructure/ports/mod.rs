//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Progression storage (could swap SQLite -> MySQL/Postgres)
//! - The game host (chat feedback, sounds)
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{ProgressionRepo, SaveOutcome};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::HostPort;

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::MockHostPort;
#[cfg(test)]
pub use repos::MockProgressionRepo;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{RepoError, SaveError};
