//! Repository port traits for database access.

use async_trait::async_trait;
use emberrpg_domain::{PlayerId, PlayerProgression};

use super::error::RepoError;

/// Result of a monotonic save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Row now reflects the record.
    Written,
    /// Storage already held equal-or-newer progress; nothing changed.
    Superseded,
}

// =============================================================================
// Progression Storage
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressionRepo: Send + Sync {
    /// Create the storage layout if absent. Idempotent.
    async fn ensure_schema(&self) -> Result<(), RepoError>;

    /// Existing row for `id`, or a freshly inserted default row.
    ///
    /// Concurrent callers for the same absent identity must end up with
    /// exactly one row.
    async fn load_or_create(&self, id: PlayerId) -> Result<PlayerProgression, RepoError>;

    /// Write `record` unless storage already holds further progress.
    async fn save(&self, record: &PlayerProgression) -> Result<SaveOutcome, RepoError>;
}
