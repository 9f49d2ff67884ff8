//! Error types for port operations.

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Entity not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Operation did not finish within the configured query timeout.
    #[error("Timed out in {operation}")]
    Timeout { operation: &'static str },

    /// Stored row could not be turned back into a domain record.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    /// Create a NotFound error with entity type and ID context.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    pub fn timeout(operation: &'static str) -> Self {
        Self::Timeout { operation }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// Connection/query failures that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::Timeout { .. })
    }
}

/// Why a background save did not reach storage.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("Save lane for player {player_id} is full")]
    QueueFull { player_id: String },

    #[error("Save queue is shut down")]
    Closed,

    #[error("Save worker stopped before reporting a result")]
    WorkerGone,

    #[error(transparent)]
    Repo(#[from] RepoError),
}
