//! Persistence for player progression.
//!
//! - `connection` - pool setup and bounded query execution
//! - `progression_repository` - SQLite implementation of `ProgressionRepo`
//! - `gateway` - load-through reads and queued, ordered writes

pub mod connection;
pub mod gateway;
pub mod progression_repository;

pub use gateway::PersistenceGateway;
pub use progression_repository::SqliteProgressionRepo;
