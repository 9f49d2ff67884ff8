//! EmberRPG Engine library.
//!
//! Tracks per-player ability XP and levels for a game server.
//!
//! ## Structure
//!
//! - `infrastructure/` - ports, SQLite persistence, save queue, config
//! - `stores/` - in-memory player sessions
//! - `use_cases/` - connect, cast, stats and disconnect flows
//! - `api/` - host events, feedback text and the console host
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

/// Shared fixtures for unit tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
