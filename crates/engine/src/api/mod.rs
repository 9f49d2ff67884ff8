//! API layer - entry points from the game host.
//!
//! - `events` - host event model and the handler that dispatches it
//! - `feedback` - player-facing message text
//! - `console` - stdin/stdout host used by the binary

pub mod console;
pub mod events;
pub mod feedback;

pub use console::ConsoleHost;
pub use events::{HostEvent, HostEventHandler};
