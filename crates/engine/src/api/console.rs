//! Line-oriented console host.
//!
//! Stands in for a game server: each stdin line becomes a [`HostEvent`],
//! feedback and sounds are printed to stdout.
//!
//! ```text
//! connect 123
//! cast 123
//! stats 123
//! disconnect 123
//! quit
//! ```

use std::io::Write;
use std::sync::Mutex;

use emberrpg_domain::PlayerId;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::events::{HostEvent, HostEventHandler};
use crate::infrastructure::ports::HostPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Event(HostEvent),
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unknown command '{0}' (expected connect, cast, stats, disconnect or quit)")]
    Unknown(String),
    #[error("'{0}' needs a player id")]
    MissingPlayerId(String),
}

/// Parse one console line. Blank lines yield `Ok(None)`.
///
/// A player id that is not a number is passed on as a missing identity,
/// the same way a host reports an unauthenticated player.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, CommandParseError> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let verb = verb.to_ascii_lowercase();
    if verb == "quit" || verb == "exit" {
        return Ok(Some(ConsoleCommand::Quit));
    }

    let identity = match parts.next() {
        Some(raw) => raw.parse::<PlayerId>().ok().map(PlayerId::as_u64),
        None if is_event_verb(&verb) => return Err(CommandParseError::MissingPlayerId(verb)),
        None => return Err(CommandParseError::Unknown(verb)),
    };

    let event = match verb.as_str() {
        "connect" => HostEvent::PlayerConnected { identity },
        "cast" => HostEvent::AbilityCommandInvoked { identity },
        "stats" => HostEvent::StatsCommandInvoked { identity },
        "disconnect" => HostEvent::PlayerDisconnected { identity },
        _ => return Err(CommandParseError::Unknown(verb)),
    };
    Ok(Some(ConsoleCommand::Event(event)))
}

fn is_event_verb(verb: &str) -> bool {
    matches!(verb, "connect" | "cast" | "stats" | "disconnect")
}

/// Feed console lines to `handler` until `quit` or end of input.
pub async fn run<R>(handler: &HostEventHandler, input: R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(ConsoleCommand::Event(event))) => handler.handle(event).await,
            Ok(Some(ConsoleCommand::Quit)) => {
                tracing::info!("Quit requested from console");
                break;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(line = %line, error = %e, "Ignoring console command"),
        }
    }
    Ok(())
}

/// [`HostPort`] that writes feedback as text lines.
pub struct ConsoleHost {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleHost {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        let out: Box<dyn Write + Send> = Box::new(out);
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    fn write_line(&self, player_id: PlayerId, text: &str) {
        let Ok(mut out) = self.out.lock() else {
            tracing::warn!(player_id = %player_id, "Console output lock poisoned");
            return;
        };
        if let Err(e) = writeln!(out, "[{player_id}] {text}").and_then(|()| out.flush()) {
            tracing::warn!(player_id = %player_id, error = %e, "Failed to write console feedback");
        }
    }
}

impl HostPort for ConsoleHost {
    fn send_message(&self, player_id: PlayerId, message: &str) {
        self.write_line(player_id, message);
    }

    fn play_sound(&self, player_id: PlayerId, asset: &str) {
        self.write_line(player_id, &format!("(sound: {asset})"));
    }
}
