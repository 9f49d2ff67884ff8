use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable per-player identity assigned by the game host (e.g. a SteamID64).
///
/// The core never holds a reference to host-owned player objects; this
/// number is the only handle it keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u64);

impl PlayerId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Bit-preserving conversion to SQLite's signed 64-bit INTEGER.
    ///
    /// Identities above `i64::MAX` map to negative keys and come back
    /// unchanged through [`PlayerId::from_storage_key`].
    pub const fn to_storage_key(self) -> i64 {
        self.0 as i64
    }

    pub const fn from_storage_key(key: i64) -> Self {
        Self(key as u64)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<PlayerId> for u64 {
    fn from(value: PlayerId) -> Self {
        value.0
    }
}

impl FromStr for PlayerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_round_trips_full_u64_range() {
        for raw in [0, 1, 76_561_198_000_000_000, i64::MAX as u64, u64::MAX] {
            let id = PlayerId::new(raw);
            assert_eq!(PlayerId::from_storage_key(id.to_storage_key()), id);
        }
    }

    #[test]
    fn parses_from_trimmed_string() {
        let id: PlayerId = " 123 ".parse().expect("valid id");
        assert_eq!(id.as_u64(), 123);
        assert!("abc".parse::<PlayerId>().is_err());
        assert!("-5".parse::<PlayerId>().is_err());
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId::new(42)).expect("serialize");
        assert_eq!(json, "42");
    }
}
