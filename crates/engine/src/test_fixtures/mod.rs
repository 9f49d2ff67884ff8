//! Shared helpers for engine unit tests.
//!
//! - `InMemoryProgressionRepo` - a `ProgressionRepo` that records every call
//! - `RecordingHost` - a `HostPort` that keeps the messages and sounds it was asked to emit
//! - timestamp and record builders

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use emberrpg_domain::{PlayerId, PlayerProgression};
use tokio::sync::{Notify, Semaphore};

use crate::infrastructure::ports::{HostPort, ProgressionRepo, RepoError, SaveOutcome};

// =============================================================================
// Builders
// =============================================================================

/// Fixed base instant plus `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
        .single()
        .expect("valid base instant")
        + chrono::Duration::seconds(secs)
}

/// Level 1 record holding `xp`, last cast at `last_cast`.
pub fn record_with_xp(id: PlayerId, xp: u32, last_cast: DateTime<Utc>) -> PlayerProgression {
    PlayerProgression::restore(id, xp, 1, Some(last_cast)).expect("valid record")
}

// =============================================================================
// In-memory repository
// =============================================================================

/// Keeps rows in a map and logs every save in arrival order.
pub struct InMemoryProgressionRepo {
    rows: Mutex<HashMap<PlayerId, PlayerProgression>>,
    saves: Mutex<Vec<PlayerProgression>>,
    loads: AtomicUsize,
    fail_loads: AtomicBool,
    load_delay: Duration,
    save_delay: Duration,
    gate: Option<Semaphore>,
    save_started: Notify,
}

impl InMemoryProgressionRepo {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            saves: Mutex::new(Vec::new()),
            loads: AtomicUsize::new(0),
            fail_loads: AtomicBool::new(false),
            load_delay: Duration::ZERO,
            save_delay: Duration::ZERO,
            gate: None,
            save_started: Notify::new(),
        }
    }

    pub fn with_row(self, record: PlayerProgression) -> Self {
        self.rows
            .lock()
            .expect("rows lock")
            .insert(record.id(), record);
        self
    }

    pub fn with_load_delay_ms(mut self, ms: u64) -> Self {
        self.load_delay = Duration::from_millis(ms);
        self
    }

    pub fn with_save_delay_ms(mut self, ms: u64) -> Self {
        self.save_delay = Duration::from_millis(ms);
        self
    }

    /// Saves block until `open_gate` is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn failing_loads(self) -> Self {
        self.fail_loads.store(true, Ordering::SeqCst);
        self
    }

    /// Loads succeed again after `failing_loads`.
    pub fn restore_loads(&self) {
        self.fail_loads.store(false, Ordering::SeqCst);
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub async fn wait_until_save_started(&self) {
        self.save_started.notified().await;
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saved_for(&self, id: PlayerId) -> Vec<PlayerProgression> {
        self.saves
            .lock()
            .expect("saves lock")
            .iter()
            .filter(|r| r.id() == id)
            .cloned()
            .collect()
    }

    pub fn stored(&self, id: PlayerId) -> Option<PlayerProgression> {
        self.rows.lock().expect("rows lock").get(&id).cloned()
    }
}

impl Default for InMemoryProgressionRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressionRepo for InMemoryProgressionRepo {
    async fn ensure_schema(&self) -> Result<(), RepoError> {
        Ok(())
    }

    async fn load_or_create(&self, id: PlayerId) -> Result<PlayerProgression, RepoError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(RepoError::database("load_progression", "connection refused"));
        }
        let mut rows = self.rows.lock().expect("rows lock");
        Ok(rows
            .entry(id)
            .or_insert_with(|| PlayerProgression::new(id))
            .clone())
    }

    async fn save(&self, record: &PlayerProgression) -> Result<SaveOutcome, RepoError> {
        self.save_started.notify_one();
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate open");
        }
        if !self.save_delay.is_zero() {
            tokio::time::sleep(self.save_delay).await;
        }
        self.saves.lock().expect("saves lock").push(record.clone());
        self.rows
            .lock()
            .expect("rows lock")
            .insert(record.id(), record.clone());
        Ok(SaveOutcome::Written)
    }
}

// =============================================================================
// Recording host
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Message(PlayerId, String),
    Sound(PlayerId, String),
}

/// Host that remembers what it was asked to do, in order.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Message(_, text) => Some(text),
                HostCall::Sound(..) => None,
            })
            .collect()
    }

    pub fn last_message(&self) -> Option<String> {
        self.messages().pop()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("calls lock").clear();
    }
}

impl HostPort for RecordingHost {
    fn send_message(&self, player_id: PlayerId, message: &str) {
        self.calls
            .lock()
            .expect("calls lock")
            .push(HostCall::Message(player_id, message.to_string()));
    }

    fn play_sound(&self, player_id: PlayerId, asset: &str) {
        self.calls
            .lock()
            .expect("calls lock")
            .push(HostCall::Sound(player_id, asset.to_string()));
    }
}
