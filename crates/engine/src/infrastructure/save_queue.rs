//! Background writers for progression saves.
//!
//! Saves are spread over a fixed set of lanes. A player always hashes to the
//! same lane and each lane has a single consumer, so saves for one player
//! reach storage in the order they were submitted. Submitting never waits:
//! a full lane rejects the save instead of stalling the game thread.
//!
//! Readers use [`SaveQueue::settled`] to wait until a player's queued saves
//! are in storage before loading that player again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use emberrpg_domain::{PlayerId, PlayerProgression};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::infrastructure::config::SaveQueueConfig;
use crate::infrastructure::ports::{ProgressionRepo, RepoError, SaveError, SaveOutcome};

type SaveResult = Result<SaveOutcome, SaveError>;

struct SaveJob {
    record: PlayerProgression,
    reply: oneshot::Sender<SaveResult>,
}

enum LaneJob {
    Save(SaveJob),
    /// Answered once every job ahead of it on the lane has finished.
    Barrier(oneshot::Sender<()>),
}

/// Completion handle for one submitted save.
///
/// Dropping it is fine; the save still runs and failures are logged.
#[derive(Debug)]
pub struct SaveReceipt {
    player_id: PlayerId,
    reply: oneshot::Receiver<SaveResult>,
}

impl SaveReceipt {
    fn channel(player_id: PlayerId) -> (oneshot::Sender<SaveResult>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { player_id, reply: rx })
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Wait until the save has been applied, superseded, or given up on.
    pub async fn wait(self) -> SaveResult {
        self.reply.await.unwrap_or(Err(SaveError::WorkerGone))
    }
}

/// Point-in-time save counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub submitted: u64,
    pub written: u64,
    pub superseded: u64,
    pub failed: u64,
    /// Never queued (lane full or queue shut down)
    pub rejected: u64,
}

#[derive(Default)]
struct SaveCounters {
    submitted: AtomicU64,
    written: AtomicU64,
    superseded: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

impl SaveCounters {
    fn snapshot(&self) -> SaveStats {
        SaveStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Sharded, ordered, non-blocking save pipeline.
pub struct SaveQueue {
    lanes: Vec<mpsc::Sender<LaneJob>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    counters: Arc<SaveCounters>,
}

impl SaveQueue {
    /// Spawn the lane workers. Must be called from within a tokio runtime.
    pub fn start(repo: Arc<dyn ProgressionRepo>, config: &SaveQueueConfig) -> Self {
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        let counters = Arc::new(SaveCounters::default());

        let lanes = (0..config.workers.max(1))
            .map(|lane| {
                let (tx, rx) = mpsc::channel(config.lane_capacity.max(1));
                tracker.spawn(run_lane(
                    lane,
                    rx,
                    Arc::clone(&repo),
                    config.clone(),
                    Arc::clone(&counters),
                    shutdown.clone(),
                ));
                tx
            })
            .collect::<Vec<_>>();

        tracing::info!(
            lanes = lanes.len(),
            lane_capacity = config.lane_capacity,
            "Save queue started"
        );

        Self {
            lanes,
            shutdown,
            tracker,
            counters,
        }
    }

    /// Queue `record` for writing. Never blocks.
    pub fn submit(&self, record: PlayerProgression) -> SaveReceipt {
        let player_id = record.id();
        let (reply, receipt) = SaveReceipt::channel(player_id);
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        match self.lane(player_id).try_send(LaneJob::Save(SaveJob { record, reply })) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                tracing::warn!(player_id = %player_id, "Save lane full, dropping save");
                self.reject(
                    job,
                    SaveError::QueueFull {
                        player_id: player_id.to_string(),
                    },
                );
            }
            Err(TrySendError::Closed(job)) => {
                tracing::warn!(player_id = %player_id, "Save submitted after shutdown");
                self.reject(job, SaveError::Closed);
            }
        }
        receipt
    }

    /// Queue `record`, waiting for room on a full lane instead of rejecting.
    ///
    /// For flushes off the game thread, e.g. at shutdown.
    pub async fn submit_waiting(&self, record: PlayerProgression) -> SaveReceipt {
        let player_id = record.id();
        let (reply, receipt) = SaveReceipt::channel(player_id);
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let job = LaneJob::Save(SaveJob { record, reply });
        if let Err(mpsc::error::SendError(job)) = self.lane(player_id).send(job).await {
            tracing::warn!(player_id = %player_id, "Save submitted after shutdown");
            self.reject(job, SaveError::Closed);
        }
        receipt
    }

    /// Wait until every save already queued for `player_id` has been applied
    /// or given up on. Returns at once if the queue has shut down.
    pub async fn settled(&self, player_id: PlayerId) {
        let (done, settled) = oneshot::channel();
        if self.lane(player_id).send(LaneJob::Barrier(done)).await.is_ok() {
            let _ = settled.await;
        }
    }

    pub fn stats(&self) -> SaveStats {
        self.counters.snapshot()
    }

    /// Stop accepting saves, write everything already queued, and wait for
    /// every lane to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!(stats = ?self.stats(), "Save queue drained");
    }

    fn lane_for(&self, player_id: PlayerId) -> usize {
        (player_id.as_u64() % self.lanes.len() as u64) as usize
    }

    fn lane(&self, player_id: PlayerId) -> &mpsc::Sender<LaneJob> {
        &self.lanes[self.lane_for(player_id)]
    }

    fn reject(&self, job: LaneJob, error: SaveError) {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        if let LaneJob::Save(job) = job {
            let _ = job.reply.send(Err(error));
        }
    }
}

async fn run_lane(
    lane: usize,
    mut rx: mpsc::Receiver<LaneJob>,
    repo: Arc<dyn ProgressionRepo>,
    config: SaveQueueConfig,
    counters: Arc<SaveCounters>,
    shutdown: CancellationToken,
) {
    tracing::debug!(lane, "Save lane running");
    loop {
        tokio::select! {
            biased;
            job = rx.recv() => match job {
                Some(job) => process(job, repo.as_ref(), &config, &counters).await,
                None => break,
            },
            _ = shutdown.cancelled() => {
                rx.close();
                while let Some(job) = rx.recv().await {
                    process(job, repo.as_ref(), &config, &counters).await;
                }
                break;
            }
        }
    }
    tracing::debug!(lane, "Save lane stopped");
}

async fn process(
    job: LaneJob,
    repo: &dyn ProgressionRepo,
    config: &SaveQueueConfig,
    counters: &SaveCounters,
) {
    match job {
        LaneJob::Save(job) => write(job, repo, config, counters).await,
        LaneJob::Barrier(done) => {
            let _ = done.send(());
        }
    }
}

async fn write(
    job: SaveJob,
    repo: &dyn ProgressionRepo,
    config: &SaveQueueConfig,
    counters: &SaveCounters,
) {
    let player_id = job.record.id();
    let result = write_with_retry(repo, &job.record, config).await;

    match &result {
        Ok(SaveOutcome::Written) => {
            counters.written.fetch_add(1, Ordering::Relaxed);
        }
        Ok(SaveOutcome::Superseded) => {
            counters.superseded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(player_id = %player_id, "Save superseded by stored progress");
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(player_id = %player_id, error = %e, "Failed to save progression");
        }
    }

    let _ = job.reply.send(result.map_err(SaveError::from));
}

async fn write_with_retry(
    repo: &dyn ProgressionRepo,
    record: &PlayerProgression,
    config: &SaveQueueConfig,
) -> Result<SaveOutcome, RepoError> {
    let mut attempt = 0;
    loop {
        match repo.save(record).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                attempt += 1;
                let delay = config.retry_delay(attempt);
                tracing::warn!(
                    player_id = %record.id(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Save failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockProgressionRepo;
    use crate::test_fixtures::{at, record_with_xp, InMemoryProgressionRepo};

    fn fast_config(workers: usize, lane_capacity: usize) -> SaveQueueConfig {
        SaveQueueConfig {
            workers,
            lane_capacity,
            max_retries: 2,
            retry_base_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn saves_for_one_player_apply_in_submission_order() {
        let repo = Arc::new(InMemoryProgressionRepo::new());
        let queue = SaveQueue::start(repo.clone(), &fast_config(4, 64));
        let id = PlayerId::new(123);

        let receipts: Vec<_> = (1..=20)
            .map(|n| queue.submit(record_with_xp(id, n * 3, at(n as i64))))
            .collect();
        for receipt in receipts {
            assert_eq!(receipt.wait().await.expect("saved"), SaveOutcome::Written);
        }

        let xps: Vec<u32> = repo.saved_for(id).iter().map(|r| r.xp()).collect();
        assert_eq!(xps, (1..=20).map(|n| n * 3).collect::<Vec<_>>());
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_drains_pending_saves() {
        let repo = Arc::new(InMemoryProgressionRepo::new().with_save_delay_ms(5));
        let queue = SaveQueue::start(repo.clone(), &fast_config(1, 16));
        let id = PlayerId::new(9);

        let receipts: Vec<_> = (1..=5)
            .map(|n| queue.submit(record_with_xp(id, n, at(n as i64))))
            .collect();
        queue.shutdown().await;

        assert_eq!(repo.saved_for(id).len(), 5);
        for receipt in receipts {
            assert!(receipt.wait().await.is_ok());
        }
        assert_eq!(queue.stats().written, 5);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let repo = Arc::new(InMemoryProgressionRepo::new());
        let queue = SaveQueue::start(repo.clone(), &fast_config(2, 4));
        queue.shutdown().await;

        let receipt = queue.submit(PlayerProgression::new(PlayerId::new(1)));

        assert!(matches!(receipt.wait().await, Err(SaveError::Closed)));
        assert_eq!(queue.stats().rejected, 1);
        assert!(repo.saved_for(PlayerId::new(1)).is_empty());
    }

    #[tokio::test]
    async fn full_lane_rejects_without_blocking() {
        let repo = Arc::new(InMemoryProgressionRepo::new().gated());
        let queue = SaveQueue::start(repo.clone(), &fast_config(1, 1));
        let id = PlayerId::new(4);

        let in_flight = queue.submit(record_with_xp(id, 10, at(1)));
        repo.wait_until_save_started().await;
        let buffered = queue.submit(record_with_xp(id, 20, at(2)));
        let rejected = queue.submit(record_with_xp(id, 30, at(3)));

        assert!(matches!(
            rejected.wait().await,
            Err(SaveError::QueueFull { .. })
        ));

        repo.open_gate();
        assert!(in_flight.wait().await.is_ok());
        assert!(buffered.wait().await.is_ok());
        queue.shutdown().await;

        let stats = queue.stats();
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.written, 2);
        assert_eq!(stats.rejected, 1);
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let mut repo = MockProgressionRepo::new();
        let mut calls = 0;
        repo.expect_save().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(RepoError::database("save_progression", "database is locked"))
            } else {
                Ok(SaveOutcome::Written)
            }
        });
        let queue = SaveQueue::start(Arc::new(repo), &fast_config(1, 4));

        let receipt = queue.submit(PlayerProgression::new(PlayerId::new(1)));

        assert_eq!(receipt.wait().await.expect("saved"), SaveOutcome::Written);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn exhausted_retries_are_reported() {
        let mut repo = MockProgressionRepo::new();
        repo.expect_save()
            .times(3)
            .returning(|_| Err(RepoError::timeout("save_progression")));
        let queue = SaveQueue::start(Arc::new(repo), &fast_config(1, 4));

        let receipt = queue.submit(PlayerProgression::new(PlayerId::new(1)));

        assert!(matches!(
            receipt.wait().await,
            Err(SaveError::Repo(RepoError::Timeout { .. }))
        ));
        queue.shutdown().await;
        assert_eq!(queue.stats().failed, 1);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let mut repo = MockProgressionRepo::new();
        repo.expect_save()
            .times(1)
            .returning(|_| Err(RepoError::serialization("bad row")));
        let queue = SaveQueue::start(Arc::new(repo), &fast_config(1, 4));

        let receipt = queue.submit(PlayerProgression::new(PlayerId::new(1)));

        assert!(matches!(
            receipt.wait().await,
            Err(SaveError::Repo(RepoError::Serialization(_)))
        ));
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn settled_waits_for_queued_saves() {
        let repo = Arc::new(InMemoryProgressionRepo::new().with_save_delay_ms(20));
        let queue = SaveQueue::start(repo.clone(), &fast_config(2, 16));
        let id = PlayerId::new(30);

        for n in 1..=3 {
            queue.submit(record_with_xp(id, n * 10, at(n as i64)));
        }
        queue.settled(id).await;

        assert_eq!(repo.saved_for(id).len(), 3);
        assert_eq!(repo.stored(id).map(|r| r.xp()), Some(30));
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn settled_returns_after_shutdown() {
        let queue = SaveQueue::start(Arc::new(InMemoryProgressionRepo::new()), &fast_config(1, 4));
        queue.shutdown().await;

        let settled =
            tokio::time::timeout(std::time::Duration::from_secs(1), queue.settled(PlayerId::new(1)))
                .await;

        assert!(settled.is_ok());
    }

    #[tokio::test]
    async fn waiting_submit_queues_behind_full_lane() {
        let repo = Arc::new(InMemoryProgressionRepo::new().gated());
        let queue = SaveQueue::start(repo.clone(), &fast_config(1, 1));
        let id = PlayerId::new(4);

        queue.submit(record_with_xp(id, 10, at(1)));
        repo.wait_until_save_started().await;
        queue.submit(record_with_xp(id, 20, at(2)));

        let (flushed, ()) = tokio::join!(queue.submit_waiting(record_with_xp(id, 30, at(3))), async {
            repo.open_gate();
        });

        assert_eq!(flushed.wait().await.expect("saved"), SaveOutcome::Written);
        queue.shutdown().await;
        assert_eq!(queue.stats().rejected, 0);
        assert_eq!(repo.stored(id).map(|r| r.xp()), Some(30));
    }

    #[tokio::test]
    async fn player_always_maps_to_same_lane() {
        let repo = Arc::new(InMemoryProgressionRepo::new());
        let queue = SaveQueue::start(repo, &fast_config(4, 4));

        assert_eq!(queue.lane_for(PlayerId::new(5)), 1);
        assert_eq!(queue.lane_for(PlayerId::new(5)), queue.lane_for(PlayerId::new(9)));
        assert_ne!(queue.lane_for(PlayerId::new(5)), queue.lane_for(PlayerId::new(6)));
        queue.shutdown().await;
    }
}
