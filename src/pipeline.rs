//! Publication pipeline worker.
//!
//! This module owns the synchronization contract between the
//! authoritative document store and the search index: the index contains
//! a denormalized, current copy of every — and only every — published
//! testimony document. Committed testimony writes enqueue a
//! [`TestimonyChange`] on a bounded channel; a dedicated worker thread
//! applies the corresponding upsert or delete with bounded retries.
//!
//! Delivery is at-least-once and applies last-write-wins per document
//! key: each change carries the document's post-commit version, and the
//! worker skips anything at or below the version it last applied for
//! that key. Index failures never affect the triggering write — the
//! authoritative store has already committed by the time a change is
//! enqueued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use uuid::Uuid;

use crate::index::{IndexError, SearchIndex};
use crate::projection::ProjectedTestimony;
use crate::storage::ProfileStore;
use crate::testimony::{Testimony, TestimonyId};

/// A committed change to a testimony document.
#[derive(Debug, Clone)]
pub struct TestimonyChange {
    /// Unique id for this delivery, used in logs.
    pub event_id: Uuid,
    /// Key of the changed document.
    pub id: TestimonyId,
    /// Post-commit version of the document.
    pub version: u64,
    /// Post-commit snapshot; `None` when the document was removed.
    pub current: Option<Testimony>,
}

impl TestimonyChange {
    /// Creates a change record from a post-commit snapshot.
    #[must_use]
    pub fn updated(testimony: Testimony) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            id: testimony.id.clone(),
            version: testimony.version,
            current: Some(testimony),
        }
    }

    /// Creates a change record for a removed document.
    #[must_use]
    pub fn removed(id: TestimonyId, version: u64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            id,
            version,
            current: None,
        }
    }
}

/// Retry policy for index writes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per change, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on the per-attempt delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based).
    ///
    /// Doubles per attempt, capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Max queued changes before enqueueing blocks the producer.
    pub queue_capacity: usize,
    /// Retry behavior for index writes.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug)]
enum PipelineMsg {
    Change(TestimonyChange),
    Flush(Sender<()>),
}

/// Producer handle for enqueueing committed changes.
///
/// Cloneable; the engine keeps one and feeds it after every committed
/// testimony write. Enqueueing blocks when the queue is full
/// (backpressure): the publication invariant tolerates delay but not
/// silent drops.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: Sender<PipelineMsg>,
}

impl ChangeFeed {
    /// Enqueues a committed change.
    ///
    /// If the pipeline has shut down the change is dropped with a warning;
    /// the authoritative write has already committed either way.
    pub fn submit(&self, change: TestimonyChange) {
        let event_id = change.event_id;
        if self.tx.send(PipelineMsg::Change(change)).is_err() {
            tracing::warn!(%event_id, "publication pipeline is gone; change dropped");
        }
    }
}

/// Counters exposed by the pipeline for operational monitoring.
#[derive(Debug, Default)]
struct PipelineCounters {
    applied: AtomicU64,
    failed: AtomicU64,
    stale: AtomicU64,
}

/// Publication pipeline: owns the worker that keeps the search index
/// consistent with the document store.
#[derive(Debug)]
pub struct PublicationPipeline {
    tx: Sender<PipelineMsg>,
    counters: Arc<PipelineCounters>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl PublicationPipeline {
    /// Starts the pipeline worker.
    ///
    /// `profiles` is read (bypassing rules — this is a server-side
    /// process) to denormalize the author's display name into each
    /// projection.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        index: Arc<dyn SearchIndex>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let (tx, rx) = bounded::<PipelineMsg>(config.queue_capacity.max(1));
        let counters = Arc::new(PipelineCounters::default());

        let worker_counters = Arc::clone(&counters);
        let retry = config.retry.clone();
        let join = thread::Builder::new()
            .name("rostra-publication".to_string())
            .spawn(move || worker_loop(&retry, &*index, &*profiles, &rx, &worker_counters))
            .expect("failed to spawn rostra publication worker");

        Self {
            tx,
            counters,
            join: Mutex::new(Some(join)),
        }
    }

    /// Returns a producer handle for the engine.
    #[must_use]
    pub fn feed(&self) -> ChangeFeed {
        ChangeFeed {
            tx: self.tx.clone(),
        }
    }

    /// Blocks until every change enqueued before this call has been
    /// applied (or given up on). Returns false if the worker is gone.
    #[must_use]
    pub fn flush(&self) -> bool {
        let (reply_tx, reply_rx) = bounded::<()>(1);
        if self.tx.send(PipelineMsg::Flush(reply_tx)).is_err() {
            return false;
        }
        reply_rx.recv().is_ok()
    }

    /// Number of changes successfully applied to the index.
    #[must_use]
    pub fn applied_projections(&self) -> u64 {
        self.counters.applied.load(Ordering::Relaxed)
    }

    /// Number of changes abandoned after exhausting retries.
    #[must_use]
    pub fn failed_projections(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Number of changes skipped as stale re-deliveries.
    #[must_use]
    pub fn stale_skipped(&self) -> u64 {
        self.counters.stale.load(Ordering::Relaxed)
    }
}

impl Drop for PublicationPipeline {
    fn drop(&mut self) {
        // Close our sender so the worker can terminate once the last
        // ChangeFeed clone is gone.
        let (dummy_tx, _) = bounded::<PipelineMsg>(1);
        let old_tx = std::mem::replace(&mut self.tx, dummy_tx);
        drop(old_tx);

        if let Ok(mut guard) = self.join.lock() {
            if let Some(handle) = guard.take() {
                // Do not join here.
                //
                // Callers may keep `ChangeFeed` clones alive beyond the
                // pipeline's lifetime, and each clone holds a sender. If we
                // joined, the worker could stay alive (channel remains open)
                // and Drop would deadlock.
                //
                // Detaching is safe: the worker exits once the last sender
                // is dropped.
                drop(handle);
            }
        }
    }
}

fn worker_loop(
    retry: &RetryPolicy,
    index: &dyn SearchIndex,
    profiles: &dyn ProfileStore,
    rx: &Receiver<PipelineMsg>,
    counters: &PipelineCounters,
) {
    tracing::info!("publication worker started");

    let mut last_applied: HashMap<TestimonyId, u64> = HashMap::new();

    while let Ok(msg) = rx.recv() {
        match msg {
            PipelineMsg::Flush(reply) => {
                let _ = reply.send(());
            }
            PipelineMsg::Change(change) => {
                if let Some(&applied) = last_applied.get(&change.id) {
                    if change.version <= applied {
                        // Re-delivery or out-of-order duplicate for this key.
                        counters.stale.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(
                            event_id = %change.event_id,
                            id = %change.id,
                            version = change.version,
                            applied,
                            "skipping stale change"
                        );
                        continue;
                    }
                }

                if apply_with_retry(retry, index, profiles, &change) {
                    last_applied.insert(change.id.clone(), change.version);
                    counters.applied.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    tracing::info!("publication worker stopped");
}

/// Applies one change to the index, retrying transient failures.
///
/// Returns true on success. Exhausted or permanent failures are logged
/// as operational alerts; the worker carries on with the next change.
fn apply_with_retry(
    retry: &RetryPolicy,
    index: &dyn SearchIndex,
    profiles: &dyn ProfileStore,
    change: &TestimonyChange,
) -> bool {
    let max_attempts = retry.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let result = apply_once(index, profiles, change);
        match result {
            Ok(()) => {
                tracing::debug!(
                    event_id = %change.event_id,
                    id = %change.id,
                    version = change.version,
                    attempt,
                    "projection applied"
                );
                return true;
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = retry.delay_for(attempt);
                tracing::warn!(
                    event_id = %change.event_id,
                    id = %change.id,
                    attempt,
                    error = %err,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "index write failed; retrying"
                );
                thread::sleep(delay);
            }
            Err(err) => {
                tracing::error!(
                    event_id = %change.event_id,
                    id = %change.id,
                    version = change.version,
                    attempts = attempt,
                    error = %err,
                    "giving up on index projection"
                );
                return false;
            }
        }
    }

    false
}

fn apply_once(
    index: &dyn SearchIndex,
    profiles: &dyn ProfileStore,
    change: &TestimonyChange,
) -> Result<(), IndexError> {
    match &change.current {
        Some(testimony) if testimony.is_published() => {
            let display_name = match profiles.get(&testimony.author) {
                Ok(profile) => profile.and_then(|p| p.full_name),
                Err(err) => {
                    tracing::warn!(
                        id = %change.id,
                        error = %err,
                        "profile lookup failed; projecting without display name"
                    );
                    None
                }
            };
            match ProjectedTestimony::project(testimony, display_name) {
                Some(projection) => index.upsert(projection),
                // Published without a timestamp cannot pass the rule
                // engine; treat it as unpublishable rather than panic.
                None => index.delete(&change.id),
            }
        }
        _ => index.delete(&change.id),
    }
}
