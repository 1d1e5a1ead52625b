//! Bounded-concurrency sweep of the numeric identifier space.
//!
//! The directory has no "list everyone" endpoint, so department and keyword
//! searches fetch each numeric id in a range and test the profile against a
//! caller-supplied predicate. Missing or deleted ids are an expected
//! condition of a noisy directory and are skipped silently; the worker-pool
//! bound is the backpressure protecting the remote service.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::directory::client::DirectoryClient;
use crate::model::OwnerRecord;

/// Upper bound of the directory's numeric id space, from observed data.
pub const DEFAULT_MAX_NUMERIC_ID: u64 = 6000;

/// Pure test applied to each fetched profile.
pub type ScanPredicate = Arc<dyn Fn(&OwnerRecord) -> bool + Send + Sync>;

/// Outcome of inserting into a [`MatchSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Added,
    /// An owner with this stable id is already present.
    Duplicate,
    /// The result cap is reached; the record was discarded.
    CapReached,
}

/// Deduplicated, bounded collection of scan matches.
///
/// No two entries share a stable id; once `max_results` entries are held, no
/// further entries are added (outstanding work may still complete).
#[derive(Debug)]
pub struct MatchSet {
    records: Vec<OwnerRecord>,
    seen: HashSet<String>,
    max_results: usize,
}

impl MatchSet {
    pub fn new(max_results: usize) -> Self {
        Self {
            records: Vec::new(),
            seen: HashSet::new(),
            max_results,
        }
    }

    pub fn insert(&mut self, owner: OwnerRecord) -> InsertOutcome {
        if self.seen.contains(&owner.stable_id) {
            return InsertOutcome::Duplicate;
        }
        if self.records.len() >= self.max_results {
            return InsertOutcome::CapReached;
        }
        self.seen.insert(owner.stable_id.clone());
        self.records.push(owner);
        InsertOutcome::Added
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, stable_id: &str) -> bool {
        self.seen.contains(stable_id)
    }

    pub fn records(&self) -> &[OwnerRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<OwnerRecord> {
        self.records
    }
}

/// Counters for one completed scan.
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    /// Ids dispatched over the range.
    pub ids_scanned: u64,
    /// Ids that could not be fetched or parsed (missing profiles included).
    pub skipped: u64,
    /// Predicate hits inserted into the match set.
    pub matched: u64,
    /// Predicate hits dropped as duplicates or past the result cap.
    pub discarded: u64,
    pub duration_ms: u64,
}

/// A completed scan: the matches plus how the range was covered.
#[derive(Debug)]
pub struct ScanOutcome {
    pub matches: Vec<OwnerRecord>,
    pub stats: ScanStats,
}

/// Sweeps an id range with a fixed-size worker pool.
pub struct Scanner {
    client: Arc<DirectoryClient>,
    max_workers: usize,
    max_results: usize,
}

impl Scanner {
    pub fn new(client: Arc<DirectoryClient>) -> Self {
        Self {
            client,
            max_workers: 10,
            max_results: usize::MAX,
        }
    }

    /// Fixed worker-pool size; this is the only concurrency knob.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Caps accepted matches. Enforced at the insertion boundary: in-flight
    /// fetches still complete, later arrivals are discarded.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Fetch-and-tests every id in `range`, collecting matches in completion
    /// order. Individual task failures never abort the scan.
    pub async fn scan(&self, range: RangeInclusive<u64>, predicate: ScanPredicate) -> ScanOutcome {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let matches = Arc::new(Mutex::new(MatchSet::new(self.max_results)));
        let skipped = Arc::new(AtomicU64::new(0));
        let discarded = Arc::new(AtomicU64::new(0));

        let ids_scanned = if range.is_empty() {
            0
        } else {
            range.end() - range.start() + 1
        };
        info!(
            start = *range.start(),
            end = *range.end(),
            workers = self.max_workers,
            "scanning id range"
        );

        let mut tasks = JoinSet::new();
        for id in range {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let matches = Arc::clone(&matches);
            let skipped = Arc::clone(&skipped);
            let discarded = Arc::clone(&discarded);
            let predicate = Arc::clone(&predicate);

            tasks.spawn(async move {
                // Closed semaphores never happen here; treat it as a skip.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                };
                match client.owner_by_numeric_id(id).await {
                    Ok(Some(owner)) => {
                        if predicate(&owner) {
                            let outcome = matches.lock().unwrap().insert(owner);
                            if outcome != InsertOutcome::Added {
                                discarded.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Ok(None) => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(error) => {
                        // Missing/deleted ids surface as errors too; expected.
                        debug!(id, %error, "id skipped");
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(error) = joined {
                warn!(%error, "scan task panicked");
                skipped.fetch_add(1, Ordering::Relaxed);
            }
        }

        let matches = Arc::try_unwrap(matches)
            .expect("all scan tasks joined")
            .into_inner()
            .expect("match set lock poisoned");
        let stats = ScanStats {
            ids_scanned,
            skipped: skipped.load(Ordering::Relaxed),
            matched: matches.len() as u64,
            discarded: discarded.load(Ordering::Relaxed),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            matched = stats.matched,
            skipped = stats.skipped,
            duration_ms = stats.duration_ms,
            "scan finished"
        );
        ScanOutcome {
            matches: matches.into_records(),
            stats,
        }
    }
}
