//! Output boundary of the engine.
//!
//! The core has no opinion on output format: CSV/JSON writers, document
//! generators, and display layers all live behind [`HarvestSink`].

use async_trait::async_trait;

use crate::model::{LinkedRecord, OwnerRecord, RecordKind};

/// Receives the harvest stream: bare owners plus
/// `(owner, kind, record)` triples.
///
/// Implementations own their I/O and its failure handling; the orchestrator
/// never interprets sink behavior.
#[async_trait]
pub trait HarvestSink: Send + Sync {
    /// An owner entered the harvest (also the full output of scan-only runs).
    async fn owner(&self, owner: &OwnerRecord);

    /// One flattened linked record fetched under `owner`.
    async fn record(&self, owner: &OwnerRecord, kind: RecordKind, record: &LinkedRecord);

    /// The `owner`×`kind` stream stopped early on a failed page; records
    /// already delivered stand.
    async fn truncated(&self, _owner: &OwnerRecord, _kind: RecordKind) {}
}

/// Collects everything in memory. Useful for tests and small interactive runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: std::sync::Mutex<MemorySinkState>,
}

#[derive(Debug, Default)]
struct MemorySinkState {
    owners: Vec<OwnerRecord>,
    records: Vec<(String, RecordKind, LinkedRecord)>,
    truncations: Vec<(String, RecordKind)>,
}

impl MemorySink {
    pub fn owners(&self) -> Vec<OwnerRecord> {
        self.inner.lock().unwrap().owners.clone()
    }

    /// `(owner stable id, kind, record)` triples in delivery order.
    pub fn records(&self) -> Vec<(String, RecordKind, LinkedRecord)> {
        self.inner.lock().unwrap().records.clone()
    }

    pub fn truncations(&self) -> Vec<(String, RecordKind)> {
        self.inner.lock().unwrap().truncations.clone()
    }
}

#[async_trait]
impl HarvestSink for MemorySink {
    async fn owner(&self, owner: &OwnerRecord) {
        self.inner.lock().unwrap().owners.push(owner.clone());
    }

    async fn record(&self, owner: &OwnerRecord, kind: RecordKind, record: &LinkedRecord) {
        self.inner
            .lock()
            .unwrap()
            .records
            .push((owner.stable_id.clone(), kind, record.clone()));
    }

    async fn truncated(&self, owner: &OwnerRecord, kind: RecordKind) {
        self.inner
            .lock()
            .unwrap()
            .truncations
            .push((owner.stable_id.clone(), kind));
    }
}
