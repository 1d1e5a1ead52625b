//! Drives per-owner collection fetches and feeds the sink.
//!
//! Owners are independent: a truncated grants stream on one owner never
//! blocks another owner's publications. Failure isolation is per
//! owner × kind, provided by the paginator's absorb-and-truncate behavior.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::directory::client::DirectoryClient;
use crate::directory::pages::{Paginator, StreamStatus, DEFAULT_PAGE_DELAY};
use crate::harvest::sink::HarvestSink;
use crate::model::{OwnerRecord, RecordKind};

/// Which collections to fetch per owner, and how hard to push.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub include_publications: bool,
    pub include_grants: bool,
    pub include_teaching: bool,
    /// Pause between pages within one owner × kind stream.
    pub page_delay: Duration,
    /// Owners harvested concurrently in [`Orchestrator::harvest_all`].
    pub max_parallel_owners: usize,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            include_publications: true,
            include_grants: true,
            include_teaching: true,
            page_delay: DEFAULT_PAGE_DELAY,
            max_parallel_owners: 4,
        }
    }
}

impl HarvestOptions {
    fn kinds(&self) -> Vec<RecordKind> {
        RecordKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                RecordKind::Publications => self.include_publications,
                RecordKind::Grants => self.include_grants,
                RecordKind::Teaching => self.include_teaching,
            })
            .collect()
    }
}

/// How one owner × kind stream ended.
#[derive(Debug, Clone)]
pub struct KindReport {
    pub kind: RecordKind,
    pub records: usize,
    pub status: StreamStatus,
}

/// Everything fetched for one owner.
#[derive(Debug, Clone)]
pub struct OwnerReport {
    pub stable_id: String,
    pub kinds: Vec<KindReport>,
}

impl OwnerReport {
    /// True when no stream was cut short.
    pub fn complete(&self) -> bool {
        self.kinds.iter().all(|k| k.status == StreamStatus::Exhausted)
    }
}

/// Composes resolution/scanning output with the collection fetcher.
pub struct Orchestrator {
    client: Arc<DirectoryClient>,
    options: HarvestOptions,
}

impl Orchestrator {
    pub fn new(client: Arc<DirectoryClient>) -> Self {
        Self {
            client,
            options: HarvestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: HarvestOptions) -> Self {
        self.options = options;
        self
    }

    /// Harvests every enabled collection for one owner, streaming records to
    /// `sink` as pages arrive.
    pub async fn harvest_owner(&self, owner: &OwnerRecord, sink: &dyn HarvestSink) -> OwnerReport {
        sink.owner(owner).await;
        let mut kinds = Vec::new();
        for kind in self.options.kinds() {
            let mut pager = Paginator::new(&self.client, owner.stable_id.clone(), kind)
                .with_delay(self.options.page_delay);
            let mut delivered = 0usize;
            while let Some(page) = pager.next_page().await {
                for record in &page {
                    sink.record(owner, kind, record).await;
                }
                delivered += page.len();
            }
            let status = pager.status();
            if status == StreamStatus::Truncated {
                warn!(owner = %owner.stable_id, %kind, delivered, "stream truncated");
                sink.truncated(owner, kind).await;
            }
            kinds.push(KindReport {
                kind,
                records: delivered,
                status,
            });
        }
        info!(
            owner = %owner.stable_id,
            records = kinds.iter().map(|k| k.records).sum::<usize>(),
            "owner harvested"
        );
        OwnerReport {
            stable_id: owner.stable_id.clone(),
            kinds,
        }
    }

    /// Harvests a batch of owners with bounded parallelism. Reports arrive in
    /// completion order.
    pub async fn harvest_all(
        self: &Arc<Self>,
        owners: Vec<OwnerRecord>,
        sink: Arc<dyn HarvestSink>,
    ) -> Vec<OwnerReport> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_parallel_owners.max(1)));
        let mut tasks = JoinSet::new();
        for owner in owners {
            let orchestrator = Arc::clone(self);
            let sink = Arc::clone(&sink);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return None;
                };
                Some(orchestrator.harvest_owner(&owner, sink.as_ref()).await)
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(error) => warn!(%error, "owner harvest task panicked"),
            }
        }
        reports
    }
}
