//! Cursor-order page walker for linked-record collections.
//!
//! A harvest is best-effort: a page that fails mid-stream truncates the
//! stream instead of failing the run, and the caller can tell truncation
//! apart from normal exhaustion via [`Paginator::status`].

use std::time::Duration;

use tracing::{debug, warn};

use crate::directory::client::DirectoryClient;
use crate::model::{LinkedRecord, RecordKind};

/// Pause before each follow-up page request. Politeness, not correctness.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// How a page stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Still mid-stream.
    Active,
    /// All pages were served.
    Exhausted,
    /// A page request failed; records before it were kept.
    Truncated,
}

/// Walks one owner's collection of `kind` from offset 0 until exhaustion.
///
/// Pages are requested strictly in cursor order. A `Paginator` is single-use:
/// it cannot be restarted mid-stream, a fresh one starts back at offset 0.
pub struct Paginator<'a> {
    client: &'a DirectoryClient,
    owner_stable_id: String,
    kind: RecordKind,
    per_page: usize,
    delay: Duration,
    start: usize,
    pages_fetched: usize,
    status: StreamStatus,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a DirectoryClient, owner_stable_id: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            client,
            owner_stable_id: owner_stable_id.into(),
            kind,
            per_page: kind.default_page_size(),
            delay: DEFAULT_PAGE_DELAY,
            start: 0,
            pages_fetched: 0,
            status: StreamStatus::Active,
        }
    }

    pub fn with_page_size(mut self, per_page: usize) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Stream state; `Exhausted`/`Truncated` are terminal.
    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetches and flattens the next page, or `None` once the stream ended.
    ///
    /// Errors never surface here: a failed page marks the stream
    /// [`StreamStatus::Truncated`] and ends it.
    pub async fn next_page(&mut self) -> Option<Vec<LinkedRecord>> {
        if self.status != StreamStatus::Active {
            return None;
        }
        if self.pages_fetched > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let page = match self
            .client
            .linked_page(self.kind, &self.owner_stable_id, self.start, self.per_page)
            .await
        {
            Ok(page) => page,
            Err(error) => {
                warn!(
                    owner = %self.owner_stable_id,
                    kind = %self.kind,
                    start = self.start,
                    %error,
                    "page fetch failed, truncating stream"
                );
                self.status = StreamStatus::Truncated;
                return None;
            }
        };
        self.pages_fetched += 1;

        if page.items.is_empty() {
            self.status = StreamStatus::Exhausted;
            return None;
        }

        let records: Vec<LinkedRecord> = page
            .items
            .iter()
            .map(|item| LinkedRecord::from_item(self.kind, &self.owner_stable_id, item))
            .collect();
        debug!(
            owner = %self.owner_stable_id,
            kind = %self.kind,
            start = self.start,
            records = records.len(),
            total = page.total,
            "page fetched"
        );

        self.start += self.per_page;
        if self.start >= page.total {
            self.status = StreamStatus::Exhausted;
        }
        Some(records)
    }

    /// Drains the stream into one flat result.
    pub async fn collect(mut self) -> CollectionFetch {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await {
            records.extend(page);
        }
        CollectionFetch {
            records,
            status: self.status,
            pages_fetched: self.pages_fetched,
        }
    }
}

/// A fully drained page stream.
#[derive(Debug)]
pub struct CollectionFetch {
    pub records: Vec<LinkedRecord>,
    /// [`StreamStatus::Exhausted`] or [`StreamStatus::Truncated`].
    pub status: StreamStatus,
    pub pages_fetched: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::client::ClientConfig;
    use crate::testutil::MockTransport;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn items(n: usize, offset: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"objectId": offset + i, "title": format!("rec {}", offset + i)}))
            .collect()
    }

    fn paged_client(pages: Vec<Result<Value, u16>>) -> (DirectoryClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let transport = MockTransport::new(
            |path| Err(MockTransport::status_error(path, 404)),
            move |path, _| {
                let page = calls_in.fetch_add(1, Ordering::SeqCst);
                match pages.get(page) {
                    Some(Ok(body)) => Ok(body.clone()),
                    Some(Err(status)) => Err(MockTransport::status_error(path, *status)),
                    None => Ok(json!({"resource": [], "pagination": {"total": 0}})),
                }
            },
        );
        (
            DirectoryClient::with_transport(ClientConfig::default(), Arc::new(transport)),
            calls,
        )
    }

    #[tokio::test]
    async fn three_pages_yield_all_records_in_exactly_three_requests() {
        let total = 112;
        let (client, calls) = paged_client(vec![
            Ok(json!({"items": items(50, 0), "pagination": {"total": total}})),
            Ok(json!({"items": items(50, 50), "pagination": {"total": total}})),
            Ok(json!({"items": items(12, 100), "pagination": {"total": total}})),
        ]);

        let fetch = Paginator::new(&client, "450-ac", RecordKind::Publications)
            .with_page_size(50)
            .with_delay(Duration::ZERO)
            .collect()
            .await;

        assert_eq!(fetch.records.len(), 112);
        assert_eq!(fetch.pages_fetched, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetch.status, StreamStatus::Exhausted);
        assert!(fetch.records.iter().all(|r| r.owner_stable_id == "450-ac"));
    }

    #[tokio::test]
    async fn mid_stream_error_truncates_without_propagating() {
        let (client, _) = paged_client(vec![
            Ok(json!({"items": items(50, 0), "pagination": {"total": 150}})),
            Err(503),
            Ok(json!({"items": items(50, 100), "pagination": {"total": 150}})),
        ]);

        let fetch = Paginator::new(&client, "450-ac", RecordKind::Grants)
            .with_page_size(50)
            .with_delay(Duration::ZERO)
            .collect()
            .await;

        assert_eq!(fetch.records.len(), 50);
        assert_eq!(fetch.status, StreamStatus::Truncated);
    }

    #[tokio::test]
    async fn empty_first_page_is_normal_exhaustion() {
        let (client, _) = paged_client(vec![Ok(
            json!({"resource": [], "pagination": {"total": 0}}),
        )]);

        let fetch = Paginator::new(&client, "450-ac", RecordKind::Teaching)
            .with_delay(Duration::ZERO)
            .collect()
            .await;

        assert!(fetch.records.is_empty());
        assert_eq!(fetch.status, StreamStatus::Exhausted);
        assert_eq!(fetch.pages_fetched, 1);
    }

    #[tokio::test]
    async fn stops_once_cursor_reaches_reported_total() {
        // Server says total=25, one full page covers it; no second request.
        let (client, calls) = paged_client(vec![Ok(
            json!({"items": items(25, 0), "pagination": {"total": 25}}),
        )]);

        let fetch = Paginator::new(&client, "450-ac", RecordKind::Grants)
            .with_page_size(25)
            .with_delay(Duration::ZERO)
            .collect()
            .await;

        assert_eq!(fetch.records.len(), 25);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetch.status, StreamStatus::Exhausted);
    }

    #[tokio::test]
    async fn fresh_paginator_restarts_at_offset_zero() {
        let (client, _) = paged_client(vec![
            Ok(json!({"items": items(10, 0), "pagination": {"total": 10}})),
            Ok(json!({"items": items(10, 0), "pagination": {"total": 10}})),
        ]);

        let first = Paginator::new(&client, "450-ac", RecordKind::Grants)
            .with_delay(Duration::ZERO)
            .collect()
            .await;
        let second = Paginator::new(&client, "450-ac", RecordKind::Grants)
            .with_delay(Duration::ZERO)
            .collect()
            .await;
        assert_eq!(first.records.len(), second.records.len());
    }
}
