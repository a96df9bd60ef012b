use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::geocode::Geocoder;
use crate::model::{ResolvedSegment, StreetSegmentRecord};
use crate::retry::RetryPolicy;

const PROGRESS_EVERY: usize = 20;
/// Upper bound on records in flight; far below the semaphore's permit limit.
pub const MAX_CONCURRENCY: usize = 1024;

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Both endpoints resolved.
    Line,
    /// No `to_street`, so only the start was looked up.
    Point,
    /// `to_street` present but its lookup failed; emitted point-only.
    EndUnresolved,
    /// Start lookup failed; record dropped.
    StartUnresolved,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    pub records: usize,
    pub lines: usize,
    pub points: usize,
    pub end_unresolved: usize,
    pub dropped: usize,
}

impl ResolveStats {
    fn count(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Line => self.lines += 1,
            Resolution::Point => self.points += 1,
            Resolution::EndUnresolved => self.end_unresolved += 1,
            Resolution::StartUnresolved => self.dropped += 1,
        }
    }

    pub fn emitted(&self) -> usize {
        self.lines + self.points + self.end_unresolved
    }
}

/// Resolve one record's endpoints. Never fails: unresolved endpoints are
/// reported through the returned `Resolution`.
pub async fn resolve_record<G: Geocoder + ?Sized>(
    geocoder: &G,
    retry: &RetryPolicy,
    record: StreetSegmentRecord,
) -> (Resolution, Option<ResolvedSegment>) {
    let start_addr = record.start_address();
    let Some(start) = retry
        .run(&start_addr, || geocoder.geocode(&start_addr))
        .await
    else {
        warn!("Could not geocode start: {}", start_addr);
        return (Resolution::StartUnresolved, None);
    };

    let Some(end_addr) = record.end_address() else {
        let segment = ResolvedSegment {
            record,
            start,
            end: None,
        };
        return (Resolution::Point, Some(segment));
    };

    let end = retry.run(&end_addr, || geocoder.geocode(&end_addr)).await;
    let resolution = if end.is_some() {
        Resolution::Line
    } else {
        warn!("Could not geocode end: {} (keeping start only)", end_addr);
        Resolution::EndUnresolved
    };
    (resolution, Some(ResolvedSegment { record, start, end }))
}

/// Geocodes extracted records with a bounded number of records in flight.
///
/// Output order always matches input order regardless of concurrency.
pub struct SegmentResolver<G> {
    geocoder: Arc<G>,
    retry: RetryPolicy,
    concurrency: usize,
    deadline: Option<Duration>,
    show_progress: bool,
}

impl<G: Geocoder + 'static> SegmentResolver<G> {
    pub fn new(geocoder: Arc<G>) -> Self {
        Self {
            geocoder,
            retry: RetryPolicy::default(),
            concurrency: 1,
            deadline: None,
            show_progress: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn resolve_all(
        &self,
        records: Vec<StreetSegmentRecord>,
    ) -> Result<(Vec<ResolvedSegment>, ResolveStats)> {
        let pb = self.progress_bar(records.len());
        self.resolve_tracked(records, &pb).await
    }

    /// The bar is finished on every exit, including a blown deadline.
    async fn resolve_tracked(
        &self,
        records: Vec<StreetSegmentRecord>,
        pb: &ProgressBar,
    ) -> Result<(Vec<ResolvedSegment>, ResolveStats)> {
        let total = records.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        // Workers send (index, outcome); the loop below slots them back in order.
        let (tx, mut rx) = mpsc::channel(self.concurrency.saturating_mul(2));
        let mut tasks = JoinSet::new();

        for (idx, record) in records.into_iter().enumerate() {
            let geocoder = Arc::clone(&self.geocoder);
            let sem = Arc::clone(&semaphore);
            let retry = self.retry;
            let tx = tx.clone();

            tasks.spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return;
                };
                let outcome = resolve_record(geocoder.as_ref(), &retry, record).await;
                let _ = tx.send((idx, outcome)).await;
            });
        }
        drop(tx);

        let mut slots: Vec<Option<(Resolution, Option<ResolvedSegment>)>> = vec![None; total];
        let collect = async {
            let mut done = 0usize;
            while let Some((idx, outcome)) = rx.recv().await {
                slots[idx] = Some(outcome);
                done += 1;
                pb.inc(1);
                if done % PROGRESS_EVERY == 1 {
                    info!("Processed {} of {} locations...", done, total);
                }
            }
        };

        let finished = match self.deadline {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| PipelineError::DeadlineExceeded(limit)),
            None => Ok(collect.await),
        };
        pb.finish_and_clear();
        finished?;
        // Dropping the set aborts anything still queued after a deadline.
        drop(tasks);

        let mut stats = ResolveStats {
            records: total,
            ..Default::default()
        };
        let mut segments = Vec::with_capacity(total);
        for slot in slots {
            // A worker that panicked never reports; treat it like a failed start.
            let (resolution, segment) = slot.unwrap_or((Resolution::StartUnresolved, None));
            stats.count(resolution);
            segments.extend(segment);
        }

        info!(
            "Resolved {} of {} records ({} lines, {} point-only, {} dropped)",
            stats.emitted(),
            total,
            stats.lines,
            stats.points + stats.end_unresolved,
            stats.dropped
        );
        Ok((segments, stats))
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}
