//! Batched transaction detail fetches
//!
//! Signatures are split into consecutive batches of `batch_size`. Every
//! signature in a batch is fetched concurrently; the next batch starts only
//! after all fetches of the current one have settled, so at most
//! `batch_size` requests are in flight at any time.

use super::progress::ProgressSink;
use super::retry::RetryPolicy;
use super::transfer_extractor::{extract_transfers, Delta, ExtractorPolicy};
use crate::chain::ChainClient;
use futures::future::join_all;
use std::ops::Range;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BATCH_SIZE: usize = 20;

/// What one signature's fetch settled to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Usable transaction; may hold no deltas if nothing moved.
    Transfers(Vec<Delta>),
    /// Absent, failed, or out-of-scope transaction, or retries exhausted.
    Unusable,
    /// Cancelled before a usable response arrived.
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub batch_sizes: Vec<usize>,
    pub with_transfers: usize,
    pub without_movement: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Consecutive index ranges of at most `batch_size` items.
pub fn plan_batches(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

pub struct BatchFetcher<'a, C: ChainClient + ?Sized> {
    client: &'a C,
    owner: &'a str,
    batch_size: usize,
    retry: &'a RetryPolicy,
    policy: ExtractorPolicy,
    progress: &'a dyn ProgressSink,
}

impl<'a, C: ChainClient + ?Sized> BatchFetcher<'a, C> {
    pub fn new(
        client: &'a C,
        owner: &'a str,
        batch_size: usize,
        retry: &'a RetryPolicy,
        policy: ExtractorPolicy,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            client,
            owner,
            batch_size: batch_size.max(1),
            retry,
            policy,
            progress,
        }
    }

    /// Fetch every signature and return the concatenated deltas.
    pub async fn fetch_all(&self, signatures: &[String], cancel: &CancellationToken) -> Vec<Delta> {
        let mut all = Vec::new();
        self.run(signatures, cancel, |deltas| all.extend_from_slice(deltas))
            .await;
        all
    }

    /// Fetch batch by batch, handing each settled batch's deltas to
    /// `on_batch` before the next batch begins.
    pub async fn run<F>(&self, signatures: &[String], cancel: &CancellationToken, mut on_batch: F) -> FetchStats
    where
        F: FnMut(&[Delta]),
    {
        let total = signatures.len();
        let mut stats = FetchStats::default();

        for (batch_no, range) in plan_batches(total, self.batch_size).into_iter().enumerate() {
            if cancel.is_cancelled() {
                log::debug!("Batch fetch cancelled before batch {}", batch_no + 1);
                stats.cancelled = true;
                return stats;
            }

            log::debug!(
                "📦 Batch {} covers signatures {}..{} of {}",
                batch_no + 1,
                range.start + 1,
                range.end,
                total
            );
            stats.batch_sizes.push(range.len());

            let fetches = range
                .map(|position| self.fetch_one(position, total, &signatures[position], cancel));
            let outcomes = join_all(fetches).await;

            let mut batch_deltas = Vec::new();
            for outcome in outcomes {
                match outcome {
                    FetchOutcome::Transfers(deltas) if deltas.is_empty() => stats.without_movement += 1,
                    FetchOutcome::Transfers(deltas) => {
                        stats.with_transfers += 1;
                        batch_deltas.extend(deltas);
                    }
                    FetchOutcome::Unusable => stats.skipped += 1,
                    FetchOutcome::Cancelled => stats.cancelled = true,
                }
            }

            on_batch(&batch_deltas);
        }

        stats.cancelled |= cancel.is_cancelled();
        stats
    }

    /// Fetch and extract one signature, retrying transient failures.
    pub async fn fetch_one(
        &self,
        position: usize,
        total: usize,
        signature: &str,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let mut backoff = self.retry.backoff();

        self.progress
            .emit(format!("Collecting transaction {} of {}...", position + 1, total));

        loop {
            if cancel.is_cancelled() {
                return FetchOutcome::Cancelled;
            }

            match self.client.transaction(signature).await {
                Ok(detail) => {
                    return match extract_transfers(detail.as_ref(), self.owner, self.policy) {
                        Some(deltas) => FetchOutcome::Transfers(deltas),
                        None => {
                            log::debug!("Skipping unusable transaction {}", signature);
                            FetchOutcome::Unusable
                        }
                    };
                }
                Err(e) => {
                    log::warn!("❌ Fetching {} failed: {}", signature, e);
                    self.progress.emit(format!(
                        "Error fetching transaction: {}, retrying in {}...",
                        e,
                        self.retry.describe_delay()
                    ));

                    if backoff.sleep().await.is_err() {
                        log::error!(
                            "Giving up on {} after {} attempts",
                            signature,
                            backoff.attempts()
                        );
                        return FetchOutcome::Unusable;
                    }
                }
            }
        }
    }
}
