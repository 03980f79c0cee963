//! Scan controller
//!
//! Runs one scan at a time: signature pagination, then batched detail
//! fetches folded into the ledger, then the sorted result. Stages are
//! sequential; batching needs the full signature list.
//!
//! ```text
//! Idle ─start─▶ Scanning ─▶ Completed
//!                  │
//!                  └─cancel / newer start─▶ Cancelled
//! Completed | Cancelled ─start─▶ Scanning
//! ```
//!
//! Every scan gets its own `CancellationToken` and generation number.
//! Starting a new scan cancels the previous token; the superseded scan stops
//! at its next checkpoint and can no longer touch controller state or the
//! status channel.

use super::batch_fetcher::{BatchFetcher, FetchStats, DEFAULT_BATCH_SIZE};
use super::error::ScanError;
use super::ledger::{Ledger, LedgerEntry};
use super::paginator::collect_signatures;
use super::progress::ProgressSink;
use super::retry::RetryPolicy;
use super::transfer_extractor::ExtractorPolicy;
use crate::chain::{ChainClient, ChainConnector};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanPhase {
    Idle,
    Scanning,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub extractor: ExtractorPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            extractor: ExtractorPolicy::default(),
        }
    }
}

/// Working state of one scan, owned by the running `start` call.
#[derive(Debug)]
pub struct ScanState {
    pub collected_signatures: Vec<String>,
    pub ledger: Ledger,
    pub cancel: CancellationToken,
}

impl ScanState {
    fn new(cancel: CancellationToken) -> Self {
        Self {
            collected_signatures: Vec::new(),
            ledger: Ledger::new(),
            cancel,
        }
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub address: String,
    pub signatures: usize,
    pub batches: usize,
    pub with_transfers: usize,
    pub without_movement: usize,
    pub skipped: usize,
    pub counterparties: usize,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub summary: ScanSummary,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug)]
pub enum ScanOutcome {
    Completed(ScanReport),
    /// Partial state at the point the scan observed cancellation. Callers
    /// are expected to discard it.
    Cancelled(ScanState),
}

impl ScanOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanOutcome::Cancelled(_))
    }

    pub fn report(&self) -> Option<&ScanReport> {
        match self {
            ScanOutcome::Completed(report) => Some(report),
            ScanOutcome::Cancelled(_) => None,
        }
    }
}

struct ControllerState {
    phase: ScanPhase,
    generation: u64,
    cancel: Option<CancellationToken>,
    last_report: Option<ScanReport>,
}

pub struct ScanController<K: ChainConnector> {
    connector: K,
    options: ScanOptions,
    status: watch::Sender<String>,
    observer: Option<Arc<dyn ProgressSink>>,
    state: Mutex<ControllerState>,
}

/// Progress sink for one scan generation. Drops emissions once the scan is
/// cancelled, finished or superseded, so `Cancelled.` stays the last status
/// of a cancelled scan. The state lock is held while publishing.
struct ScanProgress<'a, K: ChainConnector> {
    controller: &'a ScanController<K>,
    generation: u64,
    cancel: CancellationToken,
}

impl<K: ChainConnector> ProgressSink for ScanProgress<'_, K> {
    fn emit(&self, message: String) {
        let state = self.controller.lock();
        if state.generation != self.generation
            || state.phase != ScanPhase::Scanning
            || self.cancel.is_cancelled()
        {
            log::debug!("Dropping progress from stopped scan #{}: {}", self.generation, message);
            return;
        }
        self.controller.publish(message);
        drop(state);
    }
}

impl<K: ChainConnector> ScanController<K> {
    pub fn new(connector: K, options: ScanOptions) -> Self {
        let (status, _) = watch::channel(String::new());

        Self {
            connector,
            options,
            status,
            observer: None,
            state: Mutex::new(ControllerState {
                phase: ScanPhase::Idle,
                generation: 0,
                cancel: None,
                last_report: None,
            }),
        }
    }

    /// Also send every status message to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressSink>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn phase(&self) -> ScanPhase {
        self.lock().phase
    }

    /// Sorted entries of the last completed scan.
    pub fn result(&self) -> Option<Vec<LedgerEntry>> {
        self.lock().last_report.as_ref().map(|r| r.entries.clone())
    }

    pub fn last_report(&self) -> Option<ScanReport> {
        self.lock().last_report.clone()
    }

    /// Ask the running scan to stop at its next checkpoint. In-flight
    /// requests are not interrupted.
    pub fn cancel(&self) {
        let mut state = self.lock();
        if state.phase != ScanPhase::Scanning {
            return;
        }
        state.phase = ScanPhase::Cancelled;

        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        self.publish("Cancelled.".to_string());
    }

    pub async fn start(&self, rpc_endpoint: &str, address: &str) -> Result<ScanOutcome, ScanError> {
        let address = address.trim();
        if address.is_empty() {
            self.publish("No address given".to_string());
            return Err(ScanError::InvalidInput("no address given".to_string()));
        }

        if rpc_endpoint.trim().is_empty() {
            return Err(ScanError::InvalidInput("no RPC endpoint given".to_string()));
        }

        if self.options.batch_size == 0 {
            return Err(ScanError::InvalidInput("batch size must be at least 1".to_string()));
        }

        let client = self.connector.connect(rpc_endpoint).map_err(|e| {
            ScanError::InvalidInput(format!("cannot use RPC endpoint {}: {}", rpc_endpoint, e))
        })?;

        let owner = client.parse_address(address).map_err(|e| {
            self.publish(format!("Invalid address: {}", address));
            ScanError::InvalidInput(e.to_string())
        })?;

        let (generation, token) = self.begin();
        let progress = ScanProgress {
            controller: self,
            generation,
            cancel: token.clone(),
        };
        let started = Instant::now();

        log::info!("🚀 Scan #{} of {} via {}", generation, address, rpc_endpoint);
        progress.emit("Finding transactions...".to_string());

        let mut scan = ScanState::new(token.clone());

        scan.collected_signatures =
            collect_signatures(&client, &owner, &self.options.retry, &token, &progress).await;

        if scan.cancelled() {
            return Ok(self.finish_cancelled(generation, scan));
        }

        let owner_str = owner.to_string();
        let fetcher = BatchFetcher::new(
            &client,
            &owner_str,
            self.options.batch_size,
            &self.options.retry,
            self.options.extractor,
            &progress,
        );

        let ledger = &mut scan.ledger;
        let stats: FetchStats = fetcher
            .run(&scan.collected_signatures, &token, |deltas| ledger.fold(deltas))
            .await;

        if stats.cancelled || scan.cancelled() {
            return Ok(self.finish_cancelled(generation, scan));
        }

        let entries = scan.ledger.sorted_output();
        let summary = ScanSummary {
            address: owner_str,
            signatures: scan.collected_signatures.len(),
            batches: stats.batch_sizes.len(),
            with_transfers: stats.with_transfers,
            without_movement: stats.without_movement,
            skipped: stats.skipped,
            counterparties: entries.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
        };

        log::info!(
            "✅ Scan #{} done: {} signatures, {} counterparties, {} skipped in {}ms",
            generation,
            summary.signatures,
            summary.counterparties,
            summary.skipped,
            summary.elapsed_ms
        );

        let report = ScanReport { summary, entries };
        if !self.complete(generation, &report) {
            return Ok(self.finish_cancelled(generation, scan));
        }

        Ok(ScanOutcome::Completed(report))
    }

    /// Record `report` as the result of scan `generation`. Only a scan that
    /// is still current and still `Scanning` may complete; a `cancel()` that
    /// raced the last batch wins.
    fn complete(&self, generation: u64, report: &ScanReport) -> bool {
        let mut state = self.lock();
        if state.generation != generation || state.phase != ScanPhase::Scanning {
            return false;
        }

        state.phase = ScanPhase::Completed;
        state.cancel = None;
        state.last_report = Some(report.clone());
        self.publish("Finished fetching transactions.".to_string());
        true
    }

    /// Supersede any running scan and register a new one.
    fn begin(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut state = self.lock();

        if let Some(previous) = state.cancel.take() {
            log::info!("Superseding scan #{}", state.generation);
            previous.cancel();
        }

        state.generation += 1;
        state.phase = ScanPhase::Scanning;
        state.cancel = Some(token.clone());
        state.last_report = None;

        (state.generation, token)
    }

    fn finish_cancelled(&self, generation: u64, scan: ScanState) -> ScanOutcome {
        log::info!(
            "🛑 Scan #{} cancelled after {} signatures",
            generation,
            scan.collected_signatures.len()
        );

        let mut state = self.lock();
        if state.generation == generation {
            state.phase = ScanPhase::Cancelled;
            state.cancel = None;
        }

        ScanOutcome::Cancelled(scan)
    }

    fn publish(&self, message: String) {
        if let Some(observer) = &self.observer {
            observer.emit(message.clone());
        }
        self.status.emit(message);
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
