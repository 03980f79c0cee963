//! Scan core - address history collection and aggregation
//!
//! # Architecture
//!
//! ```text
//! ScanController::start
//!     ↓
//! paginator::collect_signatures   (getSignaturesForAddress, `before` cursor)
//!     ↓
//! BatchFetcher                    (getTransaction × batch_size, concurrent)
//!     ↓
//! transfer_extractor              (pre/post balances → Delta per counterparty)
//!     ↓
//! Ledger                          (fold, then sort by |total|)
//! ```

pub mod batch_fetcher;
pub mod controller;
pub mod error;
pub mod ledger;
pub mod paginator;
pub mod progress;
pub mod retry;
pub mod transfer_extractor;

pub use batch_fetcher::{plan_batches, BatchFetcher, FetchOutcome, FetchStats, DEFAULT_BATCH_SIZE};
pub use controller::{ScanController, ScanOptions, ScanOutcome, ScanPhase, ScanReport, ScanState, ScanSummary};
pub use error::ScanError;
pub use ledger::{Ledger, LedgerEntry, LedgerTransaction};
pub use paginator::collect_signatures;
pub use progress::{LogOnly, ProgressHistory, ProgressSink};
pub use retry::RetryPolicy;
pub use transfer_extractor::{extract_transfers, Delta, ExtractorPolicy};
