//! rugtrace - net SOL movement between an address and every counterparty
//!
//! Scans the full transaction history of one address, extracts native
//! balance deltas per counterparty, and aggregates them into a ledger sorted
//! by absolute net movement.
//!
//! ```rust,no_run
//! use rugtrace::{chain::RpcConnector, scan_core::{ScanController, ScanOptions}};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = ScanController::new(RpcConnector::default(), ScanOptions::default());
//! let outcome = controller
//!     .start("https://api.mainnet-beta.solana.com", "Vote111111111111111111111111111111111111111")
//!     .await?;
//! if let Some(report) = outcome.report() {
//!     println!("{} counterparties", report.entries.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod report;
pub mod scan_core;
pub mod ui;

pub use config::{ConfigError, ScanConfig};
pub use scan_core::{LedgerEntry, ScanController, ScanError, ScanOptions, ScanOutcome};
