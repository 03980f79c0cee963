//! rugtrace - counterparty flow scanner
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin rugtrace -- <ADDRESS>
//! cargo run --bin rugtrace -- --rpc https://my-node.example --batch-size 10 --plain --json out/report.json <ADDRESS>
//! ```
//!
//! ## Environment Variables
//!
//! - `RPC_URL` - JSON-RPC endpoint (default: mainnet-beta public endpoint)
//! - `TARGET_ADDRESS` - address to scan when none is given on the command line
//! - `BATCH_SIZE` - concurrent transaction fetches per batch (default: 20)
//! - `RETRY_BACKOFF_MS` / `MAX_RETRIES` - transient error retry policy
//! - `RPC_TIMEOUT_SECS` - per-request HTTP timeout (default: 60)
//! - `COMMITMENT` - processed | confirmed | finalized (default: confirmed)
//! - `RUST_LOG` - log level (default: info with `--plain`, errors only in the TUI)

use rugtrace::{
    report::save_report,
    scan_core::{ScanController, ScanOutcome, ScanReport},
    ui::{renderer::format_sol, run_ui},
    ScanConfig,
};
use std::sync::Arc;

const USAGE: &str =
    "Usage: rugtrace [--rpc URL] [--batch-size N] [--json PATH] [--plain] [--all-transactions] <ADDRESS>";

fn print_report(report: &ScanReport) {
    println!("{:<46} {:>18} {:>6}", "Address", "SOL Moved", "Txs");
    for entry in &report.entries {
        println!(
            "{:<46} {:>18} {:>6}",
            entry.address,
            format_sol(entry.total),
            entry.transactions.len()
        );
    }
    println!(
        "\n{} signatures, {} counterparties, {} skipped, {}ms",
        report.summary.signatures,
        report.summary.counterparties,
        report.summary.skipped,
        report.summary.elapsed_ms
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let mut config = ScanConfig::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    config.apply_args(&args)?;
    config.validate()?;

    // Without RUST_LOG the TUI only shows errors on stderr.
    let mut builder = match config.log_filter() {
        Some(filter) => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)),
        None => env_logger::Builder::from_default_env(),
    };
    builder.target(env_logger::Target::Stderr).init();

    let address = config
        .target_address
        .clone()
        .ok_or_else(|| format!("No address given. {}", USAGE))?;

    log::info!("🚀 Starting rugtrace");
    log::info!("   Address: {}", address);
    log::info!("   RPC URL: {}", config.rpc_url);
    log::info!("   Batch size: {}", config.batch_size);
    log::info!("   Commitment: {:?}", config.commitment);

    let controller = Arc::new(ScanController::new(config.connector(), config.scan_options()));

    if !config.plain {
        run_ui(Arc::clone(&controller), &config.rpc_url, &address).await?;

        if let (Some(path), Some(report)) = (&config.json_output, controller.last_report()) {
            save_report(&report, path)?;
        }
        return Ok(());
    }

    let ctrl_c = Arc::clone(&controller);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling scan");
            ctrl_c.cancel();
        }
    });

    match controller.start(&config.rpc_url, &address).await? {
        ScanOutcome::Completed(report) => {
            print_report(&report);
            if let Some(path) = &config.json_output {
                save_report(&report, path)?;
            }
        }
        ScanOutcome::Cancelled(_) => {
            log::warn!("🛑 Scan cancelled, no results");
        }
    }

    Ok(())
}
