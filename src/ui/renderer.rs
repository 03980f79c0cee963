// Formatting helpers shared by the table layout and plain output

use crate::chain::LAMPORTS_PER_SOL;

pub const EXPLORER_TX_URL: &str = "https://solscan.io/tx/";

/// Lamports as SOL with 3 decimals, e.g. `-1.500 SOL`
pub fn format_sol(lamports: i128) -> String {
    format!("{:.3} SOL", lamports as f64 / LAMPORTS_PER_SOL as f64)
}

pub fn explorer_url(signature: &str) -> String {
    format!("{}{}", EXPLORER_TX_URL, signature)
}

pub fn format_block_time(block_time: Option<i64>) -> String {
    use chrono::DateTime;
    use chrono::Utc;

    match block_time.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "N/A".to_string(),
    }
}
