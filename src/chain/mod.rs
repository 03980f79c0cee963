//! Chain client collaborator
//!
//! The scan core never talks HTTP directly. It only needs three things from
//! the chain:
//! - address parsing (typed `Pubkey` or a parse error)
//! - newest-first signature pages for an address, walked with a `before` cursor
//! - transaction detail lookup by signature
//!
//! `RpcChainClient` implements this over Solana JSON-RPC. Tests plug in
//! in-memory clients through the same traits.

pub mod rpc_client;

use async_trait::async_trait;
use solana_pubkey::Pubkey;

pub use rpc_client::{Commitment, RpcChainClient, RpcConnector};

/// System Program id (all-zero key)
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Unexpected RPC response: {0}")]
    Decode(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Balance section of a fetched transaction.
///
/// `pre_balances` and `post_balances` are aligned by position with
/// `TransactionDetail::account_keys`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceMeta {
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub failed: bool,
}

/// One fetched transaction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDetail {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub account_keys: Vec<String>,
    pub meta: Option<BalanceMeta>,
}

/// Parse a base58 account address.
pub fn parse_address(raw: &str) -> Result<Pubkey, ChainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ChainError::InvalidAddress("empty address".to_string()));
    }

    Pubkey::try_from(trimmed).map_err(|_| ChainError::InvalidAddress(trimmed.to_string()))
}

/// Full account key list for a transaction: static message keys followed by
/// address-table-loaded writable keys, then loaded readonly keys. This is the
/// order the balance arrays use.
pub fn resolve_account_keys(
    static_keys: &[String],
    loaded_writable: &[String],
    loaded_readonly: &[String],
) -> Vec<String> {
    let mut all_keys = static_keys.to_vec();
    all_keys.extend(loaded_writable.iter().cloned());
    all_keys.extend(loaded_readonly.iter().cloned());
    all_keys
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn parse_address(&self, raw: &str) -> Result<Pubkey, ChainError> {
        parse_address(raw)
    }

    /// One page of signatures older than `before`, newest first. An empty
    /// page means the history is exhausted.
    async fn signatures_before(
        &self,
        address: &Pubkey,
        before: Option<&str>,
    ) -> Result<Vec<String>, ChainError>;

    /// `Ok(None)` when the transaction is unknown or not yet confirmed.
    async fn transaction(&self, signature: &str) -> Result<Option<TransactionDetail>, ChainError>;
}

/// Builds a client for an RPC endpoint chosen at scan start.
pub trait ChainConnector: Send + Sync {
    type Client: ChainClient + 'static;

    fn connect(&self, endpoint: &str) -> Result<Self::Client, ChainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let key = Pubkey::new_from_array([7; 32]);
        let parsed = parse_address(&format!("  {}  ", key)).unwrap();
        assert_eq!(parsed, key);

        assert!(matches!(parse_address(""), Err(ChainError::InvalidAddress(_))));
        assert!(matches!(parse_address("not-base58!"), Err(ChainError::InvalidAddress(_))));
        assert!(matches!(parse_address("abc"), Err(ChainError::InvalidAddress(_))));
    }

    #[test]
    fn test_system_program_id_is_default_key() {
        assert_eq!(Pubkey::default().to_string(), SYSTEM_PROGRAM_ID);
    }

    #[test]
    fn test_resolve_account_keys_order() {
        let keys = resolve_account_keys(
            &["a".to_string(), "b".to_string()],
            &["w".to_string()],
            &["r1".to_string(), "r2".to_string()],
        );
        assert_eq!(keys, vec!["a", "b", "w", "r1", "r2"]);
    }
}
