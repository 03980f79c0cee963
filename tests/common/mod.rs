//! In-memory chain used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use rugtrace::chain::{
    BalanceMeta, ChainClient, ChainConnector, ChainError, TransactionDetail, SYSTEM_PROGRAM_ID,
};
use solana_pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn owner() -> String {
    Pubkey::new_from_array([1; 32]).to_string()
}

pub fn sig(i: usize) -> String {
    format!("sig{:03}", i)
}

/// Plain transfer where `counterparty` gains `amount` lamports (negative: loses).
pub fn transfer(signature: &str, counterparty: &str, amount: i64) -> TransactionDetail {
    let base: u64 = 10_000_000_000;
    TransactionDetail {
        signature: signature.to_string(),
        slot: 100,
        block_time: Some(1_700_000_000),
        account_keys: vec![owner(), counterparty.to_string(), SYSTEM_PROGRAM_ID.to_string()],
        meta: Some(BalanceMeta {
            pre_balances: vec![base, base, 1],
            post_balances: vec![
                (base as i64 - amount - 5_000) as u64,
                (base as i64 + amount) as u64,
                1,
            ],
            failed: false,
        }),
    }
}

#[derive(Default)]
pub struct MockChain {
    pub signatures: Vec<String>,
    pub page_size: usize,
    pub details: HashMap<String, TransactionDetail>,
    /// Remaining failures per signature before the detail fetch succeeds.
    pub detail_failures: HashMap<String, AtomicU32>,
    pub page_failures: AtomicU32,

    /// When set, the first page request waits for `release`.
    pub gate_first_page: AtomicBool,
    pub page_requested: Notify,
    pub release: Notify,

    /// When set, the detail fetch of this signature waits for
    /// `detail_release` once.
    pub gated_detail: Mutex<Option<String>>,
    pub detail_requested: Notify,
    pub detail_release: Notify,

    pub page_calls: AtomicUsize,
    pub detail_calls: Mutex<HashMap<String, usize>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub settled: AtomicUsize,
    /// Per signature: number of fetches that had settled when it started.
    pub settled_at_start: Mutex<HashMap<String, usize>>,
}

impl MockChain {
    pub fn new(signatures: Vec<String>, page_size: usize) -> Self {
        Self {
            signatures,
            page_size,
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, detail: TransactionDetail) -> Self {
        self.details.insert(detail.signature.clone(), detail);
        self
    }

    pub fn failing_detail(mut self, signature: &str, failures: u32) -> Self {
        self.detail_failures
            .insert(signature.to_string(), AtomicU32::new(failures));
        self
    }

    pub fn failing_pages(self, failures: u32) -> Self {
        self.page_failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn gated(self) -> Self {
        self.gate_first_page.store(true, Ordering::SeqCst);
        self
    }

    pub fn gated_detail(self, signature: &str) -> Self {
        *self.gated_detail.lock().unwrap() = Some(signature.to_string());
        self
    }

    pub fn detail_calls_for(&self, signature: &str) -> usize {
        self.detail_calls
            .lock()
            .unwrap()
            .get(signature)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_detail_calls(&self) -> usize {
        self.detail_calls.lock().unwrap().values().sum()
    }

    fn page_after(&self, before: Option<&str>) -> Vec<String> {
        let start = match before {
            None => 0,
            Some(cursor) => match self.signatures.iter().position(|s| s == cursor) {
                Some(pos) => pos + 1,
                None => self.signatures.len(),
            },
        };
        let end = (start + self.page_size).min(self.signatures.len());
        self.signatures[start..end].to_vec()
    }
}

/// Client handle handed out by `MockConnector`; all handles share one chain.
pub struct MockClient(pub Arc<MockChain>);

impl std::ops::Deref for MockClient {
    type Target = MockChain;

    fn deref(&self) -> &MockChain {
        &self.0
    }
}

#[async_trait]
impl ChainClient for MockClient {
    async fn signatures_before(
        &self,
        _address: &Pubkey,
        before: Option<&str>,
    ) -> Result<Vec<String>, ChainError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        if self.gate_first_page.swap(false, Ordering::SeqCst) {
            self.page_requested.notify_one();
            self.release.notified().await;
        }

        if self
            .page_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ChainError::Status(503));
        }

        Ok(self.page_after(before))
    }

    async fn transaction(&self, signature: &str) -> Result<Option<TransactionDetail>, ChainError> {
        *self
            .detail_calls
            .lock()
            .unwrap()
            .entry(signature.to_string())
            .or_insert(0) += 1;

        self.settled_at_start
            .lock()
            .unwrap()
            .entry(signature.to_string())
            .or_insert_with(|| self.settled.load(Ordering::SeqCst));

        let gated = {
            let mut gate = self.gated_detail.lock().unwrap();
            if gate.as_deref() == Some(signature) {
                gate.take();
                true
            } else {
                false
            }
        };
        if gated {
            self.detail_requested.notify_one();
            self.detail_release.notified().await;
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failed = self
            .detail_failures
            .get(signature)
            .map(|remaining| {
                remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            })
            .unwrap_or(false);

        if failed {
            return Err(ChainError::Rpc {
                code: -32005,
                message: "Node is behind".to_string(),
            });
        }

        self.settled.fetch_add(1, Ordering::SeqCst);
        Ok(self.details.get(signature).cloned())
    }
}

pub struct MockConnector {
    pub chain: Arc<MockChain>,
}

impl MockConnector {
    pub fn new(chain: MockChain) -> (Self, Arc<MockChain>) {
        let chain = Arc::new(chain);
        (
            Self {
                chain: Arc::clone(&chain),
            },
            chain,
        )
    }
}

impl ChainConnector for MockConnector {
    type Client = MockClient;

    fn connect(&self, _endpoint: &str) -> Result<Self::Client, ChainError> {
        Ok(MockClient(Arc::clone(&self.chain)))
    }
}
