use super::transfer_extractor::Delta;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One transaction's contribution to a counterparty's total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub signature: String,
    pub amount: i128,
    pub block_time: Option<i64>,
}

/// Net movement between the owner and one counterparty.
///
/// `total` always equals the sum of `transactions[..].amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub address: String,
    pub total: i128,
    pub transactions: Vec<LedgerTransaction>,
}

impl LedgerEntry {
    fn new(address: String) -> Self {
        Self {
            address,
            total: 0,
            transactions: Vec::new(),
        }
    }

    fn push(&mut self, delta: &Delta) {
        self.transactions.push(LedgerTransaction {
            signature: delta.signature.clone(),
            amount: delta.amount,
            block_time: delta.block_time,
        });
        self.total += delta.amount;
    }
}

/// Per-counterparty ledger.
///
/// Entries keep the order in which counterparties were first seen, so ties
/// in `sorted_output` are deterministic for a given delta sequence.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    index: HashMap<String, usize>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_deltas<'a, I>(deltas: I) -> Self
    where
        I: IntoIterator<Item = &'a Delta>,
    {
        let mut ledger = Self::new();
        ledger.fold(deltas);
        ledger
    }

    pub fn fold<'a, I>(&mut self, deltas: I)
    where
        I: IntoIterator<Item = &'a Delta>,
    {
        for delta in deltas {
            self.apply(delta);
        }
    }

    pub fn apply(&mut self, delta: &Delta) {
        let slot = match self.index.get(&delta.counterparty) {
            Some(&slot) => slot,
            None => {
                self.entries.push(LedgerEntry::new(delta.counterparty.clone()));
                self.index
                    .insert(delta.counterparty.clone(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        self.entries[slot].push(delta);
    }

    pub fn get(&self, address: &str) -> Option<&LedgerEntry> {
        self.index.get(address).map(|&slot| &self.entries[slot])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Entries sorted by descending absolute total. Stable, so equal
    /// magnitudes keep first-seen order.
    pub fn sorted_output(&self) -> Vec<LedgerEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.total.unsigned_abs().cmp(&a.total.unsigned_abs()));
        sorted
    }

    pub fn into_sorted_output(mut self) -> Vec<LedgerEntry> {
        self.entries
            .sort_by(|a, b| b.total.unsigned_abs().cmp(&a.total.unsigned_abs()));
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(counterparty: &str, amount: i128, signature: &str) -> Delta {
        Delta {
            counterparty: counterparty.to_string(),
            amount,
            signature: signature.to_string(),
            block_time: None,
        }
    }

    #[test]
    fn test_fold_accumulates_per_counterparty() {
        let deltas = vec![
            delta("alice", 100, "s1"),
            delta("bob", -40, "s1"),
            delta("alice", -30, "s2"),
        ];
        let ledger = Ledger::from_deltas(&deltas);

        assert_eq!(ledger.len(), 2);
        let alice = ledger.get("alice").unwrap();
        assert_eq!(alice.total, 70);
        assert_eq!(alice.transactions.len(), 2);
        assert_eq!(alice.transactions[1].signature, "s2");
        assert_eq!(ledger.get("bob").unwrap().total, -40);
    }

    #[test]
    fn test_total_matches_transactions_after_every_fold() {
        let mut ledger = Ledger::new();
        let batches = vec![
            vec![delta("a", 5, "s1"), delta("b", -7, "s1")],
            vec![delta("a", -12, "s2")],
            vec![delta("c", 1, "s3"), delta("b", 7, "s3")],
        ];

        for batch in &batches {
            ledger.fold(batch);
            for entry in ledger.entries() {
                let sum: i128 = entry.transactions.iter().map(|t| t.amount).sum();
                assert_eq!(entry.total, sum, "entry {} out of balance", entry.address);
            }
        }
    }

    #[test]
    fn test_sorted_by_absolute_total() {
        let deltas = vec![delta("p", 50, "s1"), delta("n", -80, "s2"), delta("q", 10, "s3")];
        let totals: Vec<i128> = Ledger::from_deltas(&deltas)
            .into_sorted_output()
            .iter()
            .map(|e| e.total)
            .collect();
        assert_eq!(totals, vec![-80, 50, 10]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let deltas = vec![
            delta("first", -25, "s1"),
            delta("second", 25, "s2"),
            delta("big", 100, "s3"),
            delta("third", 25, "s4"),
        ];
        let order: Vec<String> = Ledger::from_deltas(&deltas)
            .sorted_output()
            .into_iter()
            .map(|e| e.address)
            .collect();
        assert_eq!(order, vec!["big", "first", "second", "third"]);
    }

    #[test]
    fn test_fold_is_repeatable() {
        let deltas = vec![delta("x", 3, "s1"), delta("y", -3, "s1"), delta("x", 9, "s2")];
        assert_eq!(
            Ledger::from_deltas(&deltas).sorted_output(),
            Ledger::from_deltas(&deltas).sorted_output()
        );
    }
}
