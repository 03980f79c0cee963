use crate::chain::{TransactionDetail, SYSTEM_PROGRAM_ID};
use serde::{Deserialize, Serialize};

/// One signed native balance change of a counterparty within one transaction.
///
/// `amount` is in lamports and relative to the counterparty: positive means
/// the counterparty gained balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub counterparty: String,
    pub amount: i128,
    pub signature: String,
    pub block_time: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorPolicy {
    /// Only accept three-account transactions whose third key is the
    /// System Program (plain native transfers).
    pub simple_transfers_only: bool,
}

impl Default for ExtractorPolicy {
    fn default() -> Self {
        Self {
            simple_transfers_only: true,
        }
    }
}

impl ExtractorPolicy {
    pub fn any_shape() -> Self {
        Self {
            simple_transfers_only: false,
        }
    }

    fn accepts(&self, account_keys: &[String]) -> bool {
        if !self.simple_transfers_only {
            return true;
        }
        account_keys.len() == 3 && account_keys[2] == SYSTEM_PROGRAM_ID
    }
}

/// Derive counterparty balance deltas relative to `owner`.
///
/// Returns `None` when the transaction must be skipped: missing detail,
/// missing metadata, failed transaction, misaligned balance arrays, or a
/// shape outside the policy. `Some(vec![])` means the transaction was usable
/// but moved nothing for any counterparty.
pub fn extract_transfers(
    detail: Option<&TransactionDetail>,
    owner: &str,
    policy: ExtractorPolicy,
) -> Option<Vec<Delta>> {
    let detail = detail?;
    let meta = detail.meta.as_ref()?;

    if meta.failed {
        return None;
    }

    if meta.pre_balances.len() != meta.post_balances.len() {
        log::debug!(
            "Skipping {}: {} pre balances vs {} post balances",
            detail.signature,
            meta.pre_balances.len(),
            meta.post_balances.len()
        );
        return None;
    }

    if !policy.accepts(&detail.account_keys) {
        log::debug!(
            "Skipping {}: not a simple transfer ({} accounts)",
            detail.signature,
            detail.account_keys.len()
        );
        return None;
    }

    let mut deltas: Vec<Delta> = Vec::new();

    for (key, (pre, post)) in detail
        .account_keys
        .iter()
        .zip(meta.pre_balances.iter().zip(meta.post_balances.iter()))
    {
        if key == owner || pre == post {
            continue;
        }

        let amount = (*post as i128) - (*pre as i128);

        match deltas.iter_mut().find(|d| &d.counterparty == key) {
            Some(existing) => existing.amount += amount,
            None => deltas.push(Delta {
                counterparty: key.clone(),
                amount,
                signature: detail.signature.clone(),
                block_time: detail.block_time,
            }),
        }
    }

    deltas.retain(|d| d.amount != 0);

    Some(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::BalanceMeta;

    const OWNER: &str = "Owner111111111111111111111111111111111111111";
    const FRIEND: &str = "Friend11111111111111111111111111111111111111";

    fn transfer(pre: Vec<u64>, post: Vec<u64>, failed: bool) -> TransactionDetail {
        TransactionDetail {
            signature: "sig1".to_string(),
            slot: 1,
            block_time: Some(1_700_000_000),
            account_keys: vec![OWNER.to_string(), FRIEND.to_string(), SYSTEM_PROGRAM_ID.to_string()],
            meta: Some(BalanceMeta {
                pre_balances: pre,
                post_balances: post,
                failed,
            }),
        }
    }

    #[test]
    fn test_counterparty_gain_is_positive() {
        let detail = transfer(vec![10_000, 500, 1], vec![4_000, 6_500, 1], false);
        let deltas = extract_transfers(Some(&detail), OWNER, ExtractorPolicy::default()).unwrap();

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].counterparty, FRIEND);
        assert_eq!(deltas[0].amount, 6_000);
        assert_eq!(deltas[0].signature, "sig1");
        assert_eq!(deltas[0].block_time, Some(1_700_000_000));
    }

    #[test]
    fn test_counterparty_loss_is_negative() {
        let detail = transfer(vec![0, 2_000_000_000, 1], vec![1_999_995_000, 0, 1], false);
        let deltas = extract_transfers(Some(&detail), OWNER, ExtractorPolicy::default()).unwrap();

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].amount, -2_000_000_000);
    }

    #[test]
    fn test_failed_transaction_skipped() {
        let detail = transfer(vec![10_000, 500, 1], vec![4_000, 6_500, 1], true);
        assert!(extract_transfers(Some(&detail), OWNER, ExtractorPolicy::default()).is_none());
    }

    #[test]
    fn test_missing_detail_or_meta_skipped() {
        assert!(extract_transfers(None, OWNER, ExtractorPolicy::default()).is_none());

        let mut detail = transfer(vec![1, 1, 1], vec![1, 1, 1], false);
        detail.meta = None;
        assert!(extract_transfers(Some(&detail), OWNER, ExtractorPolicy::default()).is_none());
    }

    #[test]
    fn test_unchanged_balances_produce_nothing() {
        let detail = transfer(vec![10_000, 500, 1], vec![9_995, 500, 1], false);
        let deltas = extract_transfers(Some(&detail), OWNER, ExtractorPolicy::default()).unwrap();
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_shape_guard() {
        let mut detail = transfer(vec![10, 20, 1, 5], vec![0, 30, 1, 5], false);
        detail.account_keys.push("Extra".to_string());
        assert!(extract_transfers(Some(&detail), OWNER, ExtractorPolicy::default()).is_none());

        let deltas = extract_transfers(Some(&detail), OWNER, ExtractorPolicy::any_shape()).unwrap();
        assert_eq!(deltas.len(), 1);

        let mut program_call = transfer(vec![10, 20, 1], vec![0, 30, 1], false);
        program_call.account_keys[2] = "SomeProgram".to_string();
        assert!(extract_transfers(Some(&program_call), OWNER, ExtractorPolicy::default()).is_none());
    }

    #[test]
    fn test_misaligned_balances_skipped() {
        let detail = transfer(vec![10, 20], vec![0, 30, 1], false);
        assert!(extract_transfers(Some(&detail), OWNER, ExtractorPolicy::default()).is_none());
    }
}
