use super::progress::ProgressSink;
use super::retry::RetryPolicy;
use crate::chain::ChainClient;
use solana_pubkey::Pubkey;
use tokio_util::sync::CancellationToken;

/// Walk the full signature history of `address`, newest first.
///
/// Pages are requested one at a time with the last signature of the previous
/// page as the `before` cursor. An empty page ends the walk. Failed page
/// requests are retried with the same cursor after the policy's backoff.
///
/// Cancellation is checked at the top of every iteration and again when a
/// page arrives; a page that resolves after cancellation is dropped. The
/// partial list returned on cancellation is meant to be discarded.
pub async fn collect_signatures<C>(
    client: &C,
    address: &Pubkey,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Vec<String>
where
    C: ChainClient + ?Sized,
{
    let mut signatures: Vec<String> = Vec::new();
    let mut before: Option<String> = None;
    let mut backoff = retry.backoff();

    loop {
        if cancel.is_cancelled() {
            log::debug!("Signature collection cancelled after {} signatures", signatures.len());
            return signatures;
        }

        match client.signatures_before(address, before.as_deref()).await {
            Ok(page) => {
                if cancel.is_cancelled() {
                    log::debug!("Dropping page of {} signatures received after cancel", page.len());
                    return signatures;
                }

                backoff.reset();

                if page.is_empty() {
                    progress.emit(format!("Finished collecting {} signatures.", signatures.len()));
                    break;
                }

                before = page.last().cloned();
                signatures.extend(page);

                progress.emit(format!("Collected {} signatures...", signatures.len()));
            }
            Err(e) => {
                log::warn!("❌ Signature page request failed (before={:?}): {}", before, e);
                progress.emit(format!(
                    "Failed to collect signatures, retrying in {}...",
                    retry.describe_delay()
                ));

                if backoff.sleep().await.is_err() {
                    log::error!(
                        "Giving up on signature pagination after {} attempts, keeping {} signatures",
                        backoff.attempts(),
                        signatures.len()
                    );
                    break;
                }
            }
        }
    }

    signatures
}
