use std::time::Duration;
use tokio::time::sleep;

/// Retry settings shared by signature pagination and detail fetches.
///
/// Default: fixed 1 second backoff, unbounded retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(1),
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(backoff: Duration) -> Self {
        Self {
            backoff,
            max_retries: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn backoff(&self) -> FixedBackoff {
        FixedBackoff::new(self.backoff, self.max_retries)
    }

    /// "1 second", "2 seconds", "250ms"
    pub fn describe_delay(&self) -> String {
        let millis = self.backoff.as_millis();
        if millis % 1000 != 0 {
            return format!("{}ms", millis);
        }
        match millis / 1000 {
            1 => "1 second".to_string(),
            secs => format!("{} seconds", secs),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Maximum retry attempts exceeded")]
pub struct MaxRetriesExceeded;

/// Per-operation backoff state. One instance per retried request.
#[derive(Debug)]
pub struct FixedBackoff {
    delay: Duration,
    max_retries: Option<u32>,
    current_attempt: u32,
}

impl FixedBackoff {
    pub fn new(delay: Duration, max_retries: Option<u32>) -> Self {
        Self {
            delay,
            max_retries,
            current_attempt: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.current_attempt
    }

    pub async fn sleep(&mut self) -> Result<(), MaxRetriesExceeded> {
        if let Some(max) = self.max_retries {
            if self.current_attempt >= max {
                return Err(MaxRetriesExceeded);
            }
        }

        log::warn!(
            "⏳ Retry attempt {} in {:?}",
            self.current_attempt + 1,
            self.delay
        );

        sleep(self.delay).await;
        self.current_attempt += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}
