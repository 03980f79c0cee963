//! Progress side channel
//!
//! Progress is a single current-status string that each update overwrites.
//! The controller publishes it on a `watch` channel. Consumers that need the
//! full history (tests, log capture) implement `ProgressSink` themselves.

use std::sync::Mutex;
use tokio::sync::watch;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, message: String);
}

impl ProgressSink for watch::Sender<String> {
    fn emit(&self, message: String) {
        log::info!("{}", message);
        self.send_replace(message);
    }
}

/// Discards everything except the log line.
pub struct LogOnly;

impl ProgressSink for LogOnly {
    fn emit(&self, message: String) {
        log::info!("{}", message);
    }
}

/// Keeps every emitted message in order.
#[derive(Default)]
pub struct ProgressHistory {
    messages: Mutex<Vec<String>>,
}

impl ProgressHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages().iter().filter(|m| m.contains(needle)).count()
    }
}

impl ProgressSink for ProgressHistory {
    fn emit(&self, message: String) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_sink_overwrites() {
        let (tx, rx) = watch::channel(String::new());
        tx.emit("Collected 1 signatures...".to_string());
        tx.emit("Collected 2 signatures...".to_string());
        assert_eq!(*rx.borrow(), "Collected 2 signatures...");
    }

    #[test]
    fn test_history_keeps_order() {
        let history = ProgressHistory::new();
        history.emit("Collecting transaction 1 of 2...".to_string());
        history.emit("Collecting transaction 2 of 2...".to_string());

        assert_eq!(
            history.messages(),
            vec!["Collecting transaction 1 of 2...", "Collecting transaction 2 of 2..."]
        );
        assert_eq!(history.count_containing("of 2"), 2);
    }
}
