//! Byte progress shared by the slice workers of one attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Progress accumulator safe to increment from many workers at once.
///
/// The atomic counter is the source of truth; the progress bar only mirrors it.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    received: Arc<AtomicU64>,
    bar: indicatif::ProgressBar,
}

impl TransferProgress {
    /// Creates a progress tracker for `total` bytes, drawn on stderr if `visible`.
    pub fn new(total: u64, visible: bool) -> Self {
        let bar = if visible {
            let bar = indicatif::ProgressBar::new(total);
            if let Ok(style) = indicatif::ProgressStyle::default_bar().template(
                "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}) | {elapsed_precise} elapsed, ETA {eta_precise}",
            ) {
                bar.set_style(style.progress_chars("█▓▒░ "));
            }
            bar
        } else {
            indicatif::ProgressBar::hidden()
        };

        Self {
            received: Arc::new(AtomicU64::new(0)),
            bar,
        }
    }

    /// A tracker that draws nothing.
    pub fn hidden() -> Self {
        Self::new(0, false)
    }

    pub fn inc(&self, bytes: u64) {
        self.received.fetch_add(bytes, Ordering::Relaxed);
        self.bar.inc(bytes);
    }

    /// Bytes counted so far, including bytes found on disk when resuming.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn finish_with_message(&self, message: &'static str) {
        self.bar.finish_with_message(message);
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let progress = TransferProgress::hidden();
        let mut tasks = vec![];
        for _ in 0..16 {
            let progress = progress.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..1000 {
                    progress.inc(32);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(progress.received(), 16 * 1000 * 32);
    }
}
