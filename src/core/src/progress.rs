//! Transfer progress tracking.
//!
//! A transfer owns its [`TransferState`] and pushes snapshots to a
//! [`ProgressSink`]. Sinks are purely observational: they cannot fail the
//! transfer, and [`ProgressSession`] guarantees `stop` runs exactly once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Byte counters for one upload or download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferState {
    pub total_bytes: u64,
    pub transferred_bytes: u64,
}

impl TransferState {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            transferred_bytes: 0,
        }
    }

    /// Record `n` more bytes. Saturates instead of wrapping.
    pub fn advance(&mut self, n: u64) {
        self.transferred_bytes = self.transferred_bytes.saturating_add(n);
    }

    /// Completion in whole percent, capped at 100. Unknown totals report 0.
    pub fn percent(&self) -> u64 {
        if self.total_bytes == 0 {
            return 0;
        }
        (self.transferred_bytes.saturating_mul(100) / self.total_bytes).min(100)
    }

    pub fn is_complete(&self) -> bool {
        self.total_bytes > 0 && self.transferred_bytes >= self.total_bytes
    }
}

/// Receives progress notifications.
///
/// Implementations must not block and must swallow their own failures.
pub trait ProgressSink: Send + Sync {
    fn start(&self, total: u64);
    fn update(&self, current: u64);
    fn stop(&self);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: u64) {}
    fn update(&self, _current: u64) {}
    fn stop(&self) {}
}

/// Shared handle to a sink.
pub type SharedProgress = Arc<dyn ProgressSink>;

/// Convert bytes to megabytes rounded to two decimals.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Ticks of the elapsed-time indicator, each advancing it by a tenth.
const TICK: Duration = Duration::from_millis(100);

/// Await `fut` while driving `sink` as a time-based indicator out of 100.
///
/// Used while the total size is still unknown (waiting for the server to
/// answer). The indicator is stopped before the output is returned.
pub async fn track_elapsed<F: Future>(sink: SharedProgress, fut: F) -> F::Output {
    let session = ProgressSession::start(sink, 100);
    let mut ticks = tokio::time::interval(TICK);
    ticks.tick().await;
    let mut state = TransferState::new(100);

    tokio::pin!(fut);
    let output = loop {
        tokio::select! {
            out = &mut fut => break out,
            _ = ticks.tick() => {
                if state.transferred_bytes < 100 {
                    state.advance(10);
                    session.update(&state);
                }
            }
        }
    };
    session.finish();
    output
}

/// A started progress display that is stopped exactly once.
///
/// Stops on [`finish`](Self::finish) or on drop, whichever comes first.
pub struct ProgressSession {
    sink: SharedProgress,
    stopped: bool,
}

impl ProgressSession {
    pub fn start(sink: SharedProgress, total: u64) -> Self {
        sink.start(total);
        Self {
            sink,
            stopped: false,
        }
    }

    pub fn update(&self, state: &TransferState) {
        if !self.stopped {
            self.sink.update(state.transferred_bytes);
        }
    }

    pub fn sink(&self) -> SharedProgress {
        Arc::clone(&self.sink)
    }

    pub fn finish(mut self) {
        self.stop_once();
    }

    fn stop_once(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.sink.stop();
        }
    }
}

impl Drop for ProgressSession {
    fn drop(&mut self) {
        self.stop_once();
    }
}
