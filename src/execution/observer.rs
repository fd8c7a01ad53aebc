use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Events emitted by [`super::ExecutionEngine`] while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    RunStarted { rows: usize },
    ThrottleWaited { duration: Duration },
    ChunkStarted { start_row: usize, row_count: usize },
    ChunkFinished { output_rows: usize },
    /// A chunk stopped at `row` (index into the input rows).
    ChunkFailed { row: usize },
    /// A chunk was not started because an earlier row had already failed.
    ChunkSkipped { start_row: usize },
    RunFinished {
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
}

pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Forwards execution events to `tracing`.
///
/// Run boundaries are logged at `debug`, per-chunk events at `trace`.
#[derive(Debug, Default)]
pub struct TracingExecutionObserver;

impl ExecutionObserver for TracingExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::RunStarted { rows } => tracing::debug!(rows, "execution run started"),
            ExecutionEvent::RunFinished { elapsed, metrics } => {
                tracing::debug!(?elapsed, %metrics, "execution run finished")
            }
            ExecutionEvent::ChunkFailed { row } => tracing::debug!(row, "chunk failed"),
            other => tracing::trace!(event = ?other, "execution event"),
        }
    }
}

/// Live counters for the current run of an engine.
///
/// Counters reset at the start of every run; [`ExecutionMetrics::snapshot`] may be called at
/// any time, including from an observer mid-run.
#[derive(Debug, Default)]
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    rows_processed: AtomicU64,
    rows_failed: AtomicU64,
    chunks_started: AtomicU64,
    chunks_finished: AtomicU64,
    chunks_skipped: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_chunks: AtomicUsize,
    max_active_chunks: AtomicUsize,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_run(&self) {
        self.run_id.fetch_add(1, Ordering::SeqCst);
        for counter in [
            &self.elapsed_ns,
            &self.rows_processed,
            &self.rows_failed,
            &self.chunks_started,
            &self.chunks_finished,
            &self.chunks_skipped,
            &self.throttle_wait_ns,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        self.active_chunks.store(0, Ordering::SeqCst);
        self.max_active_chunks.store(0, Ordering::SeqCst);
    }

    pub(crate) fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns.store(saturating_nanos(elapsed), Ordering::SeqCst);
    }

    pub(crate) fn on_row_processed(&self) {
        self.rows_processed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn on_row_failed(&self) {
        self.rows_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn on_chunk_start(&self) {
        self.chunks_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_chunks.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_chunks.fetch_max(now, Ordering::SeqCst);
    }

    pub(crate) fn on_chunk_end(&self) {
        self.chunks_finished.fetch_add(1, Ordering::SeqCst);
        self.active_chunks.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn on_chunk_skipped(&self) {
        self.chunks_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn on_throttle_wait(&self, d: Duration) {
        self.throttle_wait_ns.fetch_add(saturating_nanos(d), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            rows_processed: self.rows_processed.load(Ordering::SeqCst),
            rows_failed: self.rows_failed.load(Ordering::SeqCst),
            chunks_started: self.chunks_started.load(Ordering::SeqCst),
            chunks_finished: self.chunks_finished.load(Ordering::SeqCst),
            chunks_skipped: self.chunks_skipped.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_chunks: self.max_active_chunks.load(Ordering::SeqCst),
        }
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Point-in-time copy of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    /// `None` while the run is still in progress.
    pub elapsed: Option<Duration>,
    pub rows_processed: u64,
    pub rows_failed: u64,
    pub chunks_started: u64,
    pub chunks_finished: u64,
    pub chunks_skipped: u64,
    pub throttle_wait: Duration,
    pub max_active_chunks: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, rows={} (failed {}), chunks={}/{} (skipped {}), max_active_chunks={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.rows_processed,
            self.rows_failed,
            self.chunks_finished,
            self.chunks_started,
            self.chunks_skipped,
            self.max_active_chunks,
            self.throttle_wait,
            self.elapsed
        )
    }
}
