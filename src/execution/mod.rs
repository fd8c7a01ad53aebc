//! Chunked parallel execution over in-memory datasets.
//!
//! The engine splits a [`DataSet`] into row chunks, runs them on a dedicated rayon pool and
//! caps the number of chunks in flight with a counting semaphore. Progress is visible through
//! [`ExecutionMetrics`] and an optional [`ExecutionObserver`].
//!
//! ```
//! use timestamp_ingest::execution::{ExecutionEngine, ExecutionOptions};
//! use timestamp_ingest::normalize::DateTimeNormalizer;
//! use timestamp_ingest::types::{DataSet, DataType, Field, Schema, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ds = DataSet::new(
//!     Schema::new(vec![Field::new("listed_at", DataType::Utf8)]),
//!     vec![vec![Value::Utf8("18 9 2018".into())], vec![Value::Null]],
//! );
//! let engine = ExecutionEngine::new(ExecutionOptions::default())?;
//! let normalizer = DateTimeNormalizer::with_formats(["%d %m %Y"]);
//!
//! let out = engine.normalize_column(&ds, "listed_at", &normalizer)?;
//! assert_eq!(out.schema.fields[0].data_type, DataType::Timestamp);
//! assert_eq!(out.rows[1][0], Value::Null);
//! # Ok(())
//! # }
//! ```

mod observer;
mod semaphore;

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::error::{IngestionError, IngestionResult};
use crate::normalize::DateTimeNormalizer;
use crate::types::{DataSet, Field, Schema, Value};

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, TracingExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Worker threads. `None` uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Rows per chunk.
    pub chunk_size: usize,
    /// Upper bound on concurrently executing chunks, on top of `num_threads`.
    pub max_in_flight_chunks: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = available_parallelism();
        Self {
            num_threads: Some(n),
            chunk_size: 4_096,
            max_in_flight_chunks: n,
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Runs row-wise work over a [`DataSet`] on a dedicated rayon pool.
///
/// Rows are split into chunks of `chunk_size`; at most `max_in_flight_chunks` run at once.
/// Events go to the optional observer and are counted in [`ExecutionMetrics`].
pub struct ExecutionEngine {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl ExecutionEngine {
    /// Create an engine with its own thread pool.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size == 0`, `max_in_flight_chunks == 0`, or `num_threads == Some(0)`.
    pub fn new(opts: ExecutionOptions) -> Result<Self, ThreadPoolBuildError> {
        assert!(opts.chunk_size > 0, "chunk_size must be > 0");
        assert!(opts.max_in_flight_chunks > 0, "max_in_flight_chunks must be > 0");
        if let Some(n) = opts.num_threads {
            assert!(n > 0, "num_threads must be > 0 when set");
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(opts.num_threads.unwrap_or_else(available_parallelism))
            .thread_name(|i| format!("ingest-exec-{i}"))
            .build()?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Report run and chunk events to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Handle to the live metrics of this engine.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Normalize every non-null cell of `column` with `normalizer`.
    ///
    /// Returns a new dataset in which `column` has type [`crate::types::DataType::Timestamp`] and is bound to
    /// `normalizer`; other columns are copied unchanged. Nulls stay null.
    ///
    /// If any cell fails, the error for the lowest failing row is returned as
    /// [`IngestionError::ParseError`], where `row` is the index into `dataset.rows`.
    pub fn normalize_column(
        &self,
        dataset: &DataSet,
        column: &str,
        normalizer: &DateTimeNormalizer,
    ) -> IngestionResult<DataSet> {
        let idx = dataset
            .schema
            .index_of(column)
            .ok_or_else(|| IngestionError::SchemaMismatch {
                message: format!("unknown column '{column}'"),
            })?;

        let mut fields = dataset.schema.fields.clone();
        fields[idx] = Field::timestamp(column, normalizer.clone());

        self.try_map_parallel(dataset, Schema::new(fields), |row_idx, row| {
            let cell = row.get(idx).ok_or_else(|| IngestionError::SchemaMismatch {
                message: format!("row {row_idx} has {} values, column '{column}' is at index {idx}", row.len()),
            })?;
            let mut out = row.to_vec();
            if matches!(cell, Value::Null) {
                return Ok(out);
            }
            out[idx] = normalizer
                .normalize(cell)
                .map(Value::Timestamp)
                .map_err(|e| IngestionError::ParseError {
                    row: row_idx,
                    column: column.to_string(),
                    raw: match cell {
                        Value::Utf8(s) => s.clone(),
                        other => other.to_string(),
                    },
                    message: e.to_string(),
                })?;
            Ok(out)
        })
    }

    /// Map every row through a fallible `mapper`, in parallel chunks.
    ///
    /// `mapper` receives the row index and the row. Output rows keep input order and are
    /// validated against `schema`'s field count. On failure the error from the lowest failing
    /// row wins; chunks that start after an already-known failure are skipped.
    pub fn try_map_parallel<F>(&self, dataset: &DataSet, schema: Schema, mapper: F) -> IngestionResult<DataSet>
    where
        F: Fn(usize, &[Value]) -> IngestionResult<Vec<Value>> + Send + Sync,
    {
        self.pool.install(|| self.try_map_impl(dataset, schema, &mapper))
    }

    fn try_map_impl(
        &self,
        dataset: &DataSet,
        schema: Schema,
        mapper: &(dyn Fn(usize, &[Value]) -> IngestionResult<Vec<Value>> + Send + Sync),
    ) -> IngestionResult<DataSet> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted {
            rows: dataset.row_count(),
        });

        let expected_len = schema.fields.len();
        let sem = Semaphore::new(self.opts.max_in_flight_chunks);
        let first_failure = AtomicUsize::new(usize::MAX);

        let per_chunk: Vec<IngestionResult<Vec<Vec<Value>>>> = chunk_ranges(dataset.row_count(), self.opts.chunk_size)
            .into_par_iter()
            .map(|range| {
                if range.start > first_failure.load(Ordering::SeqCst) {
                    self.metrics.on_chunk_skipped();
                    self.emit(ExecutionEvent::ChunkSkipped { start_row: range.start });
                    return Ok(Vec::new());
                }

                let (_permit, waited) = sem.permit();
                if waited > Duration::ZERO {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(ExecutionEvent::ThrottleWaited { duration: waited });
                }

                self.metrics.on_chunk_start();
                self.emit(ExecutionEvent::ChunkStarted {
                    start_row: range.start,
                    row_count: range.len(),
                });

                let result = self.run_chunk(dataset, range, expected_len, mapper);
                match &result {
                    Ok(out) => self.emit(ExecutionEvent::ChunkFinished { output_rows: out.len() }),
                    Err((row, _)) => {
                        first_failure.fetch_min(*row, Ordering::SeqCst);
                        self.metrics.on_row_failed();
                        self.emit(ExecutionEvent::ChunkFailed { row: *row });
                    }
                }
                self.metrics.on_chunk_end();
                result.map_err(|(_, e)| e)
            })
            .collect();

        // Chunks are in row order, so the first error is the lowest failing row.
        let outcome = per_chunk
            .into_iter()
            .collect::<IngestionResult<Vec<_>>>()
            .map(|chunks| DataSet::new(schema, chunks.into_iter().flatten().collect()));

        self.metrics.end_run(start.elapsed());
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        outcome
    }

    fn run_chunk(
        &self,
        dataset: &DataSet,
        range: Range<usize>,
        expected_len: usize,
        mapper: &(dyn Fn(usize, &[Value]) -> IngestionResult<Vec<Value>> + Send + Sync),
    ) -> Result<Vec<Vec<Value>>, (usize, IngestionError)> {
        let mut out = Vec::with_capacity(range.len());
        for (row_idx, row) in range.clone().zip(&dataset.rows[range]) {
            self.metrics.on_row_processed();
            let mapped = mapper(row_idx, row).map_err(|e| (row_idx, e))?;
            if mapped.len() != expected_len {
                return Err((
                    row_idx,
                    IngestionError::SchemaMismatch {
                        message: format!(
                            "mapped row {row_idx} has {} values, schema has {expected_len} fields",
                            mapped.len()
                        ),
                    },
                ));
            }
            out.push(mapped);
        }
        Ok(out)
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn chunk_ranges(row_count: usize, chunk_size: usize) -> Vec<Range<usize>> {
    (0..row_count)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(row_count))
        .collect()
}
