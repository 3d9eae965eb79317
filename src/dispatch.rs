//! Batched parallel dispatch — chunk partitioning and two-level fan-out.
//!
//! The dispatcher splits a target list into contiguous chunks and runs each
//! chunk on its own spawned task (the worker level, true thread parallelism on
//! the multi-threaded runtime, at most `worker_count` chunks in flight). Inside
//! a worker, the chunk function is expected to drive all of its items
//! concurrently on that single task and return one result per item. Results are
//! merged back into a single flat list that preserves submission order at both
//! chunk and item granularity.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// A whole chunk worker failed before producing per-item results.
///
/// Carries the join/panic message so result types can synthesize one failed
/// entry per item of the lost chunk.
#[derive(Clone, Debug)]
pub struct WorkerFailure {
    /// Display text of the underlying task failure
    pub message: String,
}

/// Number of workers to use when the caller does not specify one
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Partition `items` into contiguous chunks of length `n`; the last chunk may
/// be shorter. Concatenating the chunks reproduces the input exactly.
///
/// `n` must be at least one.
pub fn batched<T>(items: Vec<T>, n: usize) -> Vec<Vec<T>> {
    assert!(n >= 1, "chunk size must be at least one");
    let mut chunks = Vec::with_capacity(items.len().div_ceil(n));
    let mut current = Vec::with_capacity(n.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == n {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(n)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Run `chunk_fn` over `items` in parallel batches and merge the results.
///
/// * `chunk_size` defaults to `items.len() / worker_count` (integer division,
///   clamped to at least one).
/// * `worker_count` defaults to [`available_workers`].
///
/// The chunk function receives one chunk and must return exactly one result
/// per item, in the chunk's order. A panic inside a chunk task does not abort
/// the run: the lost chunk is replaced by one `R::from(WorkerFailure)` entry
/// per item, keeping the output aligned with the input.
///
/// The returned list has the same length and order as `items`.
pub async fn run_batched<T, R, C, Fut>(
    items: Vec<T>,
    chunk_fn: C,
    chunk_size: Option<usize>,
    worker_count: Option<usize>,
) -> Vec<R>
where
    T: Send + 'static,
    R: From<WorkerFailure> + Send + 'static,
    C: Fn(Vec<T>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Vec<R>> + Send + 'static,
{
    let total = items.len();
    let worker_count = worker_count.unwrap_or_else(available_workers).max(1);
    let chunk_size = chunk_size.unwrap_or(total / worker_count).max(1);

    let chunk_outcomes: Vec<(usize, Result<Vec<R>, tokio::task::JoinError>)> =
        stream::iter(batched(items, chunk_size))
            .map(|chunk| {
                let chunk_fn = chunk_fn.clone();
                let chunk_len = chunk.len();
                async move {
                    let handle = tokio::spawn(chunk_fn(chunk));
                    (chunk_len, handle.await)
                }
            })
            .buffered(worker_count)
            .collect()
            .await;

    let mut merged = Vec::with_capacity(total);
    for (chunk_len, outcome) in chunk_outcomes {
        match outcome {
            Ok(results) => merged.extend(results),
            Err(join_err) => {
                tracing::error!(
                    chunk_len = chunk_len,
                    error = %join_err,
                    "Chunk worker failed, recording every item of the chunk as failed"
                );
                let failure = WorkerFailure {
                    message: join_err.to_string(),
                };
                merged.extend((0..chunk_len).map(|_| R::from(failure.clone())));
            }
        }
    }
    merged
}
