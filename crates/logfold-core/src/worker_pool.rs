//! Static-partition scoped worker pool.
//!
//! Work is split into contiguous chunks up front, one scoped thread per
//! chunk, and results are collected only after every worker has joined.
//! Workers borrow their inputs read-only; nothing they do is visible to the
//! caller until the join. A panicking worker aborts the whole call with
//! [`Error::WorkerPanicked`].

use std::any::Any;

use crossbeam::thread;
use tracing::trace;

use crate::corpus::split_evenly;
use crate::error::{Error, Result};

/// `requested` workers, or the machine's parallelism when 0.
#[must_use]
pub fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        requested
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Run `work` once per chunk of `items` and return the per-chunk results in
/// chunk order. Empty chunks are skipped.
pub fn map_chunks<T, R, F>(items: &[T], workers: usize, work: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&[T]) -> R + Sync,
{
    let workers = resolve_workers(workers).min(items.len()).max(1);
    if workers == 1 {
        return Ok(vec![work(items)]);
    }

    let chunks = split_evenly(items, workers);
    let work = &work;
    let joined = thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .into_iter()
            .filter(|chunk| !chunk.is_empty())
            .enumerate()
            .map(|(worker, chunk)| {
                scope.spawn(move |_| {
                    trace!(worker, items = chunk.len(), "Worker started");
                    work(chunk)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    })
    .map_err(|payload| Error::WorkerPanicked(panic_message(payload.as_ref())))?;

    joined
        .into_iter()
        .map(|result| result.map_err(|payload| Error::WorkerPanicked(panic_message(payload.as_ref()))))
        .collect()
}

/// Apply `work` to every item in parallel, preserving input order.
pub fn map_each<T, R, F>(items: &[T], workers: usize, work: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let per_chunk = map_chunks(items, workers, |chunk| {
        chunk.iter().map(&work).collect::<Vec<R>>()
    })?;
    Ok(per_chunk.into_iter().flatten().collect())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
