//! # Parallel — Thread Partitioning Over Long Intervals
//!
//! Carves [start, stop] into chunks aligned to 30·sieve_bytes and runs one
//! independent [`SegmentSieve`] per chunk on a rayon pool — each worker owns
//! its pre-sieve buffer, memory pool and byte array, so the fork-join here
//! is the only synchronisation point. Counting reduces by summation; the
//! callback variant hands `(prime, thread_index)` to the caller with no
//! mutual exclusion, leaving per-thread accumulation and the final
//! reduction to user code.
//!
//! Cancellation is cooperative and coarse-grained: workers poll a shared
//! flag between segments and stop after the segment in flight, so a
//! cancelled count is a valid partial result over a prefix of each chunk.
//!
//! k-tuplet counting stays on the single-driver path: the twin pair
//! (29, 31) straddles chunk boundaries under this byte encoding.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::sieve::{CountConsumer, FnConsumer, SegmentSieve};
use crate::{count_small_primes, resolve_sieve_bytes};

/// Cooperative cancellation for the parallel drivers; checked between
/// segments only, never inside a cross-off loop.
#[derive(Default)]
pub struct CancelFlag {
    flag: AtomicBool,
}

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub(crate) fn as_atomic(&self) -> &AtomicBool {
        &self.flag
    }
}

/// Splits [start, stop] into at most `threads` disjoint chunks whose inner
/// boundaries are multiples of 30·sieve_bytes.
fn partition(start: u64, stop: u64, threads: usize, align: u64) -> Vec<(u64, u64)> {
    let total = (stop - start) as u128 + 1;
    let raw = total.div_ceil(threads.max(1) as u128) as u64;
    let chunk = raw.div_ceil(align).max(1).saturating_mul(align);

    let mut chunks = Vec::new();
    let mut low = start;
    loop {
        let high = match low.checked_add(chunk - 1) {
            Some(h) => h.min(stop),
            None => stop,
        };
        chunks.push((low, high));
        if high >= stop {
            return chunks;
        }
        low = high + 1;
    }
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Resource(format!("thread pool: {}", e)))
}

/// Number of primes in [start, stop], computed on `threads` workers
/// (0 = the configured default).
pub fn parallel_count_primes(start: u64, stop: u64, threads: usize) -> Result<u64> {
    let (count, _) = parallel_count_impl(start, stop, threads, None)?;
    Ok(count)
}

/// Like [`parallel_count_primes`] but cancellable: returns the partial
/// count and whether the run was cancelled.
pub fn parallel_count_primes_cancellable(
    start: u64,
    stop: u64,
    threads: usize,
    cancel: &CancelFlag,
) -> Result<(u64, bool)> {
    parallel_count_impl(start, stop, threads, Some(cancel))
}

fn parallel_count_impl(
    start: u64,
    stop: u64,
    threads: usize,
    cancel: Option<&CancelFlag>,
) -> Result<(u64, bool)> {
    if start > stop {
        return Err(Error::OutOfRange(format!("start {} > stop {}", start, stop)));
    }
    let threads = if threads == 0 { crate::num_threads() } else { threads };
    let sieve_bytes = resolve_sieve_bytes(start, stop);
    let chunks = partition(start, stop, threads, 30 * sieve_bytes as u64);

    if threads <= 1 || chunks.len() <= 1 {
        let mut consumer = CountConsumer::default();
        let mut sieve = SegmentSieve::with_sieve_bytes(start, stop, sieve_bytes)?;
        let cancelled = sieve.run(&mut consumer, cancel.map(CancelFlag::as_atomic))?;
        return Ok((count_small_primes(start, stop) + consumer.count, cancelled));
    }

    let pool = build_pool(threads.min(chunks.len()))?;
    let results: Result<Vec<(u64, bool)>> = pool.install(|| {
        chunks
            .par_iter()
            .map(|&(low, high)| {
                let mut consumer = CountConsumer::default();
                let mut sieve = SegmentSieve::with_sieve_bytes(low, high, sieve_bytes)?;
                let cancelled = sieve.run(&mut consumer, cancel.map(CancelFlag::as_atomic))?;
                Ok((count_small_primes(low, high) + consumer.count, cancelled))
            })
            .collect()
    });
    let results = results?;
    let count = results.iter().map(|(c, _)| c).sum();
    let cancelled = results.iter().any(|&(_, c)| c);
    Ok((count, cancelled))
}

/// Calls `f(prime, thread_index)` for every prime in [start, stop], in
/// ascending order *within* each chunk but with no cross-chunk ordering.
/// `f` runs concurrently on the pool's workers with no mutual exclusion:
/// accumulate per thread and reduce after this returns.
pub fn parallel_each_prime<F>(start: u64, stop: u64, threads: usize, f: F) -> Result<()>
where
    F: Fn(u64, usize) + Sync,
{
    if start > stop {
        return Err(Error::OutOfRange(format!("start {} > stop {}", start, stop)));
    }
    let threads = if threads == 0 { crate::num_threads() } else { threads };
    let sieve_bytes = resolve_sieve_bytes(start, stop);
    let chunks = partition(start, stop, threads, 30 * sieve_bytes as u64);

    let pool = build_pool(threads.min(chunks.len()))?;
    pool.install(|| {
        chunks
            .par_iter()
            .map(|&(low, high)| {
                let thread_idx = rayon::current_thread_index().unwrap_or(0);
                for p in [2u64, 3, 5] {
                    if p >= low && p <= high {
                        f(p, thread_idx);
                    }
                }
                let mut consumer = FnConsumer {
                    f: |p| {
                        f(p, thread_idx);
                        Ok(())
                    },
                };
                SegmentSieve::with_sieve_bytes(low, high, sieve_bytes)?.run(&mut consumer, None)?;
                Ok(())
            })
            .collect::<Result<Vec<()>>>()
    })?;
    Ok(())
}

/// Chunk-ordered parallel enumeration: sieves chunks concurrently and
/// returns the primes of each chunk in interval order, so flattening
/// preserves the global ascending order. Used by the printing path.
pub fn parallel_collect_chunks(start: u64, stop: u64, threads: usize) -> Result<Vec<Vec<u64>>> {
    if start > stop {
        return Err(Error::OutOfRange(format!("start {} > stop {}", start, stop)));
    }
    let threads = if threads == 0 { crate::num_threads() } else { threads };
    let sieve_bytes = resolve_sieve_bytes(start, stop);
    let chunks = partition(start, stop, threads, 30 * sieve_bytes as u64);

    let pool = build_pool(threads.min(chunks.len()))?;
    pool.install(|| {
        chunks
            .par_iter()
            .map(|&(low, high)| {
                let mut primes = Vec::new();
                crate::collect_primes(low, high, &mut primes)?;
                Ok(primes)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn partition_is_disjoint_and_exhaustive() {
        for (start, stop, threads) in
            [(0u64, 1_000_000u64, 4usize), (17, 23, 8), (0, 29, 3), (5, 5, 2), (0, u64::MAX, 4)]
        {
            let chunks = partition(start, stop, threads, 480);
            assert_eq!(chunks.first().unwrap().0, start);
            assert_eq!(chunks.last().unwrap().1, stop);
            for pair in chunks.windows(2) {
                assert_eq!(pair[0].1 + 1, pair[1].0);
                // Inner boundaries sit at multiples of the alignment
                assert_eq!((pair[1].0 - start) % 480, 0);
            }
            assert!(chunks.len() <= threads.max(1) + 1);
        }
    }

    #[test]
    fn parallel_count_matches_sequential() {
        let sequential = crate::count_primes(0, 2_000_000).unwrap();
        for threads in [1, 2, 4, 7] {
            assert_eq!(
                parallel_count_primes(0, 2_000_000, threads).unwrap(),
                sequential,
                "{} threads",
                threads
            );
        }
    }

    #[test]
    fn parallel_count_offset_range() {
        let a = crate::count_primes(999_000, 1_200_000).unwrap();
        assert_eq!(parallel_count_primes(999_000, 1_200_000, 3).unwrap(), a);
    }

    #[test]
    fn cancelled_run_reports_partial_count() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let (count, cancelled) =
            parallel_count_primes_cancellable(0, 50_000_000, 2, &cancel).unwrap();
        assert!(cancelled);
        // Each worker finished at most its first segment
        assert!(count < crate::count_primes(0, 50_000_000).unwrap());
    }

    #[test]
    fn callback_sees_every_prime_exactly_once() {
        let mut reference = Vec::new();
        crate::collect_primes(0, 100_000, &mut reference).unwrap();

        let total = AtomicU64::new(0);
        let count = AtomicU64::new(0);
        parallel_each_prime(0, 100_000, 4, |p, _thread| {
            total.fetch_add(p, Ordering::Relaxed);
            count.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 9592);
        assert_eq!(total.load(Ordering::Relaxed), reference.iter().sum::<u64>());
    }

    #[test]
    fn chunk_collection_preserves_global_order() {
        let chunks = parallel_collect_chunks(0, 300_000, 4).unwrap();
        let flat: Vec<u64> = chunks.into_iter().flatten().collect();
        let mut reference = Vec::new();
        crate::collect_primes(0, 300_000, &mut reference).unwrap();
        assert_eq!(flat, reference);
    }
}
