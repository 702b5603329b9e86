//! # Primespan — Core Library
//!
//! Generates the prime numbers and prime k-tuplets in an arbitrary interval
//! [start, stop] of u64, using a segmented sieve of Eratosthenes with
//! wheel-30 factorisation, a pre-sieved buffer of small-prime multiples, a
//! bucket memory pool for the large sieving primes, and rayon fork-join
//! over aligned sub-intervals for long ranges.
//!
//! ## Module Organization
//!
//! **Engine modules** (the single-segment sieving machinery):
//! - [`wheel`] — compile-time wheel-30 tables and the cross-off primitive
//! - [`presieve`] — pre-sieved buffer replicated into each fresh segment
//! - [`memory_pool`] — fixed-capacity buckets of sieving primes
//! - [`erat_small`], [`erat_medium`], [`erat_big`] — the three cross-off
//!   classifiers (many multiples per segment / a few / at most one per
//!   many segments)
//! - [`sieving_primes`] — recursive generation of the primes ≤ √stop
//! - [`sieve`] — the segment driver tying the above together
//!
//! **Operation modules** (what callers reach for):
//! - [`tuplets`] — twin/triplet/…/sextuplet counting and enumeration
//! - [`iterator`] — forward/backward stateful prime iterator
//! - [`nth_prime`] — nth-prime search via a count-and-correct oracle loop
//! - [`parallel`] — thread partitioning, cancellation, per-thread callbacks
//!
//! ## Shared Utilities
//!
//! - [`isqrt`]: exact integer square root (f64 seed, integer correction).
//! - [`max_prime_gap`]: ln²(n) upper bound on the prime gap at n.
//! - Process-wide configuration: [`set_sieve_size_kib`] / [`set_num_threads`]
//!   with init-at-first-use defaults (L1/L2 data cache geometry, hardware
//!   concurrency).
//!
//! ## Design
//!
//! All operations run the same pipeline: **pre-sieve copy → cross-off →
//! mask → consume**, single-threaded per driver; the parallel driver is the
//! only fork-join point and workers share nothing but a cancellation flag.
//! The integers 2, 3, 5 are below the wheel and handled from fixed tables
//! at this layer.

pub mod erat_big;
pub mod erat_medium;
pub mod erat_small;
pub mod error;
pub mod iterator;
pub mod memory_pool;
pub mod nth_prime;
pub mod parallel;
pub mod presieve;
pub mod sieve;
pub mod sieving_primes;
pub mod tuplets;
pub mod wheel;

use std::sync::atomic::{AtomicUsize, Ordering};

pub use error::{Error, Result};
pub use iterator::PrimeIter;
pub use nth_prime::nth_prime;
pub use parallel::{
    parallel_count_primes, parallel_count_primes_cancellable, parallel_each_prime, CancelFlag,
};

use sieve::{CountConsumer, FnConsumer, SegmentSieve};
use tuplets::TupletCounter;

/// The largest 64-bit prime; the iterator and nth-prime search fail with
/// [`Error::OutOfRange`] when asked to move beyond it.
pub const LARGEST_U64_PRIME: u64 = 18_446_744_073_709_551_557;

/// Exact integer square root.
pub fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = (n as f64).sqrt() as u64;
    while x.checked_mul(x).map_or(true, |sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).is_some_and(|sq| sq <= n) {
        x += 1;
    }
    x
}

/// Upper bound on the gap to the next prime at n: ln²(n). The largest known
/// gap below 2^64 is 1550; ln²(2^64) ≈ 1968.
pub fn max_prime_gap(n: u64) -> u64 {
    let x = n.max(4) as f64;
    let log = x.ln();
    (log * log).ceil() as u64
}

// ── Process-wide configuration ──────────────────────────────────

/// 0 = resolve from cache geometry at first use.
static SIEVE_SIZE_KIB: AtomicUsize = AtomicUsize::new(0);
/// 0 = hardware concurrency at first use.
static NUM_THREADS: AtomicUsize = AtomicUsize::new(0);

/// Sets the sieve segment size. Clamped to [16, 8192] KiB and rounded up to
/// a power of two; 0 restores the automatic cache-sized default.
pub fn set_sieve_size_kib(kib: usize) {
    let kib = if kib == 0 { 0 } else { kib.clamp(16, 8192).next_power_of_two().min(8192) };
    SIEVE_SIZE_KIB.store(kib, Ordering::Relaxed);
}

/// The configured sieve size, or the L1-data-cache default.
pub fn sieve_size_kib() -> usize {
    let kib = SIEVE_SIZE_KIB.load(Ordering::Relaxed);
    if kib != 0 {
        return kib;
    }
    let l1 = cache_size::l1_cache_size().unwrap_or(32 * 1024);
    (l1 / 1024).clamp(16, 8192).next_power_of_two().min(8192)
}

/// Sets the worker-thread count for the parallel driver. Clamped to
/// [1, hardware concurrency]; 0 restores the default.
pub fn set_num_threads(threads: usize) {
    let threads = if threads == 0 { 0 } else { threads.clamp(1, hardware_concurrency()) };
    NUM_THREADS.store(threads, Ordering::Relaxed);
}

/// The configured thread count, or the hardware concurrency.
pub fn num_threads() -> usize {
    match NUM_THREADS.load(Ordering::Relaxed) {
        0 => hardware_concurrency(),
        n => n,
    }
}

fn hardware_concurrency() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Segment byte size for a driver over [start, stop]: the configured value,
/// else √stop/30 clamped between the L1 and L2 data cache sizes — short
/// intervals stay L1-resident, long intervals trade cache locality for
/// fewer bucket moves in EratBig.
pub(crate) fn resolve_sieve_bytes(_start: u64, stop: u64) -> usize {
    let kib = SIEVE_SIZE_KIB.load(Ordering::Relaxed);
    if kib != 0 {
        return kib * 1024;
    }
    let l1 = cache_size::l1_cache_size().unwrap_or(32 * 1024);
    let l2 = cache_size::l2_cache_size().unwrap_or(512 * 1024);
    let l2 = l2.max(l1);
    let bytes = ((isqrt(stop) / 30) as usize).clamp(l1, l2);
    bytes
        .next_power_of_two()
        .clamp(16 * 1024, 8192 * 1024)
}

// ── Counting and generation ─────────────────────────────────────

fn validate_range(start: u64, stop: u64) -> Result<()> {
    if start > stop {
        return Err(Error::OutOfRange(format!("start {} > stop {}", start, stop)));
    }
    Ok(())
}

pub(crate) fn count_small_primes(start: u64, stop: u64) -> u64 {
    [2u64, 3, 5].iter().filter(|&&p| p >= start && p <= stop).count() as u64
}

/// Count over a possibly-empty range; tolerates start > stop (0) for the
/// nth-prime correction loop.
pub(crate) fn count_range(start: u64, stop: u64) -> Result<u64> {
    if start > stop {
        return Ok(0);
    }
    let mut count = count_small_primes(start, stop);
    if stop >= 7 {
        let mut consumer = CountConsumer::default();
        SegmentSieve::new(start, stop)?.run(&mut consumer, None)?;
        count += consumer.count;
    }
    Ok(count)
}

/// Collects all primes in [start, stop] (2, 3, 5 included) into `out`.
pub(crate) fn collect_primes(start: u64, stop: u64, out: &mut Vec<u64>) -> Result<()> {
    for p in [2u64, 3, 5] {
        if p >= start && p <= stop {
            out.push(p);
        }
    }
    if stop >= 7 {
        let mut consumer = FnConsumer {
            f: |p| {
                out.push(p);
                Ok(())
            },
        };
        SegmentSieve::new(start, stop)?.run(&mut consumer, None)?;
    }
    Ok(())
}

/// Number of primes in [start, stop].
pub fn count_primes(start: u64, stop: u64) -> Result<u64> {
    validate_range(start, stop)?;
    count_range(start, stop)
}

fn count_k_tuplets(k: usize, start: u64, stop: u64) -> Result<u64> {
    validate_range(start, stop)?;
    let mut count = tuplets::count_small_tuplets(k, start, stop);
    if stop >= 7 {
        let mut counter = TupletCounter::new(k);
        SegmentSieve::new(start, stop)?.run(&mut counter, None)?;
        count += counter.count;
    }
    Ok(count)
}

/// Number of twin prime pairs (p, p+2) with p in [start, stop].
pub fn count_twins(start: u64, stop: u64) -> Result<u64> {
    count_k_tuplets(2, start, stop)
}

/// Number of prime triplets starting in [start, stop].
pub fn count_triplets(start: u64, stop: u64) -> Result<u64> {
    count_k_tuplets(3, start, stop)
}

/// Number of prime quadruplets starting in [start, stop].
pub fn count_quadruplets(start: u64, stop: u64) -> Result<u64> {
    count_k_tuplets(4, start, stop)
}

/// Number of prime quintuplets starting in [start, stop].
pub fn count_quintuplets(start: u64, stop: u64) -> Result<u64> {
    count_k_tuplets(5, start, stop)
}

/// Number of prime sextuplets starting in [start, stop].
pub fn count_sextuplets(start: u64, stop: u64) -> Result<u64> {
    count_k_tuplets(6, start, stop)
}

/// Output integer types for [`generate_primes`] / [`generate_n_primes`].
/// A prime that does not fit the type surfaces as [`Error::Overflow`].
pub trait PrimeInt: Copy {
    const TYPE_NAME: &'static str;
    fn from_prime(prime: u64) -> Option<Self>;
}

macro_rules! impl_prime_int {
    ($($t:ty),*) => {
        $(impl PrimeInt for $t {
            const TYPE_NAME: &'static str = stringify!($t);
            #[inline]
            fn from_prime(prime: u64) -> Option<Self> {
                <$t>::try_from(prime).ok()
            }
        })*
    };
}

impl_prime_int!(i16, u16, i32, u32, i64, u64);

/// Appends every prime in [start, stop] to `primes`, in ascending order.
/// On error nothing is appended.
pub fn generate_primes<T: PrimeInt>(start: u64, stop: u64, primes: &mut Vec<T>) -> Result<()> {
    validate_range(start, stop)?;
    let mut local: Vec<T> = Vec::new();
    let mut push = |p: u64| -> Result<()> {
        match T::from_prime(p) {
            Some(v) => {
                local.push(v);
                Ok(())
            }
            None => Err(Error::Overflow { prime: p, width: T::TYPE_NAME }),
        }
    };
    for p in [2u64, 3, 5] {
        if p >= start && p <= stop {
            push(p)?;
        }
    }
    if stop >= 7 {
        let mut consumer = FnConsumer { f: push };
        SegmentSieve::new(start, stop)?.run(&mut consumer, None)?;
    }
    primes.append(&mut local);
    Ok(())
}

/// Appends the first `n` primes ≥ start to `primes`.
/// On error nothing is appended.
pub fn generate_n_primes<T: PrimeInt>(n: u64, start: u64, primes: &mut Vec<T>) -> Result<()> {
    let mut local: Vec<T> = Vec::with_capacity(n as usize);
    let mut iter = PrimeIter::new(start);
    for _ in 0..n {
        let p = iter.next_prime()?;
        match T::from_prime(p) {
            Some(v) => local.push(v),
            None => return Err(Error::Overflow { prime: p, width: T::TYPE_NAME }),
        }
    }
    primes.append(&mut local);
    Ok(())
}
