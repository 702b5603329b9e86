//! # Iterator — Stateful Forward/Backward Prime Enumeration
//!
//! [`PrimeIter`] walks the primes one at a time in either direction,
//! materialising windows of primes into an internal cache and refilling on
//! demand. Window sizing is adaptive: the first refill is deliberately tiny
//! (1 KiB of primes) so `next_prime()` after `jump_to()` is cheap, and each
//! refill quadruples the budget up to a fixed maximum, so long iterations
//! amortise the per-window sieve setup. The window length itself scales
//! with ln(n) — the local prime density — around a primes-per-window
//! target.
//!
//! A `stop_hint` trims the first windows that would overshoot a known upper
//! bound, which matters when iterating tight ranges high up where sieving
//! past the hint costs real time.
//!
//! Iterating backward below 2 yields a sentinel 0 forever, matching the
//! convention of the C primesieve iterators.

use crate::error::{Error, Result};
use crate::{collect_primes, max_prime_gap, LARGEST_U64_PRIME};

/// Smallest refill budget once the tiny-cache ramp-up is over.
const MIN_CACHE_BYTES: u64 = 1 << 13;
/// Refill budget ceiling.
const MAX_CACHE_BYTES: u64 = 1 << 20;
/// First refill budget after a jump.
const TINY_CACHE_BYTES: u64 = 1 << 10;

pub struct PrimeIter {
    start: u64,
    stop: u64,
    stop_hint: u64,
    tiny_cache_bytes: u64,
    primes: Vec<u64>,
    /// Index of the most recently returned prime.
    i: usize,
    fresh: bool,
}

impl PrimeIter {
    /// An iterator positioned at `start`: the first `next_prime()` returns
    /// the smallest prime ≥ start, the first `prev_prime()` the largest
    /// prime ≤ start.
    pub fn new(start: u64) -> PrimeIter {
        PrimeIter::with_hint(start, 0)
    }

    /// Like [`PrimeIter::new`] with a `stop_hint`: when the caller knows it
    /// will not iterate past the hint, the windows near it are clipped.
    /// 0 means no hint.
    pub fn with_hint(start: u64, stop_hint: u64) -> PrimeIter {
        let mut it = PrimeIter {
            start: 0,
            stop: 0,
            stop_hint: 0,
            tiny_cache_bytes: 0,
            primes: Vec::new(),
            i: 0,
            fresh: true,
        };
        it.jump_to(start, stop_hint);
        it
    }

    /// Repositions the iterator at `start`, discarding the cache.
    pub fn jump_to(&mut self, start: u64, stop_hint: u64) {
        self.start = start;
        self.stop = start;
        self.stop_hint = stop_hint;
        self.tiny_cache_bytes = TINY_CACHE_BYTES;
        self.primes.clear();
        self.i = 0;
        self.fresh = true;
    }

    pub fn next_prime(&mut self) -> Result<u64> {
        if self.primes.is_empty() || self.i + 1 == self.primes.len() {
            self.generate_next_primes()?;
        } else {
            self.i += 1;
        }
        Ok(self.primes[self.i])
    }

    pub fn prev_prime(&mut self) -> Result<u64> {
        if self.primes.is_empty() {
            self.generate_prev_primes()?;
        } else if self.i == 0 {
            self.generate_prev_primes()?;
        } else {
            self.i -= 1;
        }
        Ok(self.primes[self.i])
    }

    fn generate_next_primes(&mut self) -> Result<()> {
        self.primes.clear();
        while self.primes.is_empty() {
            let start = if self.fresh {
                self.fresh = false;
                self.start
            } else {
                self.stop.saturating_add(1)
            };
            let mut stop = start.saturating_add(self.distance(start));
            if self.stop_hint != 0 && start <= self.stop_hint && stop >= self.stop_hint {
                stop = self.stop_hint.saturating_add(max_prime_gap(self.stop_hint));
            }
            collect_primes(start, stop, &mut self.primes)?;
            self.start = start;
            self.stop = stop;
            if self.primes.is_empty() && stop >= LARGEST_U64_PRIME {
                return Err(Error::OutOfRange("next_prime() > 2^64".into()));
            }
        }
        self.i = 0;
        Ok(())
    }

    fn generate_prev_primes(&mut self) -> Result<()> {
        self.primes.clear();
        while self.primes.is_empty() {
            let stop = if self.fresh {
                self.fresh = false;
                self.start
            } else {
                self.start.saturating_sub(1)
            };
            let mut start = stop.saturating_sub(self.distance(stop));
            if self.stop_hint != 0 && start <= self.stop_hint && stop >= self.stop_hint {
                start = self.stop_hint.saturating_sub(max_prime_gap(self.stop_hint));
            }
            if start <= 2 {
                self.primes.push(0);
            }
            collect_primes(start, stop, &mut self.primes)?;
            self.start = start;
            self.stop = stop;
        }
        self.i = self.primes.len() - 1;
        Ok(())
    }

    /// Window length at n: a primes-per-window target (ramping from the
    /// tiny cache to the configured bounds) times the local gap ln(n).
    fn distance(&mut self, n: u64) -> u64 {
        let n = n.max(10);
        let mut cache_bytes = MIN_CACHE_BYTES;
        if self.tiny_cache_bytes < cache_bytes {
            cache_bytes = self.tiny_cache_bytes;
            self.tiny_cache_bytes *= 4;
        }
        let x = n as f64;
        let sqrtx = x.sqrt();
        let primes_below_sqrt = (sqrtx / (sqrtx.ln() - 1.0)) as u64;
        let target = primes_below_sqrt.clamp(cache_bytes / 8, MAX_CACHE_BYTES / 8);
        (target as f64 * x.ln()) as u64
    }
}
