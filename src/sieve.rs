//! # Sieve — Segment Driver
//!
//! Owns the sieve byte array and advances it segment by segment over
//! [start, stop]. Each segment is: seed from the pre-sieve buffer, pull any
//! sieving primes that became due (p² ≤ segment high) and dispatch them to
//! a classifier by size, run the three cross-off passes in fixed order,
//! mask the bits outside [start, stop], and hand the bytes to the consumer.
//!
//! The classifier thresholds are compile-time constants
//! ([`ERAT_SMALL_FACTOR`], [`ERAT_MEDIUM_FACTOR`]); correctness is
//! invariant to them — every classifier implements the same contract and
//! only the cost model differs — which the property tests exercise with
//! deliberately wrong splits.
//!
//! Integers 2, 3 and 5 live below the wheel and are accounted for by the
//! callers in `lib.rs`, never by the byte array.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::erat_big::EratBig;
use crate::erat_medium::EratMedium;
use crate::erat_small::EratSmall;
use crate::error::{Error, Result};
use crate::memory_pool::{MemoryPool, SievingPrime};
use crate::presieve::PreSieve;
use crate::sieving_primes::SievingPrimes;
use crate::wheel::{first_multiple, WHEEL_RESIDUES};
use crate::{isqrt, resolve_sieve_bytes};

/// Primes up to `sieve_bytes · ERAT_SMALL_FACTOR` go to EratSmall.
pub const ERAT_SMALL_FACTOR: u64 = 1;
/// Primes up to `sieve_bytes · ERAT_MEDIUM_FACTOR` go to EratMedium; with
/// factor 5 the largest wheel step 6·p never exceeds the segment span.
pub const ERAT_MEDIUM_FACTOR: u64 = 5;

/// Receives each sieved segment. The bytes passed in are fully masked:
/// every set bit is a prime in [start, stop].
pub trait SegmentConsumer {
    fn segment(&mut self, low: u64, sieve: &[u8]) -> Result<()>;
}

/// Calls `f` for every set bit of a masked segment, in ascending order.
#[inline]
pub fn each_prime<F: FnMut(u64) -> Result<()>>(low: u64, sieve: &[u8], f: &mut F) -> Result<()> {
    for (i, &byte) in sieve.iter().enumerate() {
        let mut bits = byte;
        while bits != 0 {
            let bit = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            f(low + 30 * i as u64 + WHEEL_RESIDUES[bit])?;
        }
    }
    Ok(())
}

/// Sums set bits: one popcount per byte.
#[derive(Default)]
pub struct CountConsumer {
    pub count: u64,
}

impl SegmentConsumer for CountConsumer {
    fn segment(&mut self, _low: u64, sieve: &[u8]) -> Result<()> {
        self.count += sieve.iter().map(|b| b.count_ones() as u64).sum::<u64>();
        Ok(())
    }
}

/// Decodes set bits into a vector of u64 primes.
pub struct CollectConsumer<'a> {
    pub out: &'a mut Vec<u64>,
}

impl SegmentConsumer for CollectConsumer<'_> {
    fn segment(&mut self, low: u64, sieve: &[u8]) -> Result<()> {
        each_prime(low, sieve, &mut |p| {
            self.out.push(p);
            Ok(())
        })
    }
}

/// Feeds every prime to a callback.
pub struct FnConsumer<F: FnMut(u64) -> Result<()>> {
    pub f: F,
}

impl<F: FnMut(u64) -> Result<()>> SegmentConsumer for FnConsumer<F> {
    fn segment(&mut self, low: u64, sieve: &[u8]) -> Result<()> {
        each_prime(low, sieve, &mut self.f)
    }
}

/// The segmented sieve over one interval. One instance per thread; nothing
/// is shared.
pub struct SegmentSieve {
    start: u64,
    stop: u64,
    segment_low: u64,
    sieve: Vec<u8>,
    span: u64,
    pre_sieve: PreSieve,
    small: EratSmall,
    medium: EratMedium,
    big: EratBig,
    pool: MemoryPool,
    sieving_primes: SievingPrimes,
    pending: Option<u64>,
    small_limit: u64,
    medium_limit: u64,
    first_segment: bool,
    finished: bool,
}

impl SegmentSieve {
    /// Driver over [start, stop] with an auto-sized segment (L1-cache sized
    /// for short intervals, up to L2 for long ones).
    pub fn new(start: u64, stop: u64) -> Result<SegmentSieve> {
        let bytes = resolve_sieve_bytes(start, stop);
        SegmentSieve::with_sieve_bytes(start, stop, bytes)
    }

    pub fn with_sieve_bytes(start: u64, stop: u64, sieve_bytes: usize) -> Result<SegmentSieve> {
        let small = sieve_bytes as u64 * ERAT_SMALL_FACTOR;
        let medium = sieve_bytes as u64 * ERAT_MEDIUM_FACTOR;
        SegmentSieve::with_thresholds(start, stop, sieve_bytes, small, medium)
    }

    /// Fully parameterised constructor; the threshold parameters exist so
    /// tests can prove counts do not depend on the classifier split.
    pub fn with_thresholds(
        start: u64,
        stop: u64,
        sieve_bytes: usize,
        small_limit: u64,
        medium_limit: u64,
    ) -> Result<SegmentSieve> {
        if start > stop {
            return Err(Error::OutOfRange(format!("start {} > stop {}", start, stop)));
        }
        assert!(sieve_bytes > 0);
        let span = sieve_bytes as u64 * 30;
        let sieve_start = start.max(7);
        let segment_low = sieve_start / 30 * 30;
        let sqrt_stop = isqrt(stop);

        Ok(SegmentSieve {
            start,
            stop,
            segment_low,
            sieve: vec![0; sieve_bytes],
            span,
            pre_sieve: PreSieve::new(sieve_start, stop),
            small: EratSmall::new(span),
            medium: EratMedium::new(span),
            big: EratBig::new(span, sqrt_stop),
            pool: MemoryPool::new(),
            sieving_primes: SievingPrimes::new(sqrt_stop),
            pending: None,
            small_limit,
            medium_limit,
            first_segment: true,
            finished: stop < 7 || sieve_start > stop,
        })
    }

    /// Sieves every segment, feeding `consumer`. Returns `true` when the run
    /// was cancelled between segments (the counts seen so far are partial).
    pub fn run(
        &mut self,
        consumer: &mut dyn SegmentConsumer,
        cancel: Option<&AtomicBool>,
    ) -> Result<bool> {
        while !self.finished {
            self.sieve_segment(consumer)?;
            if !self.finished {
                if let Some(flag) = cancel {
                    if flag.load(Ordering::Relaxed) {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    fn sieve_segment(&mut self, consumer: &mut dyn SegmentConsumer) -> Result<()> {
        let low = self.segment_low;
        let high = match low.checked_add(self.span - 1) {
            Some(h) => h.min(self.stop),
            None => self.stop,
        };

        self.pre_sieve.copy_into(&mut self.sieve, low);
        self.restore_presieve_primes(low, high);
        self.update_sieving_primes(low, high)?;

        self.small.cross_off(&mut self.sieve);
        self.medium.cross_off(&mut self.pool, &mut self.sieve)?;
        self.big.cross_off(&mut self.pool, &mut self.sieve)?;

        let valid = self.apply_masks(low, high);
        consumer.segment(low, &self.sieve[..valid])?;

        if high >= self.stop {
            self.finished = true;
        } else {
            self.segment_low += self.span;
        }
        Ok(())
    }

    /// The pre-sieve buffer clears the position of each pre-sieve prime
    /// itself; in the lowest segment those bits are primes and come back.
    fn restore_presieve_primes(&mut self, low: u64, high: u64) {
        if low != 0 {
            return;
        }
        for q in [7u64, 11, 13, 17, 19] {
            if q <= self.pre_sieve.max_prime() && q <= high {
                self.sieve[0] |= 1 << crate::wheel::BIT_INDEX[(q % 30) as usize];
            }
        }
    }

    /// Pulls sieving primes due for this segment (p² ≤ high) and routes
    /// each to a classifier; primes without a multiple in range are dropped.
    fn update_sieving_primes(&mut self, low: u64, high: u64) -> Result<()> {
        loop {
            let p = match self.pending.take() {
                Some(p) => p,
                None => match self.sieving_primes.next_prime() {
                    Some(p) => p,
                    None => return Ok(()),
                },
            };
            if p * p > high {
                self.pending = Some(p);
                return Ok(());
            }
            if p <= self.pre_sieve.max_prime() {
                continue;
            }
            if let Some((offset, wheel_idx, residue_idx)) = first_multiple(p, low, self.stop) {
                let sp = SievingPrime { prime: p as u32, wheel_idx, residue_idx, offset };
                if p <= self.small_limit {
                    self.small.add(sp);
                } else if p <= self.medium_limit {
                    self.medium.add(&mut self.pool, sp)?;
                } else {
                    self.big.add(&mut self.pool, sp)?;
                }
            }
        }
    }

    /// Clears the bits below max(start, 7) in the first segment and above
    /// stop in the last one; returns how many leading bytes are valid.
    fn apply_masks(&mut self, low: u64, high: u64) -> usize {
        if self.first_segment {
            self.first_segment = false;
            let floor = self.start.max(7);
            for (bit, &r) in WHEEL_RESIDUES.iter().enumerate() {
                // An overflowing value is beyond stop and falls to the
                // last-segment mask below
                if let Some(value) = low.checked_add(r) {
                    if value < floor {
                        self.sieve[0] &= !(1 << bit);
                    }
                }
            }
        }
        if high == self.stop {
            let last_byte = ((self.stop - low) / 30) as usize;
            for (bit, &r) in WHEEL_RESIDUES.iter().enumerate() {
                match (low + 30 * last_byte as u64).checked_add(r) {
                    Some(value) if value <= self.stop => {}
                    _ => self.sieve[last_byte] &= !(1 << bit),
                }
            }
            last_byte + 1
        } else {
            self.sieve.len()
        }
    }
}
