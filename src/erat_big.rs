//! # EratBig — Cross-Off for Large Sieving Primes
//!
//! A large prime touches a segment at most a few times and often sleeps for
//! many segments between multiples. Iterating all of them every segment
//! would be almost pure overhead, so they are parked in a ring of bucket
//! lists indexed by the segment of their next multiple, modulo the ring
//! length. Per segment only the current slot is visited: each prime clears
//! exactly one bit, advances one wheel step, and is re-enqueued into the
//! slot of the segment holding its next multiple — possibly the current
//! slot again, which is why the slot is drained repeatedly until it stays
//! empty. Drained buckets go straight back to the memory pool.
//!
//! The ring must reach as far as one wheel step can jump: 6·p for the
//! largest sieving prime, i.e. 6·√stop integers, plus the current segment.
//! Offsets stored in the ring are relative to the slot's own segment low,
//! so nothing needs rebasing when the ring advances.
//!
//! Invariant: every sieving prime is in exactly one bucket of one slot at
//! all times; none is lost between segments.

use crate::error::Result;
use crate::memory_pool::{BucketList, MemoryPool, SievingPrime};
use crate::wheel::{UNSET_MASK, WHEEL_GAPS};

pub struct EratBig {
    ring: Vec<BucketList>,
    cur: usize,
    span: u64,
}

impl EratBig {
    /// `sqrt_stop` bounds the sieving primes this classifier will ever see.
    pub fn new(span: u64, sqrt_stop: u64) -> EratBig {
        let slots = (6 * sqrt_stop / span) as usize + 2;
        let mut ring = Vec::with_capacity(slots);
        ring.resize_with(slots, BucketList::new);
        EratBig { ring, cur: 0, span }
    }

    /// Stores a sieving prime; `sp.offset` is relative to the current
    /// segment low and selects the ring slot.
    pub fn add(&mut self, pool: &mut MemoryPool, mut sp: SievingPrime) -> Result<()> {
        let segment = (sp.offset / self.span) as usize;
        debug_assert!(segment < self.ring.len());
        let slot = (self.cur + segment) % self.ring.len();
        sp.offset %= self.span;
        self.ring[slot].push(pool, sp)
    }

    pub fn cross_off(&mut self, pool: &mut MemoryPool, sieve: &mut [u8]) -> Result<()> {
        let span = self.span;
        let slots = self.ring.len();
        debug_assert_eq!(sieve.len() as u64 * 30, span);

        loop {
            let buckets = self.ring[self.cur].take();
            if buckets.is_empty() {
                break;
            }
            for bucket in &buckets {
                for sp in bucket.entries() {
                    let p = sp.prime as u64;
                    let mut w = sp.wheel_idx as usize;

                    sieve[(sp.offset / 30) as usize] &= UNSET_MASK[sp.residue_idx as usize][w];
                    let offset = sp.offset + p * WHEEL_GAPS[w];
                    w = (w + 1) & 7;

                    let segment = (offset / span) as usize;
                    debug_assert!(segment < slots);
                    let slot = (self.cur + segment) % slots;
                    self.ring[slot].push(
                        pool,
                        SievingPrime {
                            prime: sp.prime,
                            wheel_idx: w as u8,
                            residue_idx: sp.residue_idx,
                            offset: offset % span,
                        },
                    )?;
                }
            }
            BucketList::release(pool, buckets);
        }

        self.cur = (self.cur + 1) % slots;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erat_small::EratSmall;
    use crate::wheel::first_multiple;

    /// All three classifiers share one contract; EratBig must produce the
    /// same segment bytes as EratSmall for the same primes. Primes join a
    /// classifier the way the driver adds them: at the first segment whose
    /// upper bound reaches p², with offsets relative to that segment's low.
    #[test]
    fn agrees_with_erat_small_across_segments() {
        let bytes = 8usize;
        let span = bytes as u64 * 30;
        let stop = 200_000u64;
        // Primes well above 5·sieve_bytes = 40
        let mut pending: Vec<u64> = vec![101, 211, 307, 401, 409, 419];
        pending.reverse();

        let mut pool = MemoryPool::new();
        let mut big = EratBig::new(span, 419);
        let mut small = EratSmall::new(span);

        let mut low = 0u64;
        while low <= stop {
            let high = low + span - 1;
            while let Some(&p) = pending.last() {
                if p * p > high {
                    break;
                }
                pending.pop();
                let (offset, wheel_idx, residue_idx) = first_multiple(p, low, stop).unwrap();
                let sp = SievingPrime { prime: p as u32, wheel_idx, residue_idx, offset };
                big.add(&mut pool, sp).unwrap();
                small.add(sp);
            }
            let mut seg_big = vec![0xffu8; bytes];
            let mut seg_small = vec![0xffu8; bytes];
            big.cross_off(&mut pool, &mut seg_big).unwrap();
            small.cross_off(&mut seg_small);
            assert_eq!(seg_big, seg_small, "segment at low={}", low);
            low += span;
        }
        assert!(pending.is_empty());
    }

    /// A prime re-enqueued into the current slot (two multiples in one
    /// segment) must be processed before the ring advances. p = 53 against a
    /// 240-wide segment: consecutive wheel multiples can be 2·53 = 106
    /// apart, so two land in one segment.
    #[test]
    fn handles_multiple_hits_in_one_segment() {
        let bytes = 8usize;
        let span = bytes as u64 * 30; // 240
        let p = 53u64;

        let mut pool = MemoryPool::new();
        let mut big = EratBig::new(span, p);
        let mut small = EratSmall::new(span);

        let mut low = 0u64;
        let mut added = false;
        for _ in 0..100 {
            let high = low + span - 1;
            if !added && p * p <= high {
                added = true;
                let (offset, wheel_idx, residue_idx) = first_multiple(p, low, u64::MAX).unwrap();
                let sp = SievingPrime { prime: p as u32, wheel_idx, residue_idx, offset };
                big.add(&mut pool, sp).unwrap();
                small.add(sp);
            }
            let mut seg_big = vec![0xffu8; bytes];
            let mut seg_small = vec![0xffu8; bytes];
            big.cross_off(&mut pool, &mut seg_big).unwrap();
            small.cross_off(&mut seg_small);
            assert_eq!(seg_big, seg_small, "segment at low={}", low);
            low += span;
        }
        assert!(added);
    }
}
