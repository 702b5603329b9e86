//! # Tuplets — Prime k-Tuplet Counting and Enumeration
//!
//! A prime k-tuplet is k primes packed into the smallest admissible span:
//! twins (p, p+2), triplets (p, p+2, p+6) / (p, p+4, p+6), quadruplets
//! (p, p+2, p+6, p+8), quintuplets (p, p+2, p+6, p+8, p+12) /
//! (p, p+4, p+6, p+10, p+12) and sextuplets (p, p+4, p+6, p+10, p+12, p+16).
//!
//! On the wheel-30 byte encoding (bits = residues 1, 7, 11, 13, 17, 19, 23,
//! 29) every admissible pattern for k ≥ 3 falls inside one byte, so counting
//! is a handful of mask compares per byte. Twins additionally occur as
//! (29, 31) — bit 7 of one byte and bit 0 of the next — matched with a
//! carry bit that also crosses segment boundaries (segments are contiguous).
//!
//! Tuplets that begin at 3 or 5 contain primes below the wheel and come
//! from a fixed table, the same way the small primes 2, 3, 5 do:
//! (3, 5), (5, 7), (5, 7, 11), (5, 7, 11, 13) and (5, 7, 11, 13, 17).
//! A tuplet is counted when its first member is ≥ start and its last
//! member is ≤ stop.

use crate::error::Result;
use crate::sieve::SegmentConsumer;
use crate::wheel::WHEEL_RESIDUES;

/// In-byte bit patterns per tuplet size k (index k − 2). A pattern matches
/// when every one of its bits is set.
const BYTE_PATTERNS: [&[u8]; 5] = [
    // twins: (11,13), (17,19); (29,31) crosses the byte boundary
    &[0x0c, 0x30],
    // triplets: (7,11,13), (11,13,17), (13,17,19), (17,19,23)
    &[0x0e, 0x1c, 0x38, 0x70],
    // quadruplets: (11,13,17,19)
    &[0x3c],
    // quintuplets: (7,11,13,17,19), (11,13,17,19,23)
    &[0x3e, 0x7c],
    // sextuplets: (7,11,13,17,19,23)
    &[0x7e],
];

/// Tuplets whose first member is 3 or 5: (first, last) per k.
const SMALL_TUPLETS: [&[(u64, u64)]; 5] = [
    &[(3, 5), (5, 7)],
    &[(5, 11)],
    &[(5, 13)],
    &[(5, 17)],
    &[],
];

/// Tuplets beginning at 3 or 5 lying inside [start, stop].
pub fn count_small_tuplets(k: usize, start: u64, stop: u64) -> u64 {
    SMALL_TUPLETS[k - 2]
        .iter()
        .filter(|&&(first, last)| start <= first && last <= stop)
        .count() as u64
}

/// Counts k-tuplet starts on the sieve byte array.
pub struct TupletCounter {
    k: usize,
    pub count: u64,
    prev_high_bit: bool,
}

impl TupletCounter {
    pub fn new(k: usize) -> TupletCounter {
        assert!((2..=6).contains(&k));
        TupletCounter { k, count: 0, prev_high_bit: false }
    }
}

impl SegmentConsumer for TupletCounter {
    fn segment(&mut self, _low: u64, sieve: &[u8]) -> Result<()> {
        let patterns = BYTE_PATTERNS[self.k - 2];
        for &byte in sieve {
            for &pattern in patterns {
                if byte & pattern == pattern {
                    self.count += 1;
                }
            }
            if self.k == 2 {
                if self.prev_high_bit && byte & 0x01 != 0 {
                    self.count += 1;
                }
                self.prev_high_bit = byte & 0x80 != 0;
            }
        }
        Ok(())
    }
}

/// Emits each k-tuplet as its member values, in ascending order of the
/// first member.
pub struct TupletEmitter<F: FnMut(&[u64]) -> Result<()>> {
    k: usize,
    f: F,
    prev_high_bit: bool,
    prev_high_value: u64,
}

impl<F: FnMut(&[u64]) -> Result<()>> TupletEmitter<F> {
    pub fn new(k: usize, f: F) -> TupletEmitter<F> {
        assert!((2..=6).contains(&k));
        TupletEmitter { k, f, prev_high_bit: false, prev_high_value: 0 }
    }

    /// Feeds the below-wheel tuplets for [start, stop] before sieving.
    pub fn emit_small(&mut self, start: u64, stop: u64) -> Result<()> {
        for &(first, last) in SMALL_TUPLETS[self.k - 2] {
            if start <= first && last <= stop {
                let members: Vec<u64> = match (first, self.k) {
                    (3, 2) => vec![3, 5],
                    (5, 2) => vec![5, 7],
                    (5, 3) => vec![5, 7, 11],
                    (5, 4) => vec![5, 7, 11, 13],
                    (5, 5) => vec![5, 7, 11, 13, 17],
                    _ => unreachable!(),
                };
                (self.f)(&members)?;
            }
        }
        Ok(())
    }
}

impl<F: FnMut(&[u64]) -> Result<()>> SegmentConsumer for TupletEmitter<F> {
    fn segment(&mut self, low: u64, sieve: &[u8]) -> Result<()> {
        let patterns = BYTE_PATTERNS[self.k - 2];
        let mut members = [0u64; 6];
        for (i, &byte) in sieve.iter().enumerate() {
            let base = low + 30 * i as u64;
            // The straddling twin (29, 31) sorts before any in-byte pattern
            // of this byte, so it is emitted first.
            if self.k == 2 && self.prev_high_bit && byte & 0x01 != 0 {
                (self.f)(&[self.prev_high_value, base + 1])?;
            }
            for &pattern in patterns {
                if byte & pattern == pattern {
                    let mut n = 0;
                    for (bit, &r) in WHEEL_RESIDUES.iter().enumerate() {
                        if pattern & (1 << bit) != 0 {
                            members[n] = base + r;
                            n += 1;
                        }
                    }
                    (self.f)(&members[..n])?;
                }
            }
            if self.k == 2 {
                self.prev_high_bit = byte & 0x80 != 0;
                if self.prev_high_bit {
                    // Only needed when the bit is set, which also means the
                    // value fits (masked bits never exceed stop)
                    self.prev_high_value = base + 29;
                }
            }
        }
        Ok(())
    }
}
