//! # NthPrime — Rank-Based Prime Search
//!
//! Finds the n-th prime above (or, for negative n, below) a starting point
//! without materialising the primes in between. A logarithmic-integral
//! style oracle guesses how far the n-th prime lies, the guess is corrected
//! by exact counting with the segmented sieve — overshoot counts backward,
//! undershoot extends forward — and once the remaining rank error is small
//! (≤ max(10^5, π(√guess))) the final stretch is walked prime by prime with
//! the iterator.
//!
//! The distance oracle deliberately under- and over-shoots by 2·√dist·…
//! safety margins depending on direction, so the correction loop converges
//! from both sides instead of oscillating.

use crate::error::{Error, Result};
use crate::{count_range, isqrt, PrimeIter, LARGEST_U64_PRIME};

/// Prime-counting approximation x/ln(x), floored at x = 4.
fn pix(n: u64) -> i64 {
    let x = n as f64;
    let logx = x.max(4.0).ln();
    (x / logx) as i64
}

/// Oracle distance from `anchor` to the prime of rank `n − count`,
/// with direction-dependent safety margins.
fn nth_prime_distance(n: i64, count: i64, anchor: u64) -> u64 {
    let x = ((n - count).unsigned_abs() as f64).max(4.0);
    let logx = x.ln();
    let loglogx = logx.ln();
    let pix = x * (logx + loglogx - 1.0);

    // When sieving backwards, shift the anchor down for a better density
    // estimate at the target.
    let mut anchor_f = anchor as f64;
    if count >= n {
        anchor_f = (anchor_f - pix).max(0.0);
    }

    let anchor_pix = (anchor_f + pix / loglogx).max(4.0);
    let log_anchor = anchor_pix.ln();
    let mut dist = pix.max(x * log_anchor);

    // Under-shoot going forward, over-shoot going backward
    if count < n {
        dist -= dist.sqrt() * log_anchor.ln() * 2.0;
    }
    if count > n {
        dist += dist.sqrt() * log_anchor.ln() * 2.0;
    }

    let min_dist = log_anchor * log_anchor;
    dist.max(min_dist) as u64
}

fn check_limit(start: u64) -> Result<()> {
    if start >= LARGEST_U64_PRIME {
        return Err(Error::OutOfRange("nth prime > 2^64".into()));
    }
    Ok(())
}

fn check_lower_limit(stop: u64) -> Result<()> {
    if stop == 0 {
        return Err(Error::NthPrimeUnderflow);
    }
    Ok(())
}

fn sieve_backwards(n: i64, count: i64, stop: u64) -> bool {
    count >= n && !(count == n && stop < 2)
}

/// The n-th prime after `start` (n > 0), or the n-th prime before `start`
/// (n < 0). `nth_prime(1, 0)` = 2; n = 0 is treated as 1.
pub fn nth_prime(n: i64, start: u64) -> Result<u64> {
    let mut n = n;
    let mut start = start;

    if n == 0 {
        n = 1;
    } else if n > 0 {
        start = start.saturating_add(1);
    } else {
        start = start.saturating_sub(1);
    }

    let mut stop = start;
    let dist = nth_prime_distance(n, 0, start);
    let guess = start.saturating_add(dist);

    let mut count: i64 = 0;
    let tiny_n = 100_000i64.max(pix(isqrt(guess)));

    while (n - count) > tiny_n || sieve_backwards(n, count, stop) {
        if count < n {
            check_limit(start)?;
            let dist = nth_prime_distance(n, count, start);
            stop = start.saturating_add(dist);
            count += count_range(start, stop)? as i64;
            start = stop.saturating_add(1);
        }
        if sieve_backwards(n, count, stop) {
            check_lower_limit(stop)?;
            let dist = nth_prime_distance(n, count, stop);
            start = start.saturating_sub(dist);
            count -= count_range(start, stop)? as i64;
            stop = start.saturating_sub(1);
        }
    }

    check_limit(start)?;
    if n < 0 {
        count -= 1;
    }
    let dist = nth_prime_distance(n, count, start).saturating_mul(2);
    let hint = start.saturating_add(dist);
    let mut iter = PrimeIter::with_hint(start, hint);
    let mut prime = 0;
    while count < n {
        prime = iter.next_prime()?;
        count += 1;
    }
    Ok(prime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_primes_by_rank() {
        assert_eq!(nth_prime(1, 0).unwrap(), 2);
        assert_eq!(nth_prime(2, 0).unwrap(), 3);
        assert_eq!(nth_prime(3, 0).unwrap(), 5);
        assert_eq!(nth_prime(4, 0).unwrap(), 7);
        assert_eq!(nth_prime(25, 0).unwrap(), 97);
        // n = 0 behaves like n = 1
        assert_eq!(nth_prime(0, 0).unwrap(), 2);
    }

    #[test]
    fn known_ranks() {
        assert_eq!(nth_prime(100, 0).unwrap(), 541);
        assert_eq!(nth_prime(1_000, 0).unwrap(), 7919);
        assert_eq!(nth_prime(10_000, 0).unwrap(), 104_729);
        assert_eq!(nth_prime(100_000, 0).unwrap(), 1_299_709);
    }

    #[test]
    fn nth_prime_from_offset() {
        // First prime above 100 is 101
        assert_eq!(nth_prime(1, 100).unwrap(), 101);
        // Start on a prime: it is not its own successor
        assert_eq!(nth_prime(1, 97).unwrap(), 101);
        assert_eq!(nth_prime(2, 100).unwrap(), 103);
    }

    #[test]
    fn negative_n_searches_below_start() {
        assert_eq!(nth_prime(-1, 100).unwrap(), 97);
        assert_eq!(nth_prime(-1, 97).unwrap(), 89);
        assert_eq!(nth_prime(-2, 100).unwrap(), 89);
        // Exactly enough primes below: the 3rd prime below 7 is 2
        assert_eq!(nth_prime(-3, 7).unwrap(), 2);
        assert_eq!(nth_prime(-25, 98).unwrap(), 2);
    }

    #[test]
    fn negative_n_underflow_is_an_error() {
        assert!(matches!(nth_prime(-1, 2), Err(Error::NthPrimeUnderflow)));
        assert!(matches!(nth_prime(-4, 7), Err(Error::NthPrimeUnderflow)));
    }

    #[test]
    fn round_trips_with_count_primes() {
        for p in [2u64, 97, 541, 7919, 104_729] {
            let rank = crate::count_primes(2, p).unwrap() as i64;
            assert_eq!(nth_prime(rank, 0).unwrap(), p, "rank {}", rank);
        }
        // count + 1 from a non-prime x gives the least prime > x
        for x in [4u64, 100, 1000, 50_000] {
            let rank = crate::count_primes(2, x).unwrap() as i64 + 1;
            let p = nth_prime(rank, 0).unwrap();
            assert!(p > x);
            assert_eq!(crate::count_primes(x + 1, p).unwrap(), 1);
        }
    }

    #[test]
    fn large_rank_exercises_the_correction_loop() {
        // π(10^8) = 5761455, so the 5.7M-th prime forces sieved counting
        // before the final iterator walk.
        assert_eq!(nth_prime(1_000_000, 0).unwrap(), 15_485_863);
    }
}
