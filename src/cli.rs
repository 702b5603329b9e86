//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Contains the
//! operand parsing (plain decimal, `4e9`, `10^13`), the dispatch across the
//! count / print / nth-prime operations, and the `--test` self-test battery.

use std::io::Write;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use primespan::tuplets::TupletEmitter;
use primespan::{
    count_primes, count_quadruplets, count_quintuplets, count_sextuplets, count_triplets,
    count_twins, nth_prime, parallel_count_primes, sieve::SegmentSieve, PrimeIter,
};

use super::Cli;

pub fn run(cli: &Cli) -> Result<()> {
    if let Some(kib) = cli.sieve_size {
        if !(16..=8192).contains(&kib) {
            bail!("sieve size {} KiB is outside [16, 8192]", kib);
        }
        primespan::set_sieve_size_kib(kib);
    }
    if let Some(threads) = cli.threads {
        if threads == 0 {
            bail!("thread count must be at least 1");
        }
        primespan::set_num_threads(threads);
    }

    let started = Instant::now();
    let result = dispatch(cli);
    if cli.time {
        eprintln!("Seconds: {:.3}", started.elapsed().as_secs_f64());
    }
    result
}

fn dispatch(cli: &Cli) -> Result<()> {
    if cli.test {
        return run_self_test();
    }
    if cli.nth {
        return run_nth_prime(cli);
    }

    let (start, stop) = parse_interval(cli)?;
    info!(
        start,
        stop,
        threads = primespan::num_threads(),
        sieve_kib = primespan::sieve_size_kib(),
        "sieving"
    );

    if let Some(spec) = &cli.print {
        return run_print(spec, start, stop);
    }

    // Default operation is counting primes
    let spec = cli.count.clone().unwrap_or_else(|| "1".to_string());
    run_counts(cli, &spec, start, stop)
}

// ── Operand parsing ─────────────────────────────────────────────

/// Parses `123`, `4e15` and `10^13` into a u64.
pub fn parse_number(s: &str) -> Result<u64> {
    let s = s.trim();
    if let Some((base, exp)) = s.split_once('^') {
        let base: u64 = base.parse().with_context(|| format!("invalid base in '{}'", s))?;
        let exp: u32 = exp.parse().with_context(|| format!("invalid exponent in '{}'", s))?;
        return base.checked_pow(exp).ok_or_else(|| anyhow!("'{}' exceeds 2^64", s));
    }
    if let Some(pos) = s.find(['e', 'E']) {
        let mantissa: u64 = s[..pos]
            .parse()
            .with_context(|| format!("invalid mantissa in '{}'", s))?;
        let exp: u32 = s[pos + 1..]
            .parse()
            .with_context(|| format!("invalid exponent in '{}'", s))?;
        return 10u64
            .checked_pow(exp)
            .and_then(|p| mantissa.checked_mul(p))
            .ok_or_else(|| anyhow!("'{}' exceeds 2^64", s));
    }
    s.parse().with_context(|| format!("invalid number '{}'", s))
}

/// Like [`parse_number`] with an optional leading minus (for -n ranks).
fn parse_rank(s: &str) -> Result<i64> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = parse_number(digits)?;
    let magnitude =
        i64::try_from(magnitude).map_err(|_| anyhow!("rank '{}' exceeds i64", s))?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_interval(cli: &Cli) -> Result<(u64, u64)> {
    if let Some(dist) = &cli.dist {
        let dist = parse_number(dist)?;
        let start = match cli.numbers.len() {
            0 => bail!("missing START operand for --dist"),
            1 => parse_number(&cli.numbers[0])?,
            _ => bail!("--dist takes a single START operand"),
        };
        return Ok((start, start.saturating_add(dist)));
    }
    match cli.numbers.len() {
        1 => Ok((0, parse_number(&cli.numbers[0])?)),
        2 => {
            let start = parse_number(&cli.numbers[0])?;
            let stop = parse_number(&cli.numbers[1])?;
            Ok((start, stop))
        }
        _ => bail!("expected operands: [START] STOP"),
    }
}

// ── Counting ────────────────────────────────────────────────────

fn tuplet_label(k: usize) -> &'static str {
    match k {
        1 => "Primes",
        2 => "Twin primes",
        3 => "Prime triplets",
        4 => "Prime quadruplets",
        5 => "Prime quintuplets",
        _ => "Prime sextuplets",
    }
}

fn run_counts(cli: &Cli, spec: &str, start: u64, stop: u64) -> Result<()> {
    for part in spec.split(',') {
        let k: usize = part
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid count selector '{}'", part))?;
        let count = match k {
            1 => parallel_count_primes(start, stop, primespan::num_threads())?,
            2 => count_twins(start, stop)?,
            3 => count_triplets(start, stop)?,
            4 => count_quadruplets(start, stop)?,
            5 => count_quintuplets(start, stop)?,
            6 => count_sextuplets(start, stop)?,
            _ => bail!("count selector must be in 1..6, got '{}'", part),
        };
        if cli.quiet {
            println!("{}", count);
        } else {
            println!("{}: {}", tuplet_label(k), count);
        }
    }
    Ok(())
}

// ── Printing ────────────────────────────────────────────────────

fn run_print(spec: &str, start: u64, stop: u64) -> Result<()> {
    let k: usize = spec.parse().map_err(|_| anyhow!("invalid print selector '{}'", spec))?;
    if start > stop {
        bail!("start {} > stop {}", start, stop);
    }
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());

    match k {
        1 => {
            let mut iter = PrimeIter::with_hint(start, stop);
            loop {
                match iter.next_prime() {
                    Ok(p) if p <= stop => writeln!(out, "{}", p)?,
                    Ok(_) => break,
                    Err(primespan::Error::OutOfRange(_)) => break,
                    Err(e) => return Err(e.into()),
                }
            }
        }
        2..=6 => {
            let write_error = std::cell::RefCell::new(None);
            let mut emitter = TupletEmitter::new(k, |members: &[u64]| {
                let line = members
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Err(e) = writeln!(out, "({})", line) {
                    *write_error.borrow_mut() = Some(e);
                    return Err(primespan::Error::Resource("stdout closed".into()));
                }
                Ok(())
            });
            emitter.emit_small(start, stop)?;
            if stop >= 7 && start.max(7) <= stop {
                let mut sieve = SegmentSieve::new(start, stop)?;
                match sieve.run(&mut emitter, None) {
                    Ok(_) => {}
                    // A closed pipe ends printing, it is not a failure
                    Err(primespan::Error::Resource(_)) if write_error.borrow().is_some() => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        _ => bail!("print selector must be in 1..6, got '{}'", spec),
    }
    out.flush().ok();
    Ok(())
}

// ── nth prime ───────────────────────────────────────────────────

fn run_nth_prime(cli: &Cli) -> Result<()> {
    let (n, start) = match cli.numbers.len() {
        1 => (parse_rank(&cli.numbers[0])?, 0),
        2 => (parse_rank(&cli.numbers[0])?, parse_number(&cli.numbers[1])?),
        _ => bail!("usage: primespan -n N [START]"),
    };
    let prime = nth_prime(n, start)?;
    if cli.quiet {
        println!("{}", prime);
    } else {
        println!("Nth prime: {}", prime);
    }
    Ok(())
}

// ── Self-tests ──────────────────────────────────────────────────

/// Quick end-to-end battery over known values; used by `--test`.
fn run_self_test() -> Result<()> {
    let pi_powers: [u64; 7] = [4, 25, 168, 1229, 9592, 78498, 664_579];
    for (i, &expected) in pi_powers.iter().enumerate() {
        let stop = 10u64.pow(i as u32 + 1);
        let got = count_primes(0, stop)?;
        check(&format!("pi(10^{}) = {}", i + 1, expected), got, expected)?;
    }

    let split = count_primes(0, 500_000)? + count_primes(500_001, 1_000_000)?;
    check("pi partition sum", split, pi_powers[5])?;
    check("twins(10^6) = 8169", count_twins(0, 1_000_000)?, 8169)?;
    check("triplets(10^3) = 30", count_triplets(0, 1000)?, 30)?;
    check("nth_prime(10^4) = 104729", nth_prime(10_000, 0)?, 104_729)?;

    let sequential = count_primes(0, 10_000_000)?;
    let parallel = parallel_count_primes(0, 10_000_000, primespan::num_threads())?;
    check("parallel = sequential", parallel, sequential)?;

    println!("All tests passed");
    Ok(())
}

fn check(what: &str, got: u64, expected: u64) -> Result<()> {
    if got == expected {
        println!("{} ... OK", what);
        Ok(())
    } else {
        bail!("{} ... FAILED (got {})", what, got);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_forms() {
        assert_eq!(parse_number("123").unwrap(), 123);
        assert_eq!(parse_number("1e9").unwrap(), 1_000_000_000);
        assert_eq!(parse_number("4E3").unwrap(), 4000);
        assert_eq!(parse_number("10^13").unwrap(), 10_000_000_000_000);
        assert_eq!(parse_number("2^10").unwrap(), 1024);
        assert_eq!(parse_number("18446744073709551615").unwrap(), u64::MAX);
    }

    #[test]
    fn parse_number_rejects_garbage() {
        assert!(parse_number("").is_err());
        assert!(parse_number("abc").is_err());
        assert!(parse_number("1e").is_err());
        assert!(parse_number("^5").is_err());
        assert!(parse_number("10^30").is_err()); // exceeds u64
        assert!(parse_number("-5").is_err());
    }

    #[test]
    fn parse_rank_signs() {
        assert_eq!(parse_rank("100").unwrap(), 100);
        assert_eq!(parse_rank("-100").unwrap(), -100);
        assert_eq!(parse_rank("1e4").unwrap(), 10_000);
        assert_eq!(parse_rank("-1e4").unwrap(), -10_000);
    }
}
