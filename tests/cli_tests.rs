//! CLI integration tests for the `primespan` binary.
//!
//! These spawn the compiled binary with `assert_cmd` and assert on exit
//! codes, stdout and stderr: flag parsing, number formats (`1e3`, `10^3`),
//! the count/print/nth operations against known values, and the error exit
//! code contract (0 on success, 1 on argument/range errors).

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn primespan() -> Command {
    Command::cargo_bin("primespan").unwrap()
}

// == Help and version ==========================================================

#[test]
fn help_lists_the_operations() {
    primespan()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--count"))
        .stdout(predicate::str::contains("--print"))
        .stdout(predicate::str::contains("--nth"))
        .stdout(predicate::str::contains("--threads"))
        .stdout(predicate::str::contains("--sieve-size"))
        .stdout(predicate::str::contains("--test"));
}

#[test]
fn short_version_flag_works() {
    primespan()
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains("primespan"));
}

// == Counting ==================================================================

#[test]
fn counts_primes_below_stop() {
    primespan()
        .arg("1000")
        .assert()
        .success()
        .stdout(predicate::str::contains("Primes: 168"));
}

#[test]
fn quiet_mode_prints_bare_numbers() {
    primespan()
        .args(["-q", "1000"])
        .assert()
        .success()
        .stdout("168\n");
}

#[test]
fn accepts_scientific_and_power_notation() {
    primespan().args(["-q", "1e3"]).assert().success().stdout("168\n");
    primespan().args(["-q", "10^3"]).assert().success().stdout("168\n");
}

#[test]
fn counts_interval_with_two_operands() {
    // π(100) − π(9) = 25 − 4
    primespan()
        .args(["-q", "10", "100"])
        .assert()
        .success()
        .stdout("21\n");
}

#[test]
fn counts_interval_with_dist() {
    // [1000, 1100] holds 16 primes
    primespan()
        .args(["-q", "-d", "100", "1000"])
        .assert()
        .success()
        .stdout("16\n");
}

#[test]
fn counts_twins_and_triplets_together() {
    primespan()
        .args(["-c=2,3", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Twin primes: 35"))
        .stdout(predicate::str::contains("Prime triplets: 30"));
}

// == Printing ==================================================================

#[test]
fn prints_primes_in_order() {
    primespan()
        .args(["-p", "-q", "30"])
        .assert()
        .success()
        .stdout("2\n3\n5\n7\n11\n13\n17\n19\n23\n29\n");
}

#[test]
fn prints_twin_pairs() {
    primespan()
        .args(["-p=2", "-q", "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(29, 31)"))
        .stdout(predicate::str::contains("(3, 5)"));
}

// == nth prime =================================================================

#[test]
fn finds_the_nth_prime() {
    primespan()
        .args(["-n", "-q", "100"])
        .assert()
        .success()
        .stdout("541\n");
    primespan()
        .args(["-n", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nth prime: 541"));
}

#[test]
fn finds_the_nth_prime_below_start() {
    primespan()
        .args(["-n", "-q", "--", "-1", "100"])
        .assert()
        .success()
        .stdout("97\n");
}

// == Timing ====================================================================

#[test]
fn time_flag_reports_elapsed_seconds() {
    primespan()
        .args(["--time", "-q", "100"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Seconds:"));
}

// == Error exit codes ==========================================================

#[test]
fn missing_operands_exit_one() {
    primespan().assert().code(1);
}

#[test]
fn invalid_number_exits_one() {
    primespan().arg("twelve").assert().code(1);
    primespan().arg("1e99").assert().code(1);
}

#[test]
fn inverted_range_exits_one() {
    primespan().args(["100", "10"]).assert().code(1);
}

#[test]
fn invalid_count_selector_exits_one() {
    primespan().args(["-c=7", "100"]).assert().code(1);
    primespan().args(["-c=0", "100"]).assert().code(1);
}

#[test]
fn invalid_sieve_size_exits_one() {
    primespan().args(["-s", "9000", "100"]).assert().code(1);
}

// == Self-test =================================================================

/// Runs the full internal battery; slow in debug builds.
#[test]
#[ignore]
fn self_test_battery_passes() {
    primespan()
        .arg("--test")
        .assert()
        .success()
        .stdout(predicate::str::contains("All tests passed"));
}
