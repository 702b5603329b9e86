//! # Main — CLI Entry Point
//!
//! Parses the command line and routes to the execution functions in `cli`.
//! Handles the shared concerns: the global allocator, structured logging to
//! stderr, exit codes (0 on success, 1 on argument/range/internal errors).

mod cli;

use clap::Parser;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "primespan",
    version,
    disable_version_flag = true,
    about = "Count and print the primes and prime k-tuplets in [START, STOP] (< 2^64)",
    after_help = "Numbers can be written as 10^13, 4e15 or plain decimal.\n\
                  Examples:\n  primespan 1e10            count the primes below 10^10\n  \
                  primespan -p 100          print the primes below 100\n  \
                  primespan -c=2,3 1e9      count the twins and triplets below 10^9\n  \
                  primespan -n 1000         find the 1000th prime"
)]
struct Cli {
    /// Sieving interval operands: [START] STOP
    #[arg(value_name = "NUMBER", num_args = 0..=2)]
    numbers: Vec<String>,

    /// Count primes (-c) and/or k-tuplets (-c=2,3 counts twins and triplets)
    #[arg(
        short = 'c',
        long = "count",
        value_name = "N+",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "1"
    )]
    count: Option<String>,

    /// Sieve the interval [START, START + DIST]
    #[arg(short = 'd', long = "dist", value_name = "DIST")]
    dist: Option<String>,

    /// Find the nth prime: primespan -n N [START]
    #[arg(short = 'n', long = "nth")]
    nth: bool,

    /// Turn off the status output
    #[arg(long = "no-status")]
    no_status: bool,

    /// Print primes (-p) or k-tuplets (-p=2 ... -p=6)
    #[arg(
        short = 'p',
        long = "print",
        value_name = "N",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "1"
    )]
    print: Option<String>,

    /// Quiet mode, print the results without labels
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Set the sieve size in KiB (16 - 8192)
    #[arg(short = 's', long = "sieve-size", value_name = "KIB")]
    sieve_size: Option<usize>,

    /// Set the number of threads (default: all cores)
    #[arg(short = 't', long = "threads", value_name = "N")]
    threads: Option<usize>,

    /// Print the elapsed seconds to stderr
    #[arg(long = "time")]
    time: bool,

    /// Run the internal self-tests and exit
    #[arg(long = "test")]
    test: bool,

    /// Print version information
    #[arg(short = 'v', long = "version")]
    version: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            print!("{}", e);
            std::process::exit(0);
        }
        Err(e) => {
            eprint!("{}", e);
            std::process::exit(1);
        }
    };

    if cli.version {
        println!("primespan {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let default_filter = if cli.quiet || cli.no_status { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = cli::run(&cli) {
        eprintln!("primespan: {:#}", err);
        std::process::exit(1);
    }
}
