//! # Error — Library Error Surface
//!
//! One error type with one variant per failure class. Library functions
//! return `Result<T>`; the CLI converts into `anyhow` at the boundary and
//! maps every failure to exit code 1.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way a primespan operation can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// start > stop, or a search walked past the largest 64-bit prime.
    OutOfRange(String),
    /// A generated prime does not fit the requested output integer type.
    Overflow { prime: u64, width: &'static str },
    /// The bucket memory pool hit its allocation cap.
    Resource(String),
    /// Invalid command-line arguments or flag combination.
    Argument(String),
    /// nth-prime search below `start` ran out of primes (there is none < 2).
    NthPrimeUnderflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRange(msg) => write!(f, "out of range: {}", msg),
            Error::Overflow { prime, width } => {
                write!(f, "prime {} does not fit in {}", prime, width)
            }
            Error::Resource(msg) => write!(f, "resource limit: {}", msg),
            Error::Argument(msg) => write!(f, "invalid argument: {}", msg),
            Error::NthPrimeUnderflow => {
                write!(f, "nth prime < 2 is impossible, n is too small")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_failure() {
        let e = Error::OutOfRange("start 10 > stop 5".into());
        assert!(e.to_string().contains("out of range"));

        let e = Error::Overflow { prime: 65537, width: "u16" };
        assert!(e.to_string().contains("65537"));
        assert!(e.to_string().contains("u16"));

        assert!(Error::NthPrimeUnderflow.to_string().contains("too small"));
    }

    #[test]
    fn error_is_std_error() {
        fn takes_std_error(_: &dyn std::error::Error) {}
        takes_std_error(&Error::NthPrimeUnderflow);
    }
}
