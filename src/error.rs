//! Error types for the Stemma library.
//!
//! All errors are represented by the [`StemmaError`] enum. Compile-time
//! errors (malformed affix files, exhausted ordinal spaces, out-of-order
//! dictionary streams) abort the whole compilation; a successfully compiled
//! dictionary never produces errors at query time.
//!
//! # Examples
//!
//! ```
//! use stemma::error::{Result, StemmaError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(StemmaError::parse(12, "affix rule with fewer than four elements"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Stemma operations.
///
/// This enum represents all possible errors that can occur while compiling
/// or querying a dictionary. It uses the `thiserror` crate for automatic
/// `Error` trait implementation and provides convenient constructor methods
/// for common cases.
#[derive(Error, Debug)]
pub enum StemmaError {
    /// I/O errors while reading affix or dictionary streams
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed directive or rule line in an affix file
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// An interned table would exceed its ordinal space
    #[error("capacity exceeded: too many unique {0}")]
    CapacityExceeded(&'static str),

    /// The word-index merge saw a key smaller than the previously emitted one
    #[error("out of order: {entry} < {previous}")]
    OrderingViolation { entry: String, previous: String },

    /// Numeric flag alias index out of range
    #[error("bad flag alias number: {0}")]
    AliasResolution(usize),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with StemmaError.
pub type Result<T> = std::result::Result<T, StemmaError>;

impl StemmaError {
    /// Create a new parse error at the given line number.
    pub fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        StemmaError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        StemmaError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        StemmaError::Other(msg.into())
    }
}
