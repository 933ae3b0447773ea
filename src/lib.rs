//! # Stemma
//!
//! A Hunspell-compatible morphological stemming library for Rust.
//!
//! Stemma compiles a Hunspell affix file plus one or more dictionary files
//! into compact immutable in-memory tables, then recovers all valid
//! dictionary stems for a query word by recursively stripping affixes under
//! cross-checking rules.
//!
//! ## Features
//!
//! - All three Hunspell flag notations (`FLAG num`, `FLAG long`, default)
//!   and `AF` flag aliases
//! - Prefix/suffix rules with strip text, conditions, continuation classes
//!   and cross-product composition
//! - `COMPLEXPREFIXES`, `CIRCUMFIX`, `IGNORE`, `ICONV`/`OCONV`, `FULLSTRIP`
//!   and `LANG` directives
//! - Disk-backed external sort for arbitrarily large dictionary files
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//!
//! use stemma::dictionary::Dictionary;
//! use stemma::stemmer::Stemmer;
//!
//! # fn main() -> stemma::error::Result<()> {
//! let affix = "SET UTF-8\nSFX A Y 1\nSFX A 0 s .\n";
//! let dic = "2\ncat\nrun/A\n";
//!
//! let dictionary = Dictionary::compile(Cursor::new(affix), vec![Cursor::new(dic)], false)?;
//! let stemmer = Stemmer::new(&dictionary);
//!
//! assert_eq!(stemmer.stem("runs"), vec!["run"]);
//! assert!(stemmer.stem("cats").is_empty());
//! # Ok(())
//! # }
//! ```

pub mod dictionary;
pub mod error;
pub mod stemmer;
pub mod util;

pub use dictionary::Dictionary;
pub use error::{Result, StemmaError};
pub use stemmer::Stemmer;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
