//! Utility modules for Stemma.

pub mod sort;

// Re-export commonly used types
pub use sort::*;
