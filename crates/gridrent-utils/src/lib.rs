//! # GridRent Utils
//!
//! Presentation and input helpers shared by the GridRent command line:
//! currency and duration formatting, wallet address shortening, and parsing
//! of range, memory-size and status arguments.

pub mod errors;
pub mod formatters;
pub mod parsers;

// Re-export common types for convenience
pub use errors::*;
pub use formatters::*;
pub use parsers::*;
