//!
//! Utility module for wallet connection.
//!
//! Re-exports formatting helpers used for logging and display.
/// Utility functions for formatting and display
pub mod index;

pub use index::format_address;
