//! Terminal interaction for the command-line tool.
//!
//! # Modules
//!
//! - [`display`]: header tables, key dumps, status lines
//! - [`progress`]: progress bar for parallel decryption
//! - [`prompt`]: masked passphrase input

pub mod display;
pub mod progress;
pub mod prompt;
