//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Verbosity-aware printing to stdout and stderr
//!
//! # Design
//!
//! Progress narration goes to stdout. Warnings, errors, hints and debug
//! traces go to stderr, so scripts can separate the two streams.

pub mod output;
