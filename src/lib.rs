//! typestack - Regenerate Flow type definitions and keep a patch stack on top
//!
//! typestack runs an external type-translation generator over a fixed set of
//! upstream packages, writing declaration files under `types/<package>/`,
//! and maintains an ordered stack of hand-written patches
//! (`types/patches/*.patch`) on top of the generated output. The patch stack
//! can be unpacked into a pair of git branches for editing and packed back.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Gate → Plan → Execute for every command; unpack/pack; check
//! - [`generate`] - Generator adapter: runs the generator and formatter
//! - [`patch`] - Patch store and the zero-fuzz apply/unapply engine
//! - [`core`] - Domain types, configuration, path layout, naming
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - Output utilities
//!
//! # Correctness Invariants
//!
//! 1. Every precondition is checked before the first mutation
//! 2. All mutations flow through a single executor that stops at the first failure
//! 3. Patches apply with exact context or not at all
//! 4. Writing patches over the same history always yields the same bytes

pub mod cli;
pub mod core;
pub mod engine;
pub mod generate;
pub mod git;
pub mod patch;
pub mod ui;
