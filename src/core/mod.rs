//! core
//!
//! Core domain types, configuration, and path rules for typestack.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, BranchPair, CommitRange
//! - [`naming`] - Patch file naming rules
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized classification of generated and patch paths
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Path classification lives in exactly one place

pub mod config;
pub mod naming;
pub mod paths;
pub mod types;
