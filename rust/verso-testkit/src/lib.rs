//! Test utilities and helpers for the Verso decoder.
//!
//! This crate provides:
//! - Fixtures: small phrase tables, models and weight sets used across tests
//! - Data generation for seeded random decoding problems
//! - A brute-force oracle that enumerates every admissible derivation
//! - Temporary files holding phrase tables in text form
//!
//! # Usage
//!
//! This crate is intended for the Verso test suites and development tools only.

pub mod data_gen;
pub mod files;
pub mod fixtures;
pub mod oracle;
