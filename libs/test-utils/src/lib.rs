//! Shared test utilities for the provider SDK libraries.
//!
//! This crate provides:
//! - Proptest generators for methods, statuses, tokens and headers
//! - Mock reauthenticators and error contexts
//! - Test fixtures with sample resources and configurations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
