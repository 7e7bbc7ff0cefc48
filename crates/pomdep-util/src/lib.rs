//! Shared utilities for the pomdep resolver.
//!
//! This crate provides the cross-cutting concerns used by all other pomdep
//! crates: the workspace error type and filesystem helpers.

pub mod errors;
pub mod fs;
