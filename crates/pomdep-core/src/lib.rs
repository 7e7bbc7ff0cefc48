//! Core data types for the pomdep resolver.
//!
//! This crate defines Maven artifact coordinates with their scope algebra,
//! and the version pinning database used to complete coordinates that carry
//! no version of their own.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod coord;
pub mod version_db;
