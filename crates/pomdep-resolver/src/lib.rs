//! Dependency resolution engine: Maven version ordering and range
//! matching, pairwise conflict reconciliation, and the multi-pass
//! dependency tree resolver (exclusions, scope filtering, optional
//! filtering, duplicate elimination, version-conflict reconciliation).

pub mod conflict;
pub mod tree;
pub mod version;
