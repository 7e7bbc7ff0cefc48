//! Version pinning database.
//!
//! Maps `group:artifact` names to the version they should resolve to. The
//! map can be seeded from the text output of
//! `mvn dependency:tree -DoutputType=text -Doutput=deps.txt` (with the
//! first line, the project itself, commented out).

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use pomdep_util::errors::{PomdepError, PomdepResult};

use crate::coord::Coord;

/// Characters of the tree-drawing prefix that `mvn dependency:tree` puts
/// in front of each coordinate line.
const TREE_PREFIX_CHARS: [char; 6] = ['=', '|', '+', '-', '\\', ' '];

/// In-memory pinning map from `group:artifact` to a version, with a
/// deduplicating warning set for conflicting registrations.
#[derive(Debug, Clone, Default)]
pub struct VersionDb {
    db: IndexMap<String, String>,
    warned: HashSet<String>,
}

impl VersionDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a database from a dependency dump file.
    pub fn from_file(path: &Path) -> PomdepResult<Self> {
        let mut db = Self::new();
        db.parse_file(path)?;
        Ok(db)
    }

    /// Ingest a dependency dump file into this database.
    ///
    /// Lines starting with `#` and blank lines are skipped; every other
    /// line is stripped of its tree-drawing prefix and registered.
    pub fn parse_file(&mut self, path: &Path) -> PomdepResult<()> {
        let content = std::fs::read_to_string(path).map_err(PomdepError::Io)?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let coord = Coord::parse(line.trim_start_matches(TREE_PREFIX_CHARS));
            self.register(&coord);
        }
        Ok(())
    }

    /// Register a coordinate's version under its name.
    ///
    /// If the name is already pinned to a different version, a one-time
    /// warning is emitted and the returned coordinate carries the pinned
    /// version instead; the database keeps its first registration.
    pub fn register(&mut self, coord: &Coord) -> Coord {
        let name = coord.name();
        if let Some(existing) = self.db.get(&name).cloned() {
            if existing != coord.version {
                self.warn_once(&coord.id(), &existing);
                let mut pinned = coord.clone();
                pinned.version = existing;
                return pinned;
            }
        } else {
            self.db.insert(name, coord.version.clone());
        }
        coord.clone()
    }

    /// Complete a coordinate with the pinned version for its name, or
    /// `None` if the name is not pinned.
    pub fn find(&self, coord: &Coord) -> Option<Coord> {
        let version = self.version_for(&coord.group, &coord.artifact)?;
        if version.is_empty() {
            return None;
        }
        let mut found = coord.clone();
        found.version = version.to_string();
        Some(found)
    }

    /// [`find`](Self::find), registering the coordinate when it is absent.
    pub fn find_or_register(&mut self, coord: &Coord) -> Coord {
        match self.find(coord) {
            Some(found) => found,
            None => self.register(coord),
        }
    }

    /// Pinned version for a `group:artifact` pair.
    pub fn version_for(&self, group: &str, artifact: &str) -> Option<&str> {
        self.db.get(&format!("{group}:{artifact}")).map(String::as_str)
    }

    /// Whether a `group:artifact` pair is pinned.
    pub fn contains(&self, group: &str, artifact: &str) -> bool {
        self.version_for(group, artifact).is_some()
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    fn warn_once(&mut self, id: &str, expected: &str) {
        if !self.warned.insert(id.to_string()) {
            return;
        }
        tracing::warn!(
            "unhandled dependency conflict for {id} (expecting version '{expected}')"
        );
    }
}
