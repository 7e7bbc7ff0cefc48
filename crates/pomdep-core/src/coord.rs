//! Maven artifact coordinates and the dependency scope algebra.
//!
//! A coordinate is the `(group, artifact, version, type, scope)` 5-tuple.
//! The colon form accepts 1 to 5 segments:
//! `group[:artifact[:version[:scope]]]` or the full
//! `group:artifact:type:version:scope` (the type segment is dropped).

use std::fmt;

use indexmap::IndexMap;
use pomdep_util::errors::{PomdepError, PomdepResult};

/// Scope of a dependency that never declared one.
pub const SCOPE_DEFAULT: &str = "default";
/// Canonical form of [`SCOPE_DEFAULT`].
pub const SCOPE_COMPILE: &str = "compile";

/// A Maven artifact coordinate.
///
/// `name` is `group:artifact`, `id` adds the version, and `full` is the
/// complete `group:artifact:type:version:scope` identity used for
/// cross-branch de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coord {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub type_: String,
    pub scope: String,
}

impl Default for Coord {
    fn default() -> Self {
        Self {
            group: String::new(),
            artifact: String::new(),
            version: String::new(),
            type_: "jar".to_string(),
            scope: SCOPE_DEFAULT.to_string(),
        }
    }
}

impl Coord {
    /// Build a coordinate from explicit fields. An empty scope falls back
    /// to [`SCOPE_DEFAULT`].
    pub fn new(group: &str, artifact: &str, version: &str, scope: &str) -> Self {
        Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
            type_: "jar".to_string(),
            scope: if scope.is_empty() {
                SCOPE_DEFAULT.to_string()
            } else {
                scope.to_string()
            },
        }
    }

    /// Parse a colon-form coordinate string.
    ///
    /// A single segment duplicates into both group and artifact. Five
    /// segments carry a type at index 2, which is discarded.
    pub fn parse(coord: &str) -> Self {
        let mut parts: Vec<&str> = coord.split(':').collect();
        if parts.len() == 1 {
            parts.push(parts[0]);
        }
        if parts.len() == 5 {
            parts.remove(2);
        }

        Self {
            group: parts[0].to_string(),
            artifact: parts[1].to_string(),
            version: parts.get(2).copied().unwrap_or("").to_string(),
            type_: "jar".to_string(),
            scope: parts.get(3).copied().unwrap_or(SCOPE_DEFAULT).to_string(),
        }
    }

    /// `group:artifact`.
    pub fn name(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }

    /// `group:artifact:version`.
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.group, self.artifact, self.version)
    }

    /// `group:artifact:type:version:scope`.
    pub fn full(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.group, self.artifact, self.type_, self.version, self.scope
        )
    }

    /// A coordinate is empty when group or artifact is missing.
    pub fn is_empty(&self) -> bool {
        self.group.is_empty() || self.artifact.is_empty()
    }

    /// Replace every `${key}` reference in group, artifact and version.
    /// Unbound references are left literal.
    pub fn expand(&mut self, properties: &IndexMap<String, String>) {
        for (key, value) in properties {
            let needle = format!("${{{key}}}");
            self.group = self.group.replace(&needle, value);
            self.artifact = self.artifact.replace(&needle, value);
            self.version = self.version.replace(&needle, value);
        }
    }

    /// Canonicalize the scope in place (`default` becomes `compile`).
    pub fn canonicalize(&mut self) {
        self.scope = canonical_scope(&self.scope).to_string();
    }

    /// Whether this coordinate matches `pattern`.
    ///
    /// Trailing empty colon-fields are ignored, so a `group:artifact`
    /// pattern matches any version while a fully qualified pattern only
    /// matches the identical id. This is how exclusion patterns work.
    pub fn is_contained(&self, pattern: &Coord) -> bool {
        let own = self.id();
        let own = own.trim_matches(':');
        let other = pattern.id();
        let other = other.trim_matches(':');

        own == other || self.name() == other
    }

    /// Whether this coordinate matches any pattern in `patterns`.
    pub fn is_contained_in(&self, patterns: &[Coord]) -> bool {
        patterns.iter().any(|p| self.is_contained(p))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Canonical form of a scope string: `default` maps to `compile`,
/// everything else is returned unchanged.
pub fn canonical_scope(scope: &str) -> &str {
    if scope == SCOPE_DEFAULT {
        SCOPE_COMPILE
    } else {
        scope
    }
}

/// The five canonical scopes, in table order.
const SCOPES: [&str; 5] = ["compile", "provided", "runtime", "system", "test"];

/// Winning scope per `(row, column)` pair of [`SCOPES`].
const SCOPE_TABLE: [[&str; 5]; 5] = [
    // compile vs ...
    ["compile", "compile", "compile", "compile", "compile"],
    // provided vs ...
    ["compile", "provided", "runtime", "provided", "provided"],
    // runtime vs ...
    ["compile", "runtime", "runtime", "runtime", "runtime"],
    // system vs ...
    ["compile", "system", "system", "system", "test"],
    // test vs ...
    ["compile", "test", "runtime", "test", "test"],
];

/// The winning scope when two dependencies on the same artifact carry
/// different scopes.
///
/// Both inputs are canonicalized first. The table is fixed over the five
/// Maven scopes; an unrecognized scope is a resolution error.
pub fn scope_conflict(scope1: &str, scope2: &str) -> PomdepResult<&'static str> {
    let s1 = canonical_scope(scope1);
    let s2 = canonical_scope(scope2);

    let row = SCOPES.iter().position(|s| *s == s1);
    let col = SCOPES.iter().position(|s| *s == s2);
    match (row, col) {
        (Some(row), Some(col)) => Ok(SCOPE_TABLE[row][col]),
        _ => Err(PomdepError::Resolution {
            message: format!("unknown scope pair: '{s1}' vs '{s2}'"),
        }
        .into()),
    }
}
