//! The POM model: project coordinate, parent reference, dependency trees,
//! properties, and conditional profiles.
//!
//! Resolution is destructive by design; callers that want to reuse a
//! model clone it first.

use indexmap::IndexMap;
use pomdep_core::coord::Coord;
use pomdep_resolver::tree::{DepTree, ScopeFilter};
use pomdep_resolver::version;
use pomdep_util::errors::PomdepResult;

/// JDK version assumed when the caller does not provide one.
pub const DEFAULT_JDK_VERSION: &str = "1.9";

/// Property expansion stops after this many passes, so mutually
/// recursive properties terminate (their references stay literal).
const MAX_EXPANSION_PASSES: usize = 20;

/// A parsed project descriptor, possibly merged with its ancestors.
#[derive(Debug, Clone)]
pub struct Pom {
    pub coord: Coord,
    pub parent: Coord,
    pub deps: DepTree,
    pub deps_mgmt: DepTree,
    pub properties: IndexMap<String, String>,
    pub profiles: Vec<Profile>,
}

impl Default for Pom {
    fn default() -> Self {
        Self::new()
    }
}

impl Pom {
    pub fn new() -> Self {
        let mut properties = IndexMap::new();
        properties.insert("jdk".to_string(), DEFAULT_JDK_VERSION.to_string());
        Self {
            coord: Coord::default(),
            parent: Coord::default(),
            deps: DepTree::default(),
            deps_mgmt: DepTree::default(),
            properties,
            profiles: Vec::new(),
        }
    }

    pub fn set_property(&mut self, key: &str, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    /// Merge another model into this one, used for parent chaining.
    /// Dependencies and dependency management are appended deep-copied
    /// (same-name entries replaced), properties overwritten key by key,
    /// profiles appended.
    pub fn merge(&mut self, other: &Pom) {
        self.deps.merge(&other.deps);
        self.deps_mgmt.merge(&other.deps_mgmt);
        for (key, value) in &other.properties {
            self.properties.insert(key.clone(), value.clone());
        }
        self.profiles.extend(other.profiles.iter().cloned());
    }

    /// Produce the effective dependency set:
    /// activate profiles, expand properties, apply dependency-management
    /// overrides, and run the tree resolver.
    pub fn resolve(
        &mut self,
        scope: &ScopeFilter,
        skip_optional: bool,
        jdk_version: Option<&str>,
    ) -> PomdepResult<()> {
        if let Some(jdk) = jdk_version {
            self.set_property("jdk", jdk);
        }

        self.apply_profiles();
        self.expand();

        self.deps.update_versions_and_scope(&self.deps_mgmt.root);
        self.deps.resolve(scope, skip_optional)
    }

    /// Expand all property references: seed the `project.*` built-ins,
    /// run properties to their fixed point, then substitute into both
    /// dependency trees.
    pub fn expand(&mut self) {
        self.properties
            .insert("project.groupId".to_string(), self.coord.group.clone());
        self.properties
            .insert("project.artifactId".to_string(), self.coord.artifact.clone());
        self.properties
            .insert("project.version".to_string(), self.coord.version.clone());

        self.expand_properties();

        self.deps.expand(&self.properties);
        self.deps_mgmt.expand(&self.properties);
    }

    /// Overlay every active profile, then drop the profile list.
    fn apply_profiles(&mut self) {
        let profiles = std::mem::take(&mut self.profiles);
        for profile in profiles {
            if !profile.is_active(&self.properties) {
                continue;
            }
            self.deps.merge(&profile.deps);
            self.deps_mgmt.merge(&profile.deps_mgmt);
            for (key, value) in profile.properties {
                self.properties.insert(key, value);
            }
        }
    }

    /// Rewrite property values until none of them changes anymore.
    fn expand_properties(&mut self) {
        for _ in 0..MAX_EXPANSION_PASSES {
            let snapshot = self.properties.clone();
            let mut changed = false;

            for value in self.properties.values_mut() {
                if !value.contains("${") {
                    continue;
                }
                let mut next = value.clone();
                for (key, replacement) in &snapshot {
                    next = next.replace(&format!("${{{key}}}"), replacement);
                }
                if next != *value {
                    *value = next;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }
    }
}

/// A conditional overlay of dependencies, dependency management and
/// properties.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub activation: Activation,
    pub deps: DepTree,
    pub deps_mgmt: DepTree,
    pub properties: IndexMap<String, String>,
}

/// The recognized activation conditions of a profile.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    pub active_by_default: Option<String>,
    pub jdk: Option<String>,
    pub property_name: Option<String>,
    pub property_value: Option<String>,
}

impl Profile {
    /// Whether this profile applies given the current properties.
    pub fn is_active(&self, properties: &IndexMap<String, String>) -> bool {
        if self
            .activation
            .active_by_default
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return true;
        }

        if let (Some(condition), Some(jdk)) =
            (self.activation.jdk.as_deref(), properties.get("jdk"))
        {
            if jdk_condition_matches(jdk, condition) {
                return true;
            }
        }

        if let Some(name) = self.activation.property_name.as_deref() {
            if let Some(value) = properties.get(name) {
                let expected = self.activation.property_value.as_deref().unwrap_or("");
                if value.trim() == expected.trim() {
                    return true;
                }
            }
        }

        false
    }
}

/// A bracketed condition is a version range; a bare one is an exact,
/// case-insensitive match.
fn jdk_condition_matches(jdk: &str, condition: &str) -> bool {
    if condition.contains(['[', ']', '(', ')']) {
        version::satisfies(jdk, condition)
    } else {
        jdk.trim().eq_ignore_ascii_case(condition.trim())
    }
}
