//! Rooted dependency trees and the destructive multi-pass resolver.
//!
//! A tree is rooted at a synthetic node carrying the project's own
//! coordinate. Resolution runs three passes over the tree:
//!
//! 1. exclusions, scope filtering, optional filtering, and per-parent
//!    sibling conflicts (exclusion maps are copied on descent so a
//!    subtree's exclusions never leak to its siblings);
//! 2. cross-tree version reconciliation: one winning `full` id per
//!    `group:artifact` name, everything else pruned;
//! 3. de-duplication: each `full` id survives on at most one branch,
//!    earlier branches first.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use pomdep_core::coord::{self, Coord, SCOPE_DEFAULT};
use pomdep_util::errors::{PomdepError, PomdepResult};

use crate::conflict::resolve_conflict;

/// Which dependency scopes a resolve pass accepts.
///
/// Scopes are compared in canonical form, so `default` children pass a
/// `compile` filter.
#[derive(Debug, Clone, Default)]
pub enum ScopeFilter {
    /// Accept every scope.
    #[default]
    Any,
    /// Accept only the scopes in the set.
    AnyOf(HashSet<String>),
}

impl ScopeFilter {
    /// Accept a single scope.
    pub fn only(scope: &str) -> Self {
        Self::any_of([scope])
    }

    /// Accept any of the given scopes.
    pub fn any_of<'a, I>(scopes: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::AnyOf(
            scopes
                .into_iter()
                .map(|s| coord::canonical_scope(s).to_string())
                .collect(),
        )
    }

    pub fn matches(&self, scope: &str) -> bool {
        match self {
            Self::Any => true,
            Self::AnyOf(set) => set.contains(coord::canonical_scope(scope)),
        }
    }
}

/// A single dependency with its transitive children and the exclusion
/// patterns declared on it.
#[derive(Debug, Clone, Default)]
pub struct DepNode {
    pub coord: Coord,
    pub optional: bool,
    pub deps: Vec<DepNode>,
    pub exclusions: Vec<Coord>,
}

impl DepNode {
    pub fn new(coord: Coord) -> Self {
        Self {
            coord,
            ..Default::default()
        }
    }

    pub fn with_optional(coord: Coord, optional: bool) -> Self {
        Self {
            coord,
            optional,
            ..Default::default()
        }
    }

    /// Append a child. Two children may not share a `group:artifact` name.
    pub fn add(&mut self, dep: DepNode) -> PomdepResult<()> {
        if self
            .deps
            .iter()
            .any(|d| d.coord.name() == dep.coord.name())
        {
            return Err(PomdepError::Resolution {
                message: format!(
                    "conflicting versions while adding dependency: {}",
                    dep.coord
                ),
            }
            .into());
        }
        self.deps.push(dep);
        Ok(())
    }

    /// Append a child, replacing any existing child with the same name.
    pub fn add_override(&mut self, dep: DepNode) {
        self.deps.retain(|d| d.coord.name() != dep.coord.name());
        self.deps.push(dep);
    }

    /// Depth-first search by coordinate id.
    pub fn find(&self, coord: &Coord) -> Option<&DepNode> {
        if self.coord.id() == coord.id() {
            return Some(self);
        }
        self.deps.iter().find_map(|d| d.find(coord))
    }

    /// Substitute `${key}` references in every coordinate of the subtree.
    pub fn expand(&mut self, properties: &IndexMap<String, String>) {
        self.coord.expand(properties);
        for dep in &mut self.deps {
            dep.expand(properties);
        }
    }

    /// Number of nodes in the subtree, this one included. Duplicates and
    /// optional nodes all count.
    pub fn count(&self) -> usize {
        1 + self.deps.iter().map(DepNode::count).sum::<usize>()
    }

    /// Record an exclusion pattern; matched descendants are dropped on
    /// the next resolve.
    pub fn add_exclusion(&mut self, pattern: Coord) {
        self.exclusions.push(pattern);
    }

    /// Pre-order list of all descendants. The node itself is not
    /// included.
    pub fn flatten(&self, skip_optional: bool) -> Vec<&DepNode> {
        let mut flat = Vec::new();
        for child in &self.deps {
            if skip_optional && child.optional {
                continue;
            }
            flat.push(child);
            flat.extend(child.flatten(skip_optional));
        }
        flat
    }

    /// Apply dependency-management overrides to the subtree: fill empty
    /// versions, replace `default` scopes, and take over the managed
    /// entry's exclusions.
    pub fn update_versions_and_scope(&mut self, managed: &DepNode) {
        for entry in &managed.deps {
            if self.coord.name() == entry.coord.name() {
                if self.coord.version.is_empty() {
                    self.coord.version = entry.coord.version.clone();
                }
                if self.coord.scope == SCOPE_DEFAULT {
                    self.coord.scope = entry.coord.scope.clone();
                }
                self.exclusions.extend(entry.exclusions.iter().cloned());
            }
        }
        for dep in &mut self.deps {
            dep.update_versions_and_scope(managed);
        }
    }

    /// Pass 1: exclusions, scope filter, optional filter, and sibling
    /// conflicts. `excluded` is owned: every recursion level works on its
    /// own copy so exclusions stay scoped to their subtree.
    fn apply_exclusions(
        &mut self,
        mut excluded: IndexMap<String, Coord>,
        scope: &ScopeFilter,
        skip_optional: bool,
    ) -> PomdepResult<()> {
        self.coord.canonicalize();

        for pattern in &self.exclusions {
            excluded.insert(pattern.name(), pattern.clone());
        }

        let mut kept: IndexMap<String, DepNode> = IndexMap::new();
        for dep in std::mem::take(&mut self.deps) {
            if !scope.matches(&dep.coord.scope) {
                continue;
            }
            if skip_optional && dep.optional {
                continue;
            }
            // Any name match consumes the exclusion, whatever the
            // pattern's version says.
            if excluded.contains_key(&dep.coord.name()) {
                continue;
            }

            let name = dep.coord.name();
            match kept.get(&name) {
                Some(existing) => {
                    let winner = resolve_dep_conflict(dep, existing.clone())?;
                    kept.insert(name, winner);
                }
                None => {
                    kept.insert(name, dep);
                }
            }
        }

        self.deps = kept.into_values().collect();
        for dep in &mut self.deps {
            dep.apply_exclusions(excluded.clone(), scope, skip_optional)?;
        }
        self.exclusions.clear();
        Ok(())
    }

    /// Pass 2 pruning: drop every node whose `full` id lost the
    /// per-name election.
    fn retain_winners(&mut self, winners: &HashMap<String, String>) {
        self.deps.retain(|dep| {
            winners
                .get(&dep.coord.name())
                .map_or(true, |winner| *winner == dep.coord.full())
        });
        for dep in &mut self.deps {
            dep.retain_winners(winners);
        }
    }

    /// Pass 3: keep the first occurrence of every `full` id, depth
    /// first, and drop later branches wholesale.
    fn dedupe(&mut self, seen: &mut HashSet<String>) {
        let children = std::mem::take(&mut self.deps);
        for mut child in children {
            if seen.insert(child.coord.full()) {
                child.dedupe(seen);
                self.deps.push(child);
            }
        }
    }
}

/// Resolve a sibling conflict between two dependency nodes of the same
/// name. The surviving node takes the conflict-table scope.
fn resolve_dep_conflict(new: DepNode, existing: DepNode) -> PomdepResult<DepNode> {
    let winning_scope = coord::scope_conflict(&new.coord.scope, &existing.coord.scope)?.to_string();
    let new_wins = std::ptr::eq(
        resolve_conflict(&new.coord, &existing.coord)?,
        &new.coord,
    );
    let mut winner = if new_wins { new } else { existing };
    winner.coord.scope = winning_scope;
    Ok(winner)
}

/// Pass 2 election: reduce all coordinates sharing a name to one winning
/// `full` id.
fn collect_winners(
    root: &DepNode,
    skip_optional: bool,
) -> PomdepResult<HashMap<String, String>> {
    let mut best: IndexMap<String, Coord> = IndexMap::new();
    for node in root.flatten(skip_optional) {
        let name = node.coord.name();
        match best.get(&name) {
            Some(current) => {
                let winner = resolve_conflict(current, &node.coord)?.clone();
                best.insert(name, winner);
            }
            None => {
                best.insert(name, node.coord.clone());
            }
        }
    }
    Ok(best
        .into_iter()
        .map(|(name, coord)| (name, coord.full()))
        .collect())
}

/// A dependency tree rooted at the owning project's coordinate.
#[derive(Debug, Clone, Default)]
pub struct DepTree {
    pub root: DepNode,
}

impl DepTree {
    pub fn new(coord: Coord) -> Self {
        Self {
            root: DepNode::new(coord),
        }
    }

    /// Number of dependencies, the root excluded.
    pub fn count(&self) -> usize {
        self.root.count() - 1
    }

    pub fn add(&mut self, dep: DepNode) -> PomdepResult<()> {
        self.root.add(dep)
    }

    pub fn add_override(&mut self, dep: DepNode) {
        self.root.add_override(dep)
    }

    pub fn find(&self, coord: &Coord) -> Option<&DepNode> {
        self.root.find(coord)
    }

    /// Merge another tree's top-level dependencies into this one,
    /// deep-copied, replacing same-name entries.
    pub fn merge(&mut self, other: &DepTree) {
        for dep in &other.root.deps {
            self.root.add_override(dep.clone());
        }
    }

    pub fn expand(&mut self, properties: &IndexMap<String, String>) {
        self.root.expand(properties);
    }

    pub fn update_versions_and_scope(&mut self, managed: &DepNode) {
        self.root.update_versions_and_scope(managed);
    }

    /// Run the three resolution passes. Destructive: the tree afterwards
    /// holds only the effective dependency set.
    pub fn resolve(&mut self, scope: &ScopeFilter, skip_optional: bool) -> PomdepResult<()> {
        self.root
            .apply_exclusions(IndexMap::new(), scope, skip_optional)?;

        let winners = collect_winners(&self.root, skip_optional)?;
        self.root.retain_winners(&winners);

        let mut seen = HashSet::new();
        self.root.dedupe(&mut seen);
        Ok(())
    }

    pub fn flatten(&self, skip_optional: bool) -> Vec<&DepNode> {
        self.root.flatten(skip_optional)
    }

    pub fn flatten_coords(&self, skip_optional: bool) -> Vec<Coord> {
        self.root
            .flatten(skip_optional)
            .into_iter()
            .map(|d| d.coord.clone())
            .collect()
    }

    pub fn flatten_ids(&self, skip_optional: bool) -> Vec<String> {
        self.root
            .flatten(skip_optional)
            .into_iter()
            .map(|d| d.coord.id())
            .collect()
    }

    pub fn flatten_full_ids(&self, skip_optional: bool) -> Vec<String> {
        self.root
            .flatten(skip_optional)
            .into_iter()
            .map(|d| d.coord.full())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(coord: &str) -> DepNode {
        DepNode::new(Coord::parse(coord))
    }

    #[test]
    fn add_rejects_duplicate_names() {
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.add(node("B:B:1")).unwrap();
        assert!(tree.add(node("B:B:2")).is_err());
    }

    #[test]
    fn add_override_replaces_same_name() {
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.add(node("B:B:1")).unwrap();
        tree.add_override(node("B:B:2"));
        assert_eq!(tree.count(), 1);
        assert_eq!(tree.flatten_ids(true), ["B:B:2"]);
    }

    #[test]
    fn count_and_flatten_include_duplicates() {
        let mut b = node("B:B:1");
        b.deps.push(node("C:C:1"));
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(b);
        tree.root.deps.push(node("C:C:1"));

        assert_eq!(tree.count(), 3);
        assert_eq!(tree.flatten_ids(true), ["B:B:1", "C:C:1", "C:C:1"]);
    }

    #[test]
    fn flatten_skips_optional() {
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(node("B:B:1"));
        tree.root
            .deps
            .push(DepNode::with_optional(Coord::parse("O:O:1"), true));

        assert_eq!(tree.flatten_ids(true), ["B:B:1"]);
        assert_eq!(tree.flatten_ids(false), ["B:B:1", "O:O:1"]);
    }

    #[test]
    fn find_searches_depth_first() {
        let mut b = node("B:B:1");
        b.deps.push(node("C:C:1"));
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(b);

        assert!(tree.find(&Coord::parse("C:C:1")).is_some());
        assert!(tree.find(&Coord::parse("C:C:2")).is_none());
    }

    #[test]
    fn merge_deep_copies_and_overrides() {
        let mut left = DepTree::new(Coord::parse("A:A:1"));
        left.root.deps.push(node("B:B:1"));

        let mut right = DepTree::new(Coord::parse("P:P:1"));
        right.root.deps.push(node("B:B:9"));
        right.root.deps.push(node("C:C:1"));

        left.merge(&right);
        assert_eq!(left.flatten_ids(true), ["B:B:9", "C:C:1"]);
        // the source tree is untouched
        assert_eq!(right.flatten_ids(true), ["B:B:9", "C:C:1"]);
    }

    #[test]
    fn expand_walks_the_whole_tree() {
        let mut props = IndexMap::new();
        props.insert("v".to_string(), "7.7".to_string());

        let mut b = node("B:B:${v}");
        b.deps.push(node("C:C:${v}"));
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(b);

        tree.expand(&props);
        assert_eq!(tree.flatten_ids(true), ["B:B:7.7", "C:C:7.7"]);
    }

    #[test]
    fn management_fills_version_scope_and_exclusions() {
        let mut managed = DepNode::new(Coord::parse("A:A:1"));
        let mut entry = node("B:B:3.3:test");
        entry.add_exclusion(Coord::parse("X:X"));
        managed.deps.push(entry);

        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(node("B:B"));

        tree.update_versions_and_scope(&managed);
        let b = &tree.root.deps[0];
        assert_eq!(b.coord.id(), "B:B:3.3");
        assert_eq!(b.coord.scope, "test");
        assert_eq!(b.exclusions.len(), 1);
    }

    #[test]
    fn management_does_not_override_explicit_fields() {
        let mut managed = DepNode::new(Coord::parse("A:A:1"));
        managed.deps.push(node("B:B:3.3:test"));

        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(node("B:B:1.0:runtime"));

        tree.update_versions_and_scope(&managed);
        let b = &tree.root.deps[0];
        assert_eq!(b.coord.id(), "B:B:1.0");
        assert_eq!(b.coord.scope, "runtime");
    }

    #[test]
    fn resolve_canonicalizes_scopes() {
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(node("B:B:1"));
        tree.resolve(&ScopeFilter::Any, true).unwrap();

        assert_eq!(tree.flatten_full_ids(true), ["B:B:jar:1:compile"]);
    }

    #[test]
    fn resolve_sibling_conflict_keeps_higher_version() {
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(node("B:B:1.0"));
        tree.root.deps.push(node("B:B:2.0"));
        tree.resolve(&ScopeFilter::Any, true).unwrap();

        assert_eq!(tree.flatten_ids(true), ["B:B:2.0"]);
    }

    #[test]
    fn resolve_sibling_conflict_empty_version_loses() {
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(node("B:B"));
        tree.root.deps.push(node("B:B:1.5"));
        tree.resolve(&ScopeFilter::Any, true).unwrap();

        assert_eq!(tree.flatten_ids(true), ["B:B:1.5"]);
    }

    #[test]
    fn resolve_unresolvable_conflict_fails() {
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(node("B:B:[1.0]"));
        tree.root.deps.push(node("B:B:2.0"));

        assert!(tree.resolve(&ScopeFilter::Any, true).is_err());
    }

    #[test]
    fn resolve_consumes_exclusions() {
        let mut b = node("B:B:1");
        b.add_exclusion(Coord::parse("C:C"));
        b.deps.push(node("C:C:1"));
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(b);

        tree.resolve(&ScopeFilter::Any, true).unwrap();
        assert_eq!(tree.flatten_ids(true), ["B:B:1"]);
        assert!(tree.root.deps[0].exclusions.is_empty());
    }

    #[test]
    fn exclusions_do_not_leak_to_siblings() {
        // B excludes C, but the sibling branch keeps its own C.
        let mut b = node("B:B:1");
        b.add_exclusion(Coord::parse("C:C"));
        b.deps.push(node("C:C:1"));
        let mut d = node("D:D:1");
        d.deps.push(node("C:C:1"));

        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(b);
        tree.root.deps.push(d);

        tree.resolve(&ScopeFilter::Any, true).unwrap();
        assert_eq!(tree.flatten_ids(true), ["B:B:1", "D:D:1", "C:C:1"]);
    }

    #[test]
    fn exclusion_matches_by_name_regardless_of_version() {
        let mut b = node("B:B:1");
        b.add_exclusion(Coord::parse("C:C:9.9"));
        b.deps.push(node("C:C:1.0"));
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(b);

        tree.resolve(&ScopeFilter::Any, true).unwrap();
        assert_eq!(tree.flatten_ids(true), ["B:B:1"]);
    }

    #[test]
    fn resolve_dedupes_across_branches() {
        let mut b = node("B:B:1");
        b.deps.push(node("C:C:1"));
        let mut d = node("D:D:1");
        d.deps.push(node("C:C:1"));

        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(b);
        tree.root.deps.push(d);

        tree.resolve(&ScopeFilter::Any, true).unwrap();
        // the earlier branch keeps C, the later one loses it
        assert_eq!(tree.flatten_ids(true), ["B:B:1", "C:C:1", "D:D:1"]);
    }

    #[test]
    fn resolve_reconciles_versions_across_branches() {
        let mut b = node("B:B:1");
        b.deps.push(node("C:C:1.0"));
        let mut d = node("D:D:1");
        d.deps.push(node("C:C:2.0"));

        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(b);
        tree.root.deps.push(d);

        tree.resolve(&ScopeFilter::Any, true).unwrap();
        // version algebra decides, not proximity: 2.0 wins everywhere
        assert_eq!(tree.flatten_ids(true), ["B:B:1", "D:D:1", "C:C:2.0"]);
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut b = node("B:B:1");
        b.add_exclusion(Coord::parse("X:X"));
        b.deps.push(node("C:C:1.0:runtime"));
        b.deps.push(node("X:X:1"));
        let mut tree = DepTree::new(Coord::parse("A:A:1"));
        tree.root.deps.push(b);
        tree.root.deps.push(node("C:C:2.0"));

        tree.resolve(&ScopeFilter::Any, true).unwrap();
        let first = tree.flatten_full_ids(true);

        tree.resolve(&ScopeFilter::Any, true).unwrap();
        assert_eq!(tree.flatten_full_ids(true), first);
    }

    #[test]
    fn scope_filter_canonicalizes() {
        assert!(ScopeFilter::only("compile").matches("default"));
        assert!(ScopeFilter::Any.matches("anything"));
        assert!(!ScopeFilter::only("compile").matches("test"));
        assert!(ScopeFilter::any_of(["compile", "runtime"]).matches("runtime"));
    }
}
