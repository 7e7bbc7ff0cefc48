//! End-to-end resolution scenarios over hand-built dependency trees.

use pomdep_core::coord::Coord;
use pomdep_resolver::tree::{DepNode, DepTree, ScopeFilter};

fn node(coord: &str) -> DepNode {
    DepNode::new(Coord::parse(coord))
}

/// A excludes D, B excludes C:
///
/// ```text
/// A -> B -> {C, D, E}       A -> B -> E
/// |                    =>   |
/// +--> C                    +--> C
/// ```
#[test]
fn exclusions_prune_matching_branches() {
    let mut b = node("B:B");
    b.deps.push(node("C:C"));
    b.deps.push(node("D:D"));
    b.deps.push(node("E:E"));
    b.add_exclusion(Coord::parse("C:C"));

    let mut tree = DepTree::new(Coord::parse("A:A"));
    tree.root.deps.push(b);
    tree.root.deps.push(node("C:C"));
    tree.root.add_exclusion(Coord::parse("D:D"));

    assert_eq!(
        tree.flatten_ids(true),
        ["B:B:", "C:C:", "D:D:", "E:E:", "C:C:"]
    );

    tree.resolve(&ScopeFilter::Any, true).unwrap();

    assert_eq!(tree.flatten_ids(true), ["B:B:", "E:E:", "C:C:"]);
}

/// Scope conflict: the test-scoped duplicate of C loses against the
/// compile-scoped one reached through B.
///
/// ```text
/// A -> B(compile) -> C(compile) -> D(compile)
/// |
/// +--> C(test)
/// ```
#[test]
fn scope_conflict_keeps_compile_branch() {
    let mut c = node("C:C:jar:1:compile");
    c.deps.push(node("D:D:jar:1:compile"));
    let mut b = node("B:B:jar:1:compile");
    b.deps.push(c);

    let mut tree = DepTree::new(Coord::parse("A:A:jar:1:compile"));
    tree.root.deps.push(b);
    tree.root.deps.push(node("C:C:jar:1:test"));

    assert_eq!(
        tree.flatten_full_ids(true),
        [
            "B:B:jar:1:compile",
            "C:C:jar:1:compile",
            "D:D:jar:1:compile",
            "C:C:jar:1:test"
        ]
    );

    tree.resolve(&ScopeFilter::only("compile"), true).unwrap();

    assert_eq!(
        tree.flatten_full_ids(true),
        ["B:B:jar:1:compile", "C:C:jar:1:compile", "D:D:jar:1:compile"]
    );
}

/// Inverse scope conflict: C is test-scoped under B, so the whole
/// subtree below it (including compile-scoped D) is dropped by the
/// scope filter, and only the direct compile C survives.
///
/// ```text
/// A -> B(compile) -> C(test) -> D(compile)
/// |
/// +--> C(compile)
/// ```
#[test]
fn scope_conflict_inverse_drops_filtered_subtree() {
    let mut ct = node("C:C:jar:1:test");
    ct.deps.push(node("D:D:jar:1:compile"));
    let mut b = node("B:B:jar:1:compile");
    b.deps.push(ct);

    let mut tree = DepTree::new(Coord::parse("A:A:jar:1:compile"));
    tree.root.deps.push(b);
    tree.root.deps.push(node("C:C:jar:1:compile"));

    tree.resolve(&ScopeFilter::only("compile"), true).unwrap();

    assert_eq!(
        tree.flatten_full_ids(true),
        ["B:B:jar:1:compile", "C:C:jar:1:compile"]
    );
}

/// Optional dependencies are dropped unless the resolve keeps them.
#[test]
fn optional_dependencies_are_filtered() {
    let mut b = node("B:B:1");
    b.deps
        .push(DepNode::with_optional(Coord::parse("O:O:1"), true));

    let mut tree = DepTree::new(Coord::parse("A:A:1"));
    tree.root.deps.push(b);

    let mut kept = tree.clone();
    kept.resolve(&ScopeFilter::Any, false).unwrap();
    assert_eq!(kept.flatten_ids(false), ["B:B:1", "O:O:1"]);

    tree.resolve(&ScopeFilter::Any, true).unwrap();
    assert_eq!(tree.flatten_ids(true), ["B:B:1"]);
}

/// Version reconciliation is global: the nearest occurrence does not
/// win, the version algebra does.
#[test]
fn version_winner_is_not_decided_by_depth() {
    let mut c = node("C:C:1");
    c.deps.push(node("D:D:2.0"));
    let mut b = node("B:B:1");
    b.deps.push(c);
    let mut e = node("E:E:1");
    e.deps.push(node("D:D:1.0"));

    let mut tree = DepTree::new(Coord::parse("A:A:1"));
    tree.root.deps.push(b);
    tree.root.deps.push(e);

    tree.resolve(&ScopeFilter::Any, true).unwrap();

    // 2.0 beats 1.0 even though 1.0 sits closer to the root
    assert_eq!(
        tree.flatten_ids(true),
        ["B:B:1", "C:C:1", "D:D:2.0", "E:E:1"]
    );
}

/// Each `full` coordinate survives on exactly one branch.
#[test]
fn duplicates_collapse_to_first_branch() {
    let shared = "X:X:1.0";
    let mut b = node("B:B:1");
    b.deps.push(node(shared));
    let mut c = node("C:C:1");
    c.deps.push(node(shared));
    let mut d = node("D:D:1");
    d.deps.push(node(shared));

    let mut tree = DepTree::new(Coord::parse("A:A:1"));
    tree.root.deps.push(b);
    tree.root.deps.push(c);
    tree.root.deps.push(d);

    tree.resolve(&ScopeFilter::Any, true).unwrap();

    assert_eq!(
        tree.flatten_ids(true),
        ["B:B:1", "X:X:1.0", "C:C:1", "D:D:1"]
    );
}

/// A set-valued scope filter accepts every listed scope.
#[test]
fn scope_filter_accepts_sets() {
    let mut tree = DepTree::new(Coord::parse("A:A:1"));
    tree.root.deps.push(node("B:B:1:compile"));
    tree.root.deps.push(node("C:C:1:runtime"));
    tree.root.deps.push(node("D:D:1:test"));

    tree.resolve(&ScopeFilter::any_of(["compile", "runtime"]), true)
        .unwrap();

    assert_eq!(tree.flatten_ids(true), ["B:B:1", "C:C:1"]);
}

/// An unresolvable sibling conflict aborts the resolve with no partial
/// result visible to the caller.
#[test]
fn unresolvable_conflict_propagates() {
    let mut tree = DepTree::new(Coord::parse("A:A:1"));
    tree.root.deps.push(node("B:B:[1.0]"));
    tree.root.deps.push(node("B:B:[2.0]"));

    let err = tree.resolve(&ScopeFilter::Any, true).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("conflict"));
}

/// Resolving an already-resolved tree changes nothing.
#[test]
fn resolve_twice_is_stable() {
    let mut b = node("B:B:1:compile");
    b.deps.push(node("C:C:1.0"));
    b.add_exclusion(Coord::parse("Z:Z"));
    let mut tree = DepTree::new(Coord::parse("A:A:1"));
    tree.root.deps.push(b);
    tree.root.deps.push(node("C:C:2.0"));

    tree.resolve(&ScopeFilter::only("compile"), true).unwrap();
    let once = tree.flatten_full_ids(true);

    tree.resolve(&ScopeFilter::only("compile"), true).unwrap();
    assert_eq!(tree.flatten_full_ids(true), once);
}
