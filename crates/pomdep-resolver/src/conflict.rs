//! Pairwise conflict resolution between two coordinates of the same name.

use std::cmp::Ordering;

use pomdep_core::coord::{self, Coord};
use pomdep_util::errors::{PomdepError, PomdepResult};

use crate::version;

/// Pick the surviving coordinate out of two that share a name.
///
/// Versions decide first: on a tie the coordinate carrying the winning
/// scope survives (`first` when scopes also tie). Otherwise the higher
/// version wins if it satisfies the lower one read as a range, else the
/// lower wins if it satisfies the higher. When neither satisfies the
/// other the conflict is unresolvable.
pub fn resolve_conflict<'a>(first: &'a Coord, second: &'a Coord) -> PomdepResult<&'a Coord> {
    let cmp = version::compare(&first.version, &second.version);
    let winning_scope = coord::scope_conflict(&first.scope, &second.scope)?;

    if cmp == Ordering::Equal {
        let s1 = coord::canonical_scope(&first.scope);
        let s2 = coord::canonical_scope(&second.scope);
        if s1 != s2 {
            if s1 == winning_scope {
                return Ok(first);
            }
            return Ok(second);
        }
        return Ok(first);
    }

    if cmp == Ordering::Greater && version::satisfies(&first.version, &second.version) {
        return Ok(first);
    }

    if version::satisfies(&second.version, &first.version) {
        return Ok(second);
    }

    Err(PomdepError::Conflict {
        first: first.id(),
        second: second.id(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_version_wins_when_it_satisfies_lower() {
        let a = Coord::parse("g:a:1.0");
        let b = Coord::parse("g:a:2.0");
        // 2.0 satisfies the bare constraint "1.0" (>= 1.0)
        assert_eq!(resolve_conflict(&a, &b).unwrap().version, "2.0");
        assert_eq!(resolve_conflict(&b, &a).unwrap().version, "2.0");
    }

    #[test]
    fn equal_versions_keep_first() {
        let a = Coord::parse("g:a:1.0");
        let b = Coord::parse("g:a:1.0");
        let winner = resolve_conflict(&a, &b).unwrap();
        assert!(std::ptr::eq(winner, &a));
    }

    #[test]
    fn equal_versions_prefer_winning_scope() {
        let compile = Coord::parse("g:a:1.0:compile");
        let test = Coord::parse("g:a:1.0:test");
        assert_eq!(resolve_conflict(&test, &compile).unwrap().scope, "compile");
        assert_eq!(resolve_conflict(&compile, &test).unwrap().scope, "compile");
    }

    #[test]
    fn empty_version_loses_to_concrete() {
        let unpinned = Coord::parse("g:a");
        let pinned = Coord::parse("g:a:1.5");
        assert_eq!(resolve_conflict(&unpinned, &pinned).unwrap().version, "1.5");
        assert_eq!(resolve_conflict(&pinned, &unpinned).unwrap().version, "1.5");
    }

    #[test]
    fn exact_range_against_higher_version_is_unresolvable() {
        // [1.0] admits only 1.0, and 2.0 admits only >= 2.0; no overlap.
        let exact = Coord::parse("g:a:[1.0]");
        let higher = Coord::parse("g:a:2.0");
        assert!(resolve_conflict(&exact, &higher).is_err());
    }

    #[test]
    fn upper_bounded_range_accepts_contained_version() {
        let range = Coord::parse("g:a:(,1.5]");
        let inside = Coord::parse("g:a:1.2");
        // 1.2 satisfies (,1.5], so the concrete version survives.
        assert_eq!(resolve_conflict(&range, &inside).unwrap().version, "1.2");
    }
}
