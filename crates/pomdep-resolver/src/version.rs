//! Maven version canonicalization, total-order comparison, and range
//! matching.
//!
//! Versions follow `<major>.<minor>.<revision>[-<qualifier>][-<build>]`.
//! Ordering rules:
//! - numeric comparison of major, minor, revision, and build; missing
//!   fields count as 0
//! - a missing qualifier is newer than any qualifier (a release is newer
//!   than its `-rc`), so SNAPSHOT sorts before the equivalent release
//! - qualifiers compare case-insensitively (`alpha` < `beta` < `rc`)
//!
//! A constraint is a comma-separated union of ranges:
//! - `1.0`           means x >= 1.0 (same as `[1.0,)`)
//! - `[1.0]`         means x == 1.0
//! - `(,1.0]`        means x <= 1.0
//! - `[1.0,2.0)`     means 1.0 <= x < 2.0
//! - `(,1.0],[1.2,)` means x <= 1.0 or x >= 1.2

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static CANONICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<major>\d+)(?:\.(?P<minor>\d+)(?:\.(?P<revision>\d+))?)?(?:-(?P<qualifier>[^-]+))?(?:-(?P<build>\d+))?$",
    )
    .expect("canonical version pattern")
});

/// A version reduced to its five comparable fields.
///
/// Unparseable versions canonicalize to all zeros with an empty qualifier,
/// which makes an empty version compare equal to `0.0.0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Canonical {
    pub major: u64,
    pub minor: u64,
    pub revision: u64,
    pub qualifier: String,
    pub build: u64,
}

/// Canonicalize a version string. Surrounding whitespace and range
/// brackets are stripped first, so constraint bounds like `1.2]` parse.
pub fn canonical(version: &str) -> Canonical {
    let stripped =
        version.trim_matches(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')'));

    let Some(caps) = CANONICAL_RE.captures(stripped) else {
        return Canonical::default();
    };

    let num = |name: &str| {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };

    Canonical {
        major: num("major"),
        minor: num("minor"),
        revision: num("revision"),
        qualifier: caps
            .name("qualifier")
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default(),
        build: num("build"),
    }
}

/// Total order over version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    let a = canonical(a);
    let b = canonical(b);

    a.major
        .cmp(&b.major)
        .then_with(|| a.minor.cmp(&b.minor))
        .then_with(|| a.revision.cmp(&b.revision))
        .then_with(|| compare_qualifiers(&a.qualifier, &b.qualifier))
        .then_with(|| a.build.cmp(&b.build))
}

/// The empty qualifier sorts after any non-empty qualifier; non-empty
/// qualifiers compare lexicographically (already lowercased).
fn compare_qualifiers(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

/// Whether `version` satisfies `constraint`.
pub fn satisfies(version: &str, constraint: &str) -> bool {
    Constraint::parse(constraint).matches(version)
}

/// A parsed constraint: the union of its ranges.
#[derive(Debug, Clone)]
pub struct Constraint {
    ranges: Vec<Range>,
}

/// One interval of a constraint. A missing bound is unbounded on that
/// side.
#[derive(Debug, Clone)]
struct Range {
    raw: String,
    lower: Option<Bound>,
    upper: Option<Bound>,
}

#[derive(Debug, Clone)]
struct Bound {
    version: String,
    inclusive: bool,
}

impl Constraint {
    /// Parse a constraint string. Malformed ranges are dropped (and can
    /// therefore never match).
    pub fn parse(constraint: &str) -> Self {
        let ranges = split_ranges(constraint)
            .into_iter()
            .filter_map(|expr| Range::parse(&expr))
            .collect();
        Self { ranges }
    }

    /// Whether `version` falls inside any range of this constraint.
    pub fn matches(&self, version: &str) -> bool {
        let version: String = version.split_whitespace().collect();
        self.ranges.iter().any(|r| r.contains(&version))
    }
}

/// Break a constraint after every `]` or `)` that is followed by a comma.
fn split_ranges(constraint: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = constraint.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if (ch == ']' || ch == ')') && chars.peek() == Some(&',') {
            chars.next();
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

impl Range {
    fn parse(expr: &str) -> Option<Self> {
        let expr: String = expr.split_whitespace().collect();
        let parts: Vec<&str> = expr.split(',').collect();

        match parts.len() {
            1 => {
                let piece = parts[0];
                if piece.is_empty() {
                    // An absent constraint matches everything.
                    return Some(Range {
                        raw: expr,
                        lower: None,
                        upper: None,
                    });
                }
                let bare = !piece.starts_with(['[', '(']) && !piece.ends_with([']', ')']);
                if bare {
                    // `1.0` normalizes to `[1.0,)`.
                    Some(Range {
                        lower: Some(Bound {
                            version: piece.to_string(),
                            inclusive: true,
                        }),
                        upper: None,
                        raw: expr,
                    })
                } else {
                    // `[1.0]` normalizes to `[1.0,1.0]`.
                    let exact = piece.trim_matches(['[', ']', '(', ')', ',']);
                    Some(Range {
                        lower: Some(Bound {
                            version: exact.to_string(),
                            inclusive: true,
                        }),
                        upper: Some(Bound {
                            version: exact.to_string(),
                            inclusive: true,
                        }),
                        raw: expr,
                    })
                }
            }
            2 => Some(Range {
                lower: parse_lower(parts[0]),
                upper: parse_upper(parts[1]),
                raw: expr,
            }),
            _ => {
                tracing::debug!("malformed version range expression: '{expr}'");
                None
            }
        }
    }

    fn contains(&self, version: &str) -> bool {
        if version == self.raw {
            return true;
        }

        if let Some(lower) = &self.lower {
            let cmp = compare(version, &lower.version);
            let ok = if lower.inclusive {
                cmp != Ordering::Less
            } else {
                cmp == Ordering::Greater
            };
            if !ok {
                return false;
            }
        }

        if let Some(upper) = &self.upper {
            let cmp = compare(version, &upper.version);
            let ok = if upper.inclusive {
                cmp != Ordering::Greater
            } else {
                cmp == Ordering::Less
            };
            if !ok {
                return false;
            }
        }

        true
    }
}

/// `(` and `[` alone are unbounded; a piece without a leading bracket
/// imposes no lower constraint either.
fn parse_lower(piece: &str) -> Option<Bound> {
    match piece {
        "(" | "[" => None,
        _ if piece.starts_with('(') => Some(Bound {
            version: piece.to_string(),
            inclusive: false,
        }),
        _ if piece.starts_with('[') => Some(Bound {
            version: piece.to_string(),
            inclusive: true,
        }),
        _ => None,
    }
}

fn parse_upper(piece: &str) -> Option<Bound> {
    match piece {
        ")" | "]" => None,
        _ if piece.ends_with(')') => Some(Bound {
            version: piece.to_string(),
            inclusive: false,
        }),
        _ if piece.ends_with(']') => Some(Bound {
            version: piece.to_string(),
            inclusive: true,
        }),
        _ => None,
    }
}
