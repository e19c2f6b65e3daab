//! Tag selection.
//!
//! Repositories often carry tags in several naming schemes at once. Each
//! scheme has its own ordering, and tags are only ever compared within one
//! scheme: a semver tag is never weighed against a `go.weekly` tag.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

static GO_RELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]*(\.[0-9]+)*$").expect("valid pattern"));
static DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)*$").expect("valid pattern"));
static WEEKLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})(?:\.([0-9]+))?$").expect("valid pattern")
});

/// A tag parsed under one of the recognized naming schemes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TagVersion {
    /// `v1.2.3` or `1.2.3`
    Semver(Version),
    /// `go1`, `go1.0.1`
    Go(Vec<u32>),
    /// `go.r58`, `go.r58.1`
    Release(Vec<u32>),
    /// `go.weekly.2011-10-12`, `go.weekly.2011-10-12.1`
    Weekly(String, Option<u32>),
}

impl TagVersion {
    /// Parse a repository tag.
    fn from_tag(tag: &str) -> Option<Self> {
        if let Some(v) = parse_semver(tag) {
            return Some(TagVersion::Semver(v));
        }
        if let Some(rest) = tag.strip_prefix("go.r") {
            return parse_dotted(rest).map(TagVersion::Release);
        }
        if let Some(rest) = tag.strip_prefix("go.weekly.") {
            return parse_weekly(rest);
        }
        if let Some(rest) = tag.strip_prefix("go") {
            return parse_go(rest).map(TagVersion::Go);
        }
        None
    }

    /// Parse an upper bound. Release and weekly bounds are spelled without
    /// the `go.` prefix their tags carry (`release.r58`, `weekly.2011-10-12`).
    fn from_bound(bound: &str) -> Option<Self> {
        if let Some(rest) = bound.strip_prefix("release.r") {
            return parse_dotted(rest).map(TagVersion::Release);
        }
        if let Some(rest) = bound.strip_prefix("weekly.") {
            return parse_weekly(rest);
        }
        if let Some(v) = parse_semver(bound) {
            return Some(TagVersion::Semver(v));
        }
        if let Some(rest) = bound.strip_prefix("go") {
            return parse_go(rest).map(TagVersion::Go);
        }
        None
    }

    /// Rank of the scheme when no bound is given; lower wins.
    fn scheme_rank(&self) -> u8 {
        match self {
            TagVersion::Semver(_) => 0,
            TagVersion::Go(_) => 1,
            TagVersion::Release(_) => 2,
            TagVersion::Weekly(..) => 3,
        }
    }

    /// Compare within one scheme; `None` across schemes.
    fn compare(&self, other: &TagVersion) -> Option<Ordering> {
        match (self, other) {
            (TagVersion::Semver(a), TagVersion::Semver(b)) => Some(a.cmp(b)),
            (TagVersion::Go(a), TagVersion::Go(b)) => Some(a.cmp(b)),
            (TagVersion::Release(a), TagVersion::Release(b)) => Some(a.cmp(b)),
            (TagVersion::Weekly(da, na), TagVersion::Weekly(db, nb)) => {
                Some(da.cmp(db).then(na.cmp(nb)))
            }
            _ => None,
        }
    }
}

fn parse_semver(s: &str) -> Option<Version> {
    Version::parse(s.strip_prefix('v').unwrap_or(s)).ok()
}

fn parse_dotted(s: &str) -> Option<Vec<u32>> {
    if !DOTTED.is_match(s) {
        return None;
    }
    s.split('.').map(|part| part.parse().ok()).collect()
}

/// `go` followed by `N(.N)*`; a trailing `.0` is not a canonical name.
fn parse_go(s: &str) -> Option<Vec<u32>> {
    if !GO_RELEASE.is_match(s) {
        return None;
    }
    let parts = parse_dotted(s)?;
    if parts.len() > 1 && parts.last() == Some(&0) {
        return None;
    }
    Some(parts)
}

fn parse_weekly(s: &str) -> Option<TagVersion> {
    let caps = WEEKLY.captures(s)?;
    let date = caps.get(1)?.as_str().to_string();
    let n = match caps.get(2) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    Some(TagVersion::Weekly(date, n))
}

/// Pick the best tag with no version constraint.
///
/// Semver tags win over every other scheme; within a scheme the highest
/// tag is chosen. Tags that fit no scheme are never chosen.
pub fn select_tag(tags: &[String]) -> Option<String> {
    let mut best: Option<(&String, TagVersion)> = None;

    for tag in tags {
        let Some(version) = TagVersion::from_tag(tag) else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((_, current)) => match version.scheme_rank().cmp(&current.scheme_rank()) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => version.compare(current) == Some(Ordering::Greater),
            },
        };
        if better {
            best = Some((tag, version));
        }
    }

    best.map(|(tag, _)| tag.clone())
}

/// Pick the highest tag not newer than `version`, within `version`'s scheme.
///
/// Returns `None` when `version` itself fits no scheme or no tag qualifies.
pub fn select_tag_for(version: &str, tags: &[String]) -> Option<String> {
    let bound = TagVersion::from_bound(version)?;
    let mut best: Option<(&String, TagVersion)> = None;

    for tag in tags {
        let Some(candidate) = TagVersion::from_tag(tag) else {
            continue;
        };
        if !matches!(bound.compare(&candidate), Some(Ordering::Greater | Ordering::Equal)) {
            continue;
        }
        let better = match &best {
            None => true,
            Some((_, current)) => candidate.compare(current) == Some(Ordering::Greater),
        };
        if better {
            best = Some((tag, candidate));
        }
    }

    best.map(|(tag, _)| tag.clone())
}
