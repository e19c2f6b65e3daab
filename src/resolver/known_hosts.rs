//! Known hosting conventions.
//!
//! Each matcher recognizes one host family without touching the network.
//! A matcher returns `None` when the path is not on its host, and
//! `Some(Err(..))` when the host is its own but the path has the wrong
//! shape: once a host is claimed, no later phase gets to guess.
//!
//! Matchers are tried in the order of [`KNOWN_HOSTS`]; the first claim wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::RepoRoot;
use crate::resolver::GetError;
use crate::vcs::VcsKind;

/// Result of a single matcher.
pub type MatchResult = Option<Result<RepoRoot, GetError>>;

/// One hosting convention.
pub struct KnownHost {
    pub name: &'static str,
    pub matcher: fn(&str) -> MatchResult,
}

/// Every known hosting convention, in evaluation order.
pub static KNOWN_HOSTS: &[KnownHost] = &[
    KnownHost {
        name: "GitHub",
        matcher: match_github,
    },
    KnownHost {
        name: "GitLab",
        matcher: match_gitlab,
    },
    KnownHost {
        name: "IBM DevOps Services",
        matcher: match_ibm,
    },
    KnownHost {
        name: "Apache",
        matcher: match_apache,
    },
    KnownHost {
        name: "git hosting",
        matcher: match_git_host,
    },
    KnownHost {
        name: "Chisel",
        matcher: match_chisel,
    },
];

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("known host patterns are valid")
}

static GITHUB: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^(github\.com/[A-Za-z0-9_.\-]+/[A-Za-z0-9_.\-]+)(/[\p{L}0-9_.\-]+)*$")
});
static GITLAB: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^(gitlab\.com/[A-Za-z0-9_.\-]+/[A-Za-z0-9_.\-]+)(/[\p{L}0-9_.\-]+)*$")
});
static IBM: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^(hub\.jazz\.net/git/[a-z0-9]+/[A-Za-z0-9_.\-]+)(/[\p{L}0-9_.\-]+)*$")
});
static APACHE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^(git\.apache\.org/[a-z0-9_.\-]+\.git)(/[\p{L}0-9_.\-]+)*$")
});
static GIT_HOST: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^git\.[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+$"));
static SEGMENT: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[A-Za-z0-9_.\-]+$"));
static SUBPATH_SEGMENT: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[\p{L}0-9_.\-]+$"));
static CHISEL: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^(chiselapp\.com/user/[A-Za-z0-9]+/repository/[A-Za-z0-9_.\-]+)$")
});
static VCS_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"^(?P<root>(?P<repo>([a-z0-9.\-]+\.)+[a-z0-9.\-]+(:[0-9]+)?(/~?[A-Za-z0-9_.\-]+)+?)\.(?P<vcs>bzr|fossil|git|hg|svn))(/~?[A-Za-z0-9_.\-]+)*$",
    )
});

/// Run the matchers in order and return the first claim.
pub fn match_known_host(path: &str) -> MatchResult {
    KNOWN_HOSTS.iter().find_map(|host| {
        let result = (host.matcher)(path)?;
        tracing::debug!("{} claims `{}`", host.name, path);
        Some(result)
    })
}

fn no_match(path: &str, reason: impl Into<String>) -> MatchResult {
    Some(Err(GetError::NoPatternMatch {
        path: path.to_string(),
        reason: reason.into(),
    }))
}

/// Root from capture 1 of `re`, or a claimed failure.
fn capture_root(path: &str, re: &Regex, shape: &str) -> Result<String, GetError> {
    re.captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| GetError::NoPatternMatch {
            path: path.to_string(),
            reason: format!("expected {}", shape),
        })
}

/// Provider roots name the repository, never its VCS.
fn reject_vcs_suffix(path: &str, root: &str) -> Result<(), GetError> {
    for kind in VcsKind::ALL {
        if root.ends_with(&format!(".{}", kind.cmd())) {
            return Err(GetError::NoPatternMatch {
                path: path.to_string(),
                reason: format!("invalid version control suffix in `{}`", root),
            });
        }
    }
    Ok(())
}

fn match_provider(path: &str, prefix: &str, re: &Regex, shape: &str) -> MatchResult {
    if !path.starts_with(prefix) {
        return None;
    }
    let result = capture_root(path, re, shape).and_then(|root| {
        reject_vcs_suffix(path, &root)?;
        Ok(RepoRoot::https(VcsKind::Git, root))
    });
    Some(result)
}

/// `github.com/<user>/<repo>[/...]`
pub fn match_github(path: &str) -> MatchResult {
    match_provider(path, "github.com/", &GITHUB, "github.com/<user>/<repo>")
}

/// `gitlab.com/<user>/<repo>[/...]`
pub fn match_gitlab(path: &str) -> MatchResult {
    match_provider(path, "gitlab.com/", &GITLAB, "gitlab.com/<user>/<repo>")
}

/// `hub.jazz.net/git/<user>/<repo>[/...]`; the user is lowercase
/// alphanumeric. The bare host is claimed too.
pub fn match_ibm(path: &str) -> MatchResult {
    if path != "hub.jazz.net" && !path.starts_with("hub.jazz.net/") {
        return None;
    }
    match_provider(
        path,
        "hub.jazz.net",
        &IBM,
        "hub.jazz.net/git/<user>/<repo>",
    )
}

/// `git.apache.org/<repo>.git[/...]`
pub fn match_apache(path: &str) -> MatchResult {
    if path != "git.apache.org" && !path.starts_with("git.apache.org/") {
        return None;
    }
    Some(
        capture_root(path, &APACHE, "git.apache.org/<repo>.git")
            .map(|root| RepoRoot::https(VcsKind::Git, root)),
    )
}

/// Hosts named `git.<domain>`: `<host>/<org>/<repo>[/...]`, or
/// `<host>/<path>.git[/...]`. The first `.git` segment ends the root and
/// stays in it.
pub fn match_git_host(path: &str) -> MatchResult {
    let mut segments = path.split('/');
    let host = segments.next()?;
    if !GIT_HOST.is_match(host) {
        return None;
    }

    let rest: Vec<&str> = segments.collect();
    let depth = match rest.iter().position(|s| s.ends_with(".git")) {
        Some(idx) => idx + 1,
        None if rest.len() >= 2 => 2,
        None => return no_match(path, format!("expected {}/<org>/<repo>", host)),
    };

    let (root_segments, subpath) = rest.split_at(depth);
    let bad = root_segments
        .iter()
        .find(|s| !SEGMENT.is_match(s))
        .or_else(|| subpath.iter().find(|s| !SUBPATH_SEGMENT.is_match(s)));
    if let Some(bad) = bad {
        return no_match(path, format!("invalid path element `{}`", bad));
    }

    let root = std::iter::once(host)
        .chain(rest[..depth].iter().copied())
        .collect::<Vec<_>>()
        .join("/");
    Some(Ok(RepoRoot::https(VcsKind::Git, root)))
}

/// `chiselapp.com/user/<name>/repository/<repo>`
pub fn match_chisel(path: &str) -> MatchResult {
    if !path.starts_with("chiselapp.com/") {
        return None;
    }
    Some(
        capture_root(path, &CHISEL, "chiselapp.com/user/<name>/repository/<repo>")
            .map(|root| RepoRoot::https(VcsKind::Fossil, root)),
    )
}

/// An import path that names its VCS with a suffix on the repository
/// segment, e.g. `example.com/repo.git/sub`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixMatch {
    pub kind: VcsKind,
    /// Root including the suffix
    pub root: String,
    /// Repository location without scheme or suffix
    pub repo: String,
}

/// Recognize the explicit VCS suffix form.
pub fn match_vcs_suffix(path: &str) -> Option<SuffixMatch> {
    let caps = VCS_SUFFIX.captures(path)?;
    let kind = VcsKind::from_cmd(caps.name("vcs")?.as_str())?;
    Some(SuffixMatch {
        kind,
        root: caps.name("root")?.as_str().to_string(),
        repo: caps.name("repo")?.as_str().to_string(),
    })
}
