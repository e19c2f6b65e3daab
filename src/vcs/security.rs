//! Transport security policy and repository root validation.
//!
//! Repository URLs can come from metadata served by an arbitrary remote
//! host. Everything here is pure so it can sit between that untrusted data
//! and the subprocess arguments built from it.

use std::fmt;

use url::Url;

use crate::resolver::GetError;
use crate::vcs::VcsKind;

/// Environment variable git itself uses to restrict transports.
pub const GIT_ALLOW_PROTOCOL_ENV: &str = "GIT_ALLOW_PROTOCOL";

/// Whether insecure transports may be used at all.
///
/// There is deliberately no `Default`: every resolution states its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityPolicy {
    /// Only https/ssh-style transports; discovery over https only.
    SecureOnly,
    /// Insecure transports allowed; discovery falls back to plain http
    /// after every secure attempt failed.
    Insecure,
}

impl SecurityPolicy {
    pub fn allows_insecure(self) -> bool {
        self == SecurityPolicy::Insecure
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityPolicy::SecureOnly => write!(f, "secure-only"),
            SecurityPolicy::Insecure => write!(f, "insecure"),
        }
    }
}

/// An explicit list of schemes considered secure for one VCS kind.
///
/// When present it replaces that kind's default classification entirely:
/// a scheme not listed is insecure even if it is secure by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolAllowList {
    kind: VcsKind,
    schemes: Vec<String>,
}

impl ProtocolAllowList {
    /// Parse a colon-separated scheme list such as `https:ssh`.
    ///
    /// An empty list means "not configured" and yields `None`.
    pub fn parse(kind: VcsKind, list: &str) -> Option<Self> {
        if list.is_empty() {
            return None;
        }
        Some(ProtocolAllowList {
            kind,
            schemes: list.split(':').map(str::to_string).collect(),
        })
    }

    /// The git allow-list, in `GIT_ALLOW_PROTOCOL` format.
    pub fn git(list: &str) -> Option<Self> {
        Self::parse(VcsKind::Git, list)
    }

    /// The kind this list overrides.
    pub fn kind(&self) -> VcsKind {
        self.kind
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    /// Whether `scheme` is listed.
    pub fn allows(&self, scheme: &str) -> bool {
        self.schemes.iter().any(|s| s == scheme)
    }
}

/// Extract the scheme of a repository URL.
///
/// scp-style shorthand (`user@host:path`) has no parseable scheme and yields
/// `None`: it cannot be told apart from a local path reliably.
pub fn url_scheme(repo: &str) -> Option<String> {
    Url::parse(repo).ok().map(|u| u.scheme().to_string())
}

/// Check a repository root before it reaches any VCS command line.
///
/// Rejects empty roots, roots starting with `-` (they would be parsed as an
/// option by the client), malformed schemes and the `file` scheme. A root
/// without any `://` is accepted as long as the first two rules hold.
pub fn validate_repo_root(root: &str) -> Result<(), GetError> {
    let invalid = |reason: &str| GetError::InvalidRepoRoot {
        root: root.to_string(),
        reason: reason.to_string(),
    };

    if root.is_empty() {
        return Err(invalid("empty repository root"));
    }
    if root.starts_with('-') {
        return Err(invalid("repository root may not start with `-`"));
    }

    if let Some(idx) = root.find("://") {
        let scheme = &root[..idx];
        if !is_valid_scheme(scheme) {
            return Err(invalid(&format!("invalid scheme `{}`", scheme)));
        }
        if scheme.eq_ignore_ascii_case("file") {
            return Err(invalid("file scheme disallowed"));
        }
    }

    Ok(())
}

/// Check a ref (tag, branch or revision) before it becomes a VCS argument.
///
/// Checkout commands take the ref as a positional argument, so a leading
/// `-` would be parsed as an option.
pub fn validate_reference(reference: &str) -> Result<(), GetError> {
    let invalid = |reason: &str| GetError::InvalidReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };

    if reference.is_empty() {
        return Err(invalid("empty reference"));
    }
    if reference.starts_with('-') {
        return Err(invalid("reference may not start with `-`"));
    }
    if reference.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("reference may not contain whitespace"));
    }
    Ok(())
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
