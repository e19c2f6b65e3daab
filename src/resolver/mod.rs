//! Import path resolution.
//!
//! Maps an import path to a [`RepoRoot`] in three phases, first success
//! wins:
//!
//! 1. known hosting conventions ([`known_hosts`]), no network access;
//! 2. an explicit VCS suffix on the repository segment
//!    (`example.com/repo.git/sub`), probing the kind's schemes;
//! 3. remote metadata discovery ([`discovery`]).
//!
//! Whatever the phase, the result passes the security checks before it is
//! returned.

pub mod discovery;
pub mod errors;
pub mod known_hosts;

pub use errors::GetError;

use crate::core::{ImportPath, RepoRoot};
use crate::util::process::CommandRunner;
use crate::vcs::security::{validate_repo_root, ProtocolAllowList, SecurityPolicy};

use self::discovery::MetaFetcher;
use self::known_hosts::SuffixMatch;

/// Resolves import paths against a metadata fetcher and a command runner.
pub struct Resolver<'a> {
    fetcher: &'a dyn MetaFetcher,
    runner: &'a dyn CommandRunner,
    allow_list: Option<&'a ProtocolAllowList>,
    offline: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(fetcher: &'a dyn MetaFetcher, runner: &'a dyn CommandRunner) -> Self {
        Resolver {
            fetcher,
            runner,
            allow_list: None,
            offline: false,
        }
    }

    /// Replace one VCS kind's secure schemes with an explicit list.
    pub fn with_allow_list(mut self, allow_list: Option<&'a ProtocolAllowList>) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Refuse any phase that needs the network.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Resolve `import_path` under `policy`.
    pub fn resolve(&self, import_path: &str, policy: SecurityPolicy) -> Result<RepoRoot, GetError> {
        let path = ImportPath::parse(import_path)?;
        self.resolve_path(&path, policy)
    }

    /// Resolve an already validated import path.
    pub fn resolve_path(
        &self,
        path: &ImportPath,
        policy: SecurityPolicy,
    ) -> Result<RepoRoot, GetError> {
        let rr = if let Some(claimed) = known_hosts::match_known_host(path.as_str()) {
            claimed?
        } else if let Some(suffix) = known_hosts::match_vcs_suffix(path.as_str()) {
            self.require_online(path)?;
            self.probe_suffix(suffix, policy)?
        } else {
            self.require_online(path)?;
            discovery::discover(path, policy, self.fetcher)?
        };

        self.check(path, rr, policy)
    }

    fn require_online(&self, path: &ImportPath) -> Result<(), GetError> {
        if self.offline {
            return Err(GetError::NetworkFailure {
                url: path.to_string(),
                message: "network access disabled (offline)".to_string(),
            });
        }
        Ok(())
    }

    /// Find the first of the kind's schemes whose repository answers.
    fn probe_suffix(&self, suffix: SuffixMatch, policy: SecurityPolicy) -> Result<RepoRoot, GetError> {
        let kind = suffix.kind;
        for spec in kind.descriptor().schemes {
            if !policy.allows_insecure() && !kind.is_secure_scheme(spec.name, self.allow_list) {
                continue;
            }
            match kind.ping(self.runner, spec.name, &suffix.repo) {
                Ok(()) => {
                    let repo = format!("{}://{}", spec.name, suffix.repo);
                    tracing::debug!("{} answers at {}", kind, repo);
                    return Ok(RepoRoot::new(kind, repo, suffix.root));
                }
                Err(e) => tracing::debug!("No {} repository over {}: {}", kind, spec.name, e),
            }
        }

        Err(GetError::NetworkFailure {
            url: suffix.repo,
            message: format!("no reachable {} repository over an allowed scheme", kind),
        })
    }

    /// Security checks every resolution passes before it is used.
    fn check(&self, path: &ImportPath, rr: RepoRoot, policy: SecurityPolicy) -> Result<RepoRoot, GetError> {
        if !path.has_prefix(&rr.root) {
            return Err(GetError::InvalidRepoRoot {
                root: rr.root,
                reason: format!("not a prefix of `{}`", path),
            });
        }

        validate_repo_root(&rr.repo)?;

        if !policy.allows_insecure() && !rr.kind.is_secure(&rr.repo, self.allow_list) {
            return Err(GetError::InsecureTransportRejected {
                url: rr.repo,
                kind: rr.kind,
            });
        }

        tracing::debug!("Resolved `{}` to {}", path, rr);
        Ok(rr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::meta_page;
    use crate::test_support::{MockFetcher, MockProcessOutput, MockRunner};
    use crate::vcs::VcsKind;

    fn resolve(path: &str) -> Result<RepoRoot, GetError> {
        let fetcher = MockFetcher::new();
        let runner = MockRunner::new();
        Resolver::new(&fetcher, &runner).resolve(path, SecurityPolicy::SecureOnly)
    }

    #[test]
    fn test_repo_root_for_import_path() {
        use VcsKind::*;
        let cases: &[(&str, Option<(VcsKind, &str)>)] = &[
            ("github.com/golang/groupcache", Some((Git, "https://github.com/golang/groupcache"))),
            // Unicode letters in directories are not valid import paths for
            // the compiler, but are fine for the repository lookup.
            ("github.com/user/unicode/испытание", Some((Git, "https://github.com/user/unicode"))),
            ("gitlab.com/gitlab-org/gitlab-terminal", Some((Git, "https://gitlab.com/gitlab-org/gitlab-terminal"))),
            ("hub.jazz.net/git/user1/pkgname", Some((Git, "https://hub.jazz.net/git/user1/pkgname"))),
            (
                "hub.jazz.net/git/user1/pkgname/submodule/submodule/submodule",
                Some((Git, "https://hub.jazz.net/git/user1/pkgname")),
            ),
            ("hub.jazz.net", None),
            ("hubajazz.net", None),
            ("hub2.jazz.net", None),
            ("hub.jazz.net/someotherprefix", None),
            ("hub.jazz.net/someotherprefix/user1/pkgname", None),
            // Spaces are not valid in user names or package names
            ("hub.jazz.net/git/User 1/pkgname", None),
            ("hub.jazz.net/git/user1/pkg name", None),
            // Dots are not valid in user names
            ("hub.jazz.net/git/user.1/pkgname", None),
            ("hub.jazz.net/git/user/pkg.name", Some((Git, "https://hub.jazz.net/git/user/pkg.name"))),
            // User names cannot have uppercase letters
            ("hub.jazz.net/git/USER/pkgname", None),
            ("git.openstack.org/openstack/swift", Some((Git, "https://git.openstack.org/openstack/swift"))),
            // A trailing .git is kept in the repository URL
            ("git.openstack.org/openstack/swift.git", Some((Git, "https://git.openstack.org/openstack/swift.git"))),
            (
                "git.openstack.org/openstack/swift/go/hummingbird",
                Some((Git, "https://git.openstack.org/openstack/swift")),
            ),
            ("git.openstack.org", None),
            ("git.openstack.org/openstack", None),
            // Spaces are not valid in package name
            ("git.apache.org/package name/path/to/lib", None),
            // Should have ".git" suffix
            ("git.apache.org/package-name/path/to/lib", None),
            ("gitbapache.org", None),
            ("git.apache.org/package-name.git", Some((Git, "https://git.apache.org/package-name.git"))),
            (
                "git.apache.org/package-name_2.x.git/path/to/lib",
                Some((Git, "https://git.apache.org/package-name_2.x.git")),
            ),
            (
                "chiselapp.com/user/kyle/repository/fossilgg",
                Some((Fossil, "https://chiselapp.com/user/kyle/repository/fossilgg")),
            ),
            // must have a user/$name/repository/$repo path
            ("chiselapp.com/kyle/repository/fossilgg", None),
            ("chiselapp.com/user/kyle/fossilgg", None),
        ];

        for (path, want) in cases {
            let got = resolve(path);
            match (got, want) {
                (Ok(rr), Some((kind, repo))) => {
                    assert_eq!(rr.kind, *kind, "{}", path);
                    assert_eq!(rr.repo, *repo, "{}", path);
                    assert!(path.starts_with(&rr.root), "{}: root {}", path, rr.root);
                }
                (Err(_), None) => {}
                (Ok(rr), None) => panic!("{}: expected error, got {}", path, rr),
                (Err(e), Some(_)) => panic!("{}: unexpected error: {}", path, e),
            }
        }
    }

    #[test]
    fn test_known_hosts_never_touch_network() {
        let fetcher = MockFetcher::new();
        let runner = MockRunner::new();
        let resolver = Resolver::new(&fetcher, &runner).offline(true);

        let rr = resolver
            .resolve("github.com/tilt-dev/tilt-extensions/hello_world", SecurityPolicy::SecureOnly)
            .unwrap();
        assert_eq!(rr.root, "github.com/tilt-dev/tilt-extensions");
        assert!(fetcher.requests().is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_offline_refuses_discovery() {
        let fetcher = MockFetcher::new();
        let runner = MockRunner::new();
        let resolver = Resolver::new(&fetcher, &runner).offline(true);

        let err = resolver
            .resolve("example.org/pkg", SecurityPolicy::SecureOnly)
            .unwrap_err();
        assert!(matches!(err, GetError::NetworkFailure { .. }));
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn test_discovery_result_is_validated() {
        let cases = [
            ("http://code.example.org/pkg", "insecure"),
            ("-oProxyCommand=touch", "invalid"),
            ("file:///etc/passwd", "invalid"),
        ];

        for (repo, expected) in cases {
            let fetcher = MockFetcher::new();
            let runner = MockRunner::new();
            fetcher.page(
                "https://example.org/pkg?go-get=1",
                meta_page(&[("example.org/pkg", "git", repo)]),
            );

            let err = Resolver::new(&fetcher, &runner)
                .resolve("example.org/pkg", SecurityPolicy::SecureOnly)
                .unwrap_err();
            match (expected, err) {
                ("insecure", GetError::InsecureTransportRejected { .. }) => {}
                ("invalid", GetError::InvalidRepoRoot { .. }) => {}
                (_, other) => panic!("{}: unexpected error: {}", repo, other),
            }
        }
    }

    #[test]
    fn test_discovery_rejects_local_paths_when_insecure() {
        for repo in ["/home/victim/.ssh", "user@server:path/to/repo.git", "../elsewhere"] {
            let fetcher = MockFetcher::new();
            let runner = MockRunner::new();
            fetcher.page(
                "https://example.org/pkg?go-get=1",
                meta_page(&[("example.org/pkg", "git", repo)]),
            );

            let err = Resolver::new(&fetcher, &runner)
                .resolve("example.org/pkg", SecurityPolicy::Insecure)
                .unwrap_err();
            assert!(matches!(err, GetError::InvalidRepoRoot { .. }), "{}: {}", repo, err);
            assert!(runner.calls().is_empty());
        }
    }

    #[test]
    fn test_insecure_policy_accepts_http_repository() {
        let fetcher = MockFetcher::new();
        let runner = MockRunner::new();
        fetcher.page(
            "https://example.org/pkg?go-get=1",
            meta_page(&[("example.org/pkg", "git", "http://code.example.org/pkg")]),
        );

        let rr = Resolver::new(&fetcher, &runner)
            .resolve("example.org/pkg", SecurityPolicy::Insecure)
            .unwrap();
        assert_eq!(rr.repo, "http://code.example.org/pkg");
    }

    #[test]
    fn test_allow_list_applies_to_known_hosts() {
        let fetcher = MockFetcher::new();
        let runner = MockRunner::new();
        let allow = ProtocolAllowList::git("ssh").unwrap();

        let err = Resolver::new(&fetcher, &runner)
            .with_allow_list(Some(&allow))
            .resolve("github.com/golang/groupcache", SecurityPolicy::SecureOnly)
            .unwrap_err();
        assert!(matches!(err, GetError::InsecureTransportRejected { .. }));
    }

    #[test]
    fn test_vcs_suffix_probes_secure_schemes() {
        let fetcher = MockFetcher::new();
        let runner = MockRunner::new();
        runner.expect(
            "git ls-remote https://example.com/repo",
            MockProcessOutput::success("5670e8d8c5925981d019e6065a30058fc50eb299\tHEAD\n"),
        );

        let rr = Resolver::new(&fetcher, &runner)
            .resolve("example.com/repo.git/sub", SecurityPolicy::SecureOnly)
            .unwrap();
        assert_eq!(rr.kind, VcsKind::Git);
        assert_eq!(rr.root, "example.com/repo.git");
        assert_eq!(rr.repo, "https://example.com/repo");
        // git:// is insecure and never probed.
        assert_eq!(runner.calls(), vec!["git ls-remote https://example.com/repo"]);
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn test_vcs_suffix_unreachable() {
        let fetcher = MockFetcher::new();
        let runner = MockRunner::new();

        let err = Resolver::new(&fetcher, &runner)
            .resolve("example.com/repo.hg", SecurityPolicy::SecureOnly)
            .unwrap_err();
        assert!(matches!(err, GetError::NetworkFailure { .. }));
        assert_eq!(
            runner.calls(),
            vec![
                "hg identify -- https://example.com/repo",
                "hg identify -- ssh://example.com/repo",
            ]
        );
    }

    #[test]
    fn test_invalid_import_path() {
        for path in ["", "/abs/path", "example.com//x", "example.com/../x", "-flag.com/x"] {
            assert!(
                matches!(resolve(path), Err(GetError::InvalidImportPath { .. })),
                "{:?}",
                path
            );
        }
    }
}
