//! The download cache.
//!
//! Checkouts live under a cache root at the path of their repository root,
//! so `github.com/org/repo/sub` is served from `<cache>/github.com/org/repo`.
//! The cache is monotonic: once a checkout exists it is never re-cloned or
//! overwritten by a download. Refreshing means deleting it first.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{ImportPath, RepoRoot};
use crate::resolver::discovery::{HttpFetcher, MetaFetcher};
use crate::resolver::{GetError, Resolver};
use crate::util::fs::{ensure_dir, nearest_existing_dir, remove_dir_all_if_exists};
use crate::util::process::{CommandRunner, SystemRunner};
use crate::vcs::detect::{detect_from_directory, DetectedCheckout};
use crate::vcs::security::{validate_reference, ProtocolAllowList, SecurityPolicy};
use crate::vcs::tag::select_tag;
use crate::vcs::VcsKind;

/// Deadline for discovery requests when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolves, clones and inspects repositories in a cache directory.
pub struct Downloader {
    root: PathBuf,
    policy: SecurityPolicy,
    allow_list: Option<ProtocolAllowList>,
    offline: bool,
    fetcher: Box<dyn MetaFetcher>,
    runner: Box<dyn CommandRunner>,
}

impl Downloader {
    /// A downloader over real HTTP and real VCS clients.
    pub fn new(root: impl Into<PathBuf>, policy: SecurityPolicy) -> Result<Self, GetError> {
        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT)?;
        Ok(Self::with_parts(
            root,
            policy,
            Box::new(fetcher),
            Box::new(SystemRunner),
        ))
    }

    /// A downloader with explicit transport and command runner.
    pub fn with_parts(
        root: impl Into<PathBuf>,
        policy: SecurityPolicy,
        fetcher: Box<dyn MetaFetcher>,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        Downloader {
            root: root.into(),
            policy,
            allow_list: None,
            offline: false,
            fetcher,
            runner,
        }
    }

    /// Replace one VCS kind's secure schemes, as `GIT_ALLOW_PROTOCOL` does.
    pub fn with_allow_list(mut self, allow_list: Option<ProtocolAllowList>) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Refuse discovery and scheme probing; cached checkouts and known
    /// hosts keep working.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// The cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> SecurityPolicy {
        self.policy
    }

    /// Where `import_path` lives in the cache. Touches neither disk nor
    /// network.
    pub fn destination_path(&self, import_path: &str) -> PathBuf {
        import_path
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.fetcher.as_ref(), self.runner.as_ref())
            .with_allow_list(self.allow_list.as_ref())
            .offline(self.offline)
    }

    /// Resolve `import_path` without downloading anything.
    pub fn resolve(&self, import_path: &str) -> Result<RepoRoot, GetError> {
        self.resolver().resolve(import_path, self.policy)
    }

    /// Make sure the repository holding `import_path` is checked out and
    /// return the directory of `import_path` inside it.
    pub fn download(&self, import_path: &str) -> Result<PathBuf, GetError> {
        let path = ImportPath::parse(import_path)?;
        let destination = self.destination_path(path.as_str());

        if let Some(found) = self.cached(&path)? {
            tracing::debug!("Using cached {} checkout of {}", found.kind, found.root);
            return Ok(destination);
        }

        let rr = self.resolver().resolve_path(&path, self.policy)?;
        let checkout = self.destination_path(&rr.root);
        if checkout.exists() {
            tracing::debug!("{} already exists", checkout.display());
            return Ok(destination);
        }

        if let Some(parent) = checkout.parent() {
            ensure_dir(parent)?;
        }

        tracing::info!("Cloning {} into {}", rr.repo, checkout.display());
        if let Err(e) = rr.kind.create(self.runner.as_ref(), &checkout, &rr.repo) {
            match remove_dir_all_if_exists(&checkout) {
                Ok(()) => tracing::warn!("Removed partial checkout {}", checkout.display()),
                Err(cleanup) => tracing::warn!("{}", cleanup),
            }
            return Err(e);
        }

        Ok(destination)
    }

    /// Check out `reference` (commit, tag or branch) in the existing
    /// checkout of `import_path`. Never clones.
    ///
    /// If the checkout fails, the working copy is updated from its remote
    /// once and the checkout retried.
    pub fn ref_sync(&self, import_path: &str, reference: &str) -> Result<(), GetError> {
        validate_reference(reference)?;
        let path = ImportPath::parse(import_path)?;
        let (kind, dir) = self.locate(&path)?;
        let runner = self.runner.as_ref();

        tracing::info!("Checking out {} in {}", reference, dir.display());
        match kind.tag_sync(runner, &dir, reference) {
            Err(e @ GetError::ExternalCommandFailed { .. }) => {
                tracing::debug!("{}; updating from remote and retrying", e);
                kind.download(runner, &dir)?;
                kind.tag_sync(runner, &dir, reference)
            }
            result => result,
        }
    }

    /// The revision currently checked out for `import_path`.
    pub fn head_ref(&self, import_path: &str) -> Result<String, GetError> {
        let path = ImportPath::parse(import_path)?;
        let (kind, dir) = self.locate(&path)?;
        kind.head(self.runner.as_ref(), &dir)
    }

    /// Tags known to the checkout of `import_path`.
    pub fn tags(&self, import_path: &str) -> Result<Vec<String>, GetError> {
        let path = ImportPath::parse(import_path)?;
        let (kind, dir) = self.locate(&path)?;
        kind.tags(self.runner.as_ref(), &dir)
    }

    /// Check out the best tag of `import_path`'s checkout, if any tag
    /// qualifies, and return it.
    pub fn sync_latest(&self, import_path: &str) -> Result<Option<String>, GetError> {
        let tags = self.tags(import_path)?;
        let Some(tag) = select_tag(&tags) else {
            tracing::debug!("No release tag among {} tags", tags.len());
            return Ok(None);
        };
        self.ref_sync(import_path, &tag)?;
        Ok(Some(tag))
    }

    /// A checkout on disk containing `path`, if there is one.
    fn cached(&self, path: &ImportPath) -> Result<Option<DetectedCheckout>, GetError> {
        let destination = self.destination_path(path.as_str());
        let Some(start) = nearest_existing_dir(&destination, &self.root) else {
            return Ok(None);
        };

        match detect_from_directory(&start, &self.root) {
            Ok(found) => Ok(Some(found)),
            Err(GetError::NotACheckout { dir, reason }) => {
                tracing::debug!("{} is not a checkout: {}", dir.display(), reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Find the existing checkout holding `path`.
    fn locate(&self, path: &ImportPath) -> Result<(VcsKind, PathBuf), GetError> {
        let destination = self.destination_path(path.as_str());
        if nearest_existing_dir(&destination, &self.root).is_none() {
            return Err(GetError::DestinationNotFound {
                path: destination,
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }

        if let Some(found) = self.cached(path)? {
            return Ok((found.kind, found.dir));
        }

        let rr = self.resolver().resolve_path(path, self.policy)?;
        let checkout = self.destination_path(&rr.root);
        match checkout.metadata() {
            Ok(_) => Ok((rr.kind, checkout)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(GetError::DestinationNotFound {
                    path: checkout,
                    source: e,
                })
            }
            Err(e) => Err(GetError::io(
                format!("failed to inspect {}", checkout.display()),
                e,
            )),
        }
    }
}
