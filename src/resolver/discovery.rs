//! Remote metadata discovery.
//!
//! A host that is not covered by a known-host pattern may declare its
//! repositories itself: fetching `https://<prefix>?go-get=1` returns an HTML
//! page whose head carries
//!
//! ```html
//! <meta name="go-import" content="example.org/pkg git https://code.example.org/pkg">
//! ```
//!
//! Everything read here comes from the network and is untrusted. Records
//! are filtered for consistency with the requested path; the repository URL
//! is validated by the caller before it reaches a VCS command line.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::core::import_path::is_path_prefix;
use crate::core::{ImportPath, RepoRoot};
use crate::resolver::GetError;
use crate::vcs::security::{url_scheme, SecurityPolicy};
use crate::vcs::VcsKind;

/// Query string marking a discovery request.
pub const DISCOVERY_QUERY: &str = "go-get=1";

/// `name` attribute value of a discovery record.
pub const META_NAME: &str = "go-import";

static BODY_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body[\s>]").expect("valid pattern"));
static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").expect("valid pattern"));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("valid pattern")
});

/// A fetched metadata page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches discovery pages.
///
/// An `Err` means the request could not complete at all. An HTTP error
/// status is still an `Ok` page: its body may carry records.
pub trait MetaFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, GetError>;
}

/// [`MetaFetcher`] over real HTTP.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, GetError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wharf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GetError::NetworkFailure {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(HttpFetcher { client })
    }
}

impl MetaFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, GetError> {
        let network = |e: reqwest::Error| GetError::NetworkFailure {
            url: url.to_string(),
            message: e.to_string(),
        };

        tracing::debug!("Fetching {}", url);
        let response = self.client.get(url).send().map_err(network)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(network)?;

        Ok(FetchedPage { status, body })
    }
}

/// One `go-import` record as declared by a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaImport {
    pub prefix: String,
    pub vcs: String,
    pub repo: String,
}

impl std::fmt::Display for MetaImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.prefix, self.vcs, self.repo)
    }
}

/// Extract every well-formed `go-import` record from the head of `html`.
///
/// Records whose content is not exactly three fields are skipped.
pub fn parse_meta_imports(html: &str) -> Vec<MetaImport> {
    let head = match BODY_START.find(html) {
        Some(m) => &html[..m.start()],
        None => html,
    };

    let mut imports = Vec::new();
    for tag in META_TAG.captures_iter(head) {
        let mut name = None;
        let mut content = None;

        for attr in ATTRIBUTE.captures_iter(&tag[1]) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map(|m| decode_entities(m.as_str()));
            match attr[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                "content" => content = value,
                _ => {}
            }
        }

        let (Some(name), Some(content)) = (name, content) else {
            continue;
        };
        if name != META_NAME {
            continue;
        }

        let fields: Vec<&str> = content.split_whitespace().collect();
        match fields.as_slice() {
            [prefix, vcs, repo] => imports.push(MetaImport {
                prefix: prefix.to_string(),
                vcs: vcs.to_string(),
                repo: repo.to_string(),
            }),
            _ => tracing::warn!("Ignoring malformed {} record: {:?}", META_NAME, content),
        }
    }
    imports
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Keep the records that apply to `path` and name a supported VCS.
fn matching_records(path: &ImportPath, records: Vec<MetaImport>) -> Vec<(MetaImport, VcsKind)> {
    records
        .into_iter()
        .filter_map(|record| {
            if !is_path_prefix(path.as_str(), &record.prefix) {
                tracing::debug!("Skipping record for unrelated prefix: {}", record);
                return None;
            }
            match VcsKind::from_cmd(&record.vcs) {
                Some(kind) => Some((record, kind)),
                None => {
                    // Module proxy records are not repositories.
                    if record.vcs != "mod" {
                        tracing::warn!("Ignoring record with unknown VCS: {}", record);
                    }
                    None
                }
            }
        })
        .collect()
}

/// Ask the hosts of `path`'s prefixes which repository owns it.
///
/// Prefixes are tried longest first over https. Under
/// [`SecurityPolicy::Insecure`] they are then all tried again over plain
/// http. The first page with an applicable record decides the outcome.
pub fn discover(
    path: &ImportPath,
    policy: SecurityPolicy,
    fetcher: &dyn MetaFetcher,
) -> Result<RepoRoot, GetError> {
    if !path.has_dotted_host() {
        return Err(GetError::InvalidImportPath {
            path: path.to_string(),
            reason: "missing dot in first path element".to_string(),
        });
    }

    let schemes: &[&str] = if policy.allows_insecure() {
        &["https", "http"]
    } else {
        &["https"]
    };

    let mut tried = Vec::new();
    let mut last_failure = None;
    let mut any_page = false;

    for scheme in schemes {
        for candidate in path.prefixes() {
            let url = format!("{}://{}?{}", scheme, candidate, DISCOVERY_QUERY);
            tried.push(url.clone());

            let page = match fetcher.fetch(&url) {
                Ok(page) => page,
                Err(e) => {
                    tracing::debug!("Discovery request failed: {}", e);
                    last_failure = Some(e);
                    continue;
                }
            };
            any_page = true;

            let records = matching_records(path, parse_meta_imports(&page.body));
            let Some((first, kind)) = records.first() else {
                if !page.is_success() {
                    tracing::debug!("{} returned status {}", url, page.status);
                }
                continue;
            };

            if records.iter().any(|(r, _)| r != first) {
                return Err(GetError::AmbiguousDiscovery {
                    path: path.to_string(),
                    url,
                    records: records.iter().map(|(r, _)| r.to_string()).collect(),
                });
            }

            // A remote page may not send the clone to a local path.
            if url_scheme(&first.repo).is_none() {
                return Err(GetError::InvalidRepoRoot {
                    root: first.repo.clone(),
                    reason: format!("no scheme in repository declared at {}", url),
                });
            }

            tracing::debug!("Discovered {} at {}", first, url);
            return Ok(RepoRoot::new(*kind, first.repo.clone(), first.prefix.clone()));
        }
    }

    match last_failure {
        Some(failure) if !any_page => Err(failure),
        _ => Err(GetError::DiscoveryNotFound {
            path: path.to_string(),
            tried,
        }),
    }
}
