//! Resolution and fetch error types.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::vcs::VcsKind;

/// Error while resolving, fetching or inspecting a repository.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum GetError {
    #[error("invalid import path `{path}`: {reason}")]
    #[diagnostic(code(wharf::resolve::invalid_import_path))]
    InvalidImportPath { path: String, reason: String },

    #[error("unrecognized import path `{path}`: {reason}")]
    #[diagnostic(code(wharf::resolve::no_pattern_match))]
    NoPatternMatch { path: String, reason: String },

    #[error("ambiguous repository metadata for `{path}` at {url}")]
    #[diagnostic(
        code(wharf::resolve::ambiguous),
        help("the host declares conflicting repositories for this path")
    )]
    AmbiguousDiscovery {
        path: String,
        url: String,
        records: Vec<String>,
    },

    #[error("no repository metadata found for `{path}`")]
    #[diagnostic(code(wharf::resolve::not_found))]
    DiscoveryNotFound { path: String, tried: Vec<String> },

    #[error("refusing insecure {kind} transport for `{url}`")]
    #[diagnostic(
        code(wharf::resolve::insecure),
        help("pass --insecure to allow insecure transports")
    )]
    InsecureTransportRejected { url: String, kind: VcsKind },

    #[error("invalid repository root `{root}`: {reason}")]
    #[diagnostic(code(wharf::resolve::invalid_repo_root))]
    InvalidRepoRoot { root: String, reason: String },

    #[error("invalid reference `{reference}`: {reason}")]
    #[diagnostic(code(wharf::fetch::invalid_reference))]
    InvalidReference { reference: String, reason: String },

    #[error("destination {} does not exist", path.display())]
    #[diagnostic(code(wharf::fetch::destination_not_found))]
    DestinationNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("directory {} is not a known checkout: {reason}", dir.display())]
    #[diagnostic(code(wharf::fetch::not_a_checkout))]
    NotACheckout { dir: PathBuf, reason: String },

    #[error("`{command}` failed with exit code {code:?}\n{output}")]
    #[diagnostic(code(wharf::fetch::command_failed))]
    ExternalCommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("request to {url} failed: {message}")]
    #[diagnostic(code(wharf::resolve::network))]
    NetworkFailure { url: String, message: String },

    #[error("unknown version control system `{name}`")]
    #[diagnostic(code(wharf::vcs::unknown))]
    UnknownVcs { name: String },

    #[error("{context}")]
    #[diagnostic(code(wharf::io))]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl GetError {
    /// Build an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        GetError::Io {
            context: context.into(),
            source,
        }
    }

    /// True when the error means "nothing has been downloaded here yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, GetError::DestinationNotFound { .. })
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GetError::InvalidImportPath { path, reason } => {
                Diagnostic::error(format!("invalid import path `{}`", path))
                    .with_context(reason.clone())
                    .with_suggestion(suggestions::IMPORT_PATH_SHAPE)
            }

            GetError::NoPatternMatch { path, reason } => {
                Diagnostic::error(format!("unrecognized import path `{}`", path))
                    .with_context(reason.clone())
                    .with_suggestion(suggestions::IMPORT_PATH_SHAPE)
            }

            GetError::AmbiguousDiscovery { path, url, records } => {
                let mut diag = Diagnostic::error(format!(
                    "ambiguous repository metadata for `{}`",
                    path
                ))
                .with_context(format!("fetched from {}", url));
                for record in records {
                    diag = diag.with_context(format!("declares {}", record));
                }
                diag.with_suggestion("Ask the host to declare a single repository for this path")
            }

            GetError::DiscoveryNotFound { path, tried } => {
                let mut diag =
                    Diagnostic::error(format!("no repository metadata found for `{}`", path));
                for url in tried {
                    diag = diag.with_context(format!("tried {}", url));
                }
                diag.with_suggestion(suggestions::FETCH_FAILED)
            }

            GetError::InsecureTransportRejected { url, kind } => Diagnostic::error(format!(
                "refusing insecure {} transport for `{}`",
                kind, url
            ))
            .with_suggestion(suggestions::INSECURE),

            GetError::DestinationNotFound { path, .. } => {
                Diagnostic::error(format!("{} does not exist", path.display()))
                    .with_suggestion(suggestions::NOT_DOWNLOADED)
            }

            GetError::NetworkFailure { url, message } => {
                Diagnostic::error(format!("request to {} failed", url))
                    .with_context(message.clone())
                    .with_suggestion(suggestions::FETCH_FAILED)
            }

            GetError::ExternalCommandFailed {
                command,
                code,
                output,
            } => {
                let mut diag = Diagnostic::error(format!("`{}` failed", command));
                if let Some(code) = code {
                    diag = diag.with_context(format!("exit code {}", code));
                }
                for line in output.lines().filter(|l| !l.trim().is_empty()) {
                    diag = diag.with_context(line.to_string());
                }
                diag
            }

            other => Diagnostic::error(other.to_string()),
        }
    }
}
