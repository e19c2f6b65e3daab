//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Wharf - fetch repositories by import path and keep them in a local cache
#[derive(Parser)]
#[command(name = "wharf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Cache directory for checkouts
    #[arg(long, global = true, env = "WHARF_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Allow insecure transports (plain http, git://)
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Never use the network to resolve import paths
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the repository holding an import path and print its directory
    Get(GetArgs),

    /// Print where an import path lives in the cache
    Path(PathArgs),

    /// Resolve an import path to its repository without downloading
    Root(RootArgs),

    /// Check out a ref (or the best release tag) in an existing checkout
    Sync(SyncArgs),

    /// Print the revision currently checked out
    Head(HeadArgs),

    /// List the tags of an existing checkout
    Tags(TagsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct GetArgs {
    /// Import path, e.g. github.com/org/repo/subdir
    pub import_path: String,
}

#[derive(Args)]
pub struct PathArgs {
    /// Import path
    pub import_path: String,
}

#[derive(Args)]
pub struct RootArgs {
    /// Import path
    pub import_path: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Import path
    pub import_path: String,

    /// Commit, tag or branch; defaults to the best release tag
    pub reference: Option<String>,
}

#[derive(Args)]
pub struct HeadArgs {
    /// Import path
    pub import_path: String,
}

#[derive(Args)]
pub struct TagsArgs {
    /// Import path
    pub import_path: String,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
