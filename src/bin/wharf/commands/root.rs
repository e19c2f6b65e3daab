//! `wharf root` command
//!
//! Shows what an import path resolves to: the repository root, its VCS
//! and the URL it would be cloned from.

use anyhow::{Context, Result};

use crate::cli::RootArgs;
use wharf::util::GlobalContext;

pub fn execute(args: RootArgs, ctx: &GlobalContext) -> Result<()> {
    let downloader = ctx.downloader()?;
    let rr = downloader.resolve(&args.import_path)?;

    if args.json {
        let json = serde_json::to_string_pretty(&rr).context("failed to serialize repository root")?;
        println!("{}", json);
    } else {
        println!("{} {} {}", rr.root, rr.kind.cmd(), rr.repo);
    }

    Ok(())
}
