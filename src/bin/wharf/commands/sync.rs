//! `wharf sync` command

use anyhow::{bail, Result};

use crate::cli::SyncArgs;
use wharf::util::GlobalContext;

pub fn execute(args: SyncArgs, ctx: &GlobalContext) -> Result<()> {
    let downloader = ctx.downloader()?;

    let reference = match args.reference {
        Some(reference) => {
            downloader.ref_sync(&args.import_path, &reference)?;
            reference
        }
        None => match downloader.sync_latest(&args.import_path)? {
            Some(tag) => tag,
            None => bail!("no release tags found for `{}`", args.import_path),
        },
    };

    eprintln!("      Synced {} to {}", args.import_path, reference);
    Ok(())
}
