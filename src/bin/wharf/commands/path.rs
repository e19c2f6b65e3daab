//! `wharf path` command

use anyhow::Result;

use crate::cli::PathArgs;
use wharf::util::GlobalContext;
use wharf::ImportPath;

pub fn execute(args: PathArgs, ctx: &GlobalContext) -> Result<()> {
    let path = ImportPath::parse(&args.import_path)?;
    let downloader = ctx.downloader()?;

    println!("{}", downloader.destination_path(path.as_str()).display());
    Ok(())
}
