//! `wharf get` command

use anyhow::Result;

use crate::cli::GetArgs;
use wharf::util::GlobalContext;

pub fn execute(args: GetArgs, ctx: &GlobalContext) -> Result<()> {
    let downloader = ctx.downloader()?;
    let path = downloader.download(&args.import_path)?;

    println!("{}", path.display());
    Ok(())
}
