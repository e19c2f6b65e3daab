//! `wharf head` command

use anyhow::Result;

use crate::cli::HeadArgs;
use wharf::util::GlobalContext;

pub fn execute(args: HeadArgs, ctx: &GlobalContext) -> Result<()> {
    let downloader = ctx.downloader()?;
    println!("{}", downloader.head_ref(&args.import_path)?);
    Ok(())
}
