//! `wharf tags` command
//!
//! Lists tags, marking the one `wharf sync` would pick with `*`.

use anyhow::Result;

use crate::cli::TagsArgs;
use wharf::util::GlobalContext;
use wharf::vcs::tag::select_tag;

pub fn execute(args: TagsArgs, ctx: &GlobalContext) -> Result<()> {
    let downloader = ctx.downloader()?;
    let tags = downloader.tags(&args.import_path)?;

    if tags.is_empty() {
        eprintln!("No tags found for {}", args.import_path);
        return Ok(());
    }

    let selected = select_tag(&tags);
    for tag in &tags {
        let marker = if selected.as_deref() == Some(tag.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, tag);
    }

    Ok(())
}
