//! Wharf CLI - fetch repositories by import path

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wharf::util::diagnostic::emit;
use wharf::util::GlobalContext;
use wharf::GetError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<GetError>() {
            Some(err) => emit(&err.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("wharf=debug")
    } else {
        EnvFilter::new("wharf=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    let mut ctx = GlobalContext::new()?;
    ctx.set_cache_dir(cli.cache_dir);
    ctx.set_insecure(cli.insecure);
    ctx.set_offline(cli.offline);

    match cli.command {
        Commands::Get(args) => commands::get::execute(args, &ctx),
        Commands::Path(args) => commands::path::execute(args, &ctx),
        Commands::Root(args) => commands::root::execute(args, &ctx),
        Commands::Sync(args) => commands::sync::execute(args, &ctx),
        Commands::Head(args) => commands::head::execute(args, &ctx),
        Commands::Tags(args) => commands::tags::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
