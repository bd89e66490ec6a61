//! IssueMiner - issue-to-commit linking for mined VCS history
//!
//! Recovers which commits fixed which tracked issues from commit messages
//! and derives a canonical ordering of the product's release versions.

use anyhow::Result;
use clap::Parser;
use issueminer::cli::{ingest, link, run, versions, Cli, Commands};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let db_path = Path::new(&cli.db);
    let config = issueminer::config::MinerConfig::load_or_default(Path::new(&cli.config))?;

    // Execute command
    match cli.command {
        Commands::Run(args) => {
            run(
                db_path,
                &config,
                Path::new(&args.backups_dir),
                &args.project,
                cli.format,
            )?;
            println!("✓ Pre-processing finished");
        }

        Commands::Link(args) => {
            link(
                db_path,
                &config,
                &args.project,
                args.tracker.map(Into::into),
                args.max_files,
                cli.format,
            )?;
        }

        Commands::Versions(args) => {
            versions(db_path, args.dry_run, cli.format)?;
        }

        Commands::Ingest(args) => {
            ingest(db_path, Path::new(&args.path))?;
        }
    }

    Ok(())
}
