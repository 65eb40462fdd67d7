//! tagship - release versions and source archives from git tags

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tagship_cli::cmd;
use tagship_cli::cmd::archive::ArchiveArgs;
use tagship_cli::{Cli, Commands};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to enter {}", dir.display()))?;
    }

    match cli.command {
        Commands::Describe => cmd::describe::describe(),
        Commands::Version => cmd::describe::version(),
        Commands::List => cmd::describe::list(),
        Commands::Archive {
            format,
            prefix,
            output,
            allow_unreadable_tree,
            extra,
        } => cmd::archive::archive(
            &cli.config,
            ArchiveArgs {
                format,
                prefix,
                output,
                allow_unreadable_tree,
                extra,
            },
        ),
        Commands::Package { arch, format } => cmd::package::package(&cli.config, &arch, format),
        Commands::Test { integration, args } => cmd::run::test(integration, &args),
        Commands::Build { args } => cmd::run::build(&args),
        Commands::Install { args } => cmd::run::install(&args),
    }
}
