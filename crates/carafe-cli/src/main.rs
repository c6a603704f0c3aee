//! carafe - recipe-driven installer CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use carafe_cli::cmd;
use carafe_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Install { recipes } => cmd::install::install(&recipes, dry_run, quiet).await,
        Commands::Remove { names, yes } => cmd::remove::remove(&names, yes, dry_run, quiet),
        Commands::List => cmd::list::list(),
        Commands::Info { name } => cmd::info::info(&name),
        Commands::Check { recipes } => cmd::check::check(&recipes),
        Commands::Test { name } => cmd::test::test(&name).await,
        Commands::Hash { files } => cmd::hash::hash(&files),
        Commands::Clean => cmd::clean::clean(dry_run, quiet),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
