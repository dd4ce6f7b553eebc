//! uidsync - reconcile host accounts against the uid mapping file
//!
//! - `sync` creates missing active accounts, repairs their links, offers
//!   to delete inactive ones and links local storage for unlisted accounts
//! - `check` validates the mapping file without touching the host
//! - `profile` prints the resolved configuration

use clap::{ArgAction, Parser, Subcommand};

use uidsync_cli::commands;
use uidsync_cli::error::CliResult;
use uidsync_cli::logging;
use uidsync_cli::settings::{ConfigArgs, Settings};

/// Reconcile system accounts with a declarative uid mapping
#[derive(Parser)]
#[command(name = "uidsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile this host against the mapping file (requires root)
    Sync(commands::sync::SyncArgs),

    /// Validate the mapping file and report problems
    Check(commands::check::CheckArgs),

    /// Print the resolved configuration as YAML
    Profile(commands::profile::ProfileArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let settings = Settings::resolve(&cli.config)?;
    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args, settings).await,
        Commands::Check(args) => commands::check::execute(args, settings).await,
        Commands::Profile(args) => commands::profile::execute(args, settings).await,
    }
}
