//! Sync command - reconcile this host against the mapping file

use std::sync::Arc;

use clap::Args;
use uidsync_core::config::Profile;
use uidsync_core::desired::load_desired_state;
use uidsync_core::driver::Reconciler;
use uidsync_core::traits::{CommandRunner, Console};
use uidsync_host::{local_services, nas_services, ProcessRunner};

use crate::console::TerminalConsole;
use crate::error::CliResult;
use crate::preflight;
use crate::settings::Settings;

/// Arguments for the sync command
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Answer "no" to every confirmation; nothing is deleted
    #[arg(long)]
    pub assume_no: bool,
}

pub async fn execute(args: SyncArgs, settings: Settings) -> CliResult<()> {
    preflight::require_root()?;
    preflight::require_inputs(&settings.config)?;

    let Settings { profile, config } = settings;
    if config.password.is_legacy() {
        tracing::warn!(
            "Legacy password mode is enabled: initial passwords are derived from username and uid"
        );
    }

    let rows = load_desired_state(&config.mapping_file)?;
    tracing::info!(
        profile = %profile,
        mapping = %config.mapping_file.display(),
        rows = rows.len(),
        "Starting reconciliation"
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let console: Arc<dyn Console> = Arc::new(TerminalConsole::new(args.assume_no));
    let services = match profile {
        Profile::Workstation => local_services(&config, runner, console),
        Profile::Nas => nas_services(&config, runner, console),
    };

    let report = Reconciler::new(Arc::new(config), services)
        .run(&rows)
        .await?;

    println!("{}", report.counts());
    Ok(())
}
