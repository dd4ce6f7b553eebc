//! # uidsync host backends
//!
//! Concrete implementations of the `uidsync-core` capability traits:
//!
//! - [`ProcessRunner`] - spawns external commands with stderr filtering
//! - [`LocalAccounts`] - local passwd/group database and shadow-utils
//! - [`NasAccounts`] - NAS appliance administrative CLI, with quotas
//! - [`HostFilesystem`] - probes, directories, links and ownership

pub mod fs;
pub mod local;
pub mod nas;
pub mod runner;

use std::sync::Arc;

use uidsync_core::config::SyncConfig;
use uidsync_core::services::HostServices;
use uidsync_core::traits::{CommandRunner, Console};

pub use fs::HostFilesystem;
pub use local::LocalAccounts;
pub use nas::NasAccounts;
pub use runner::{display_command, ProcessRunner};

/// Services for a host managed through its local account database.
pub fn local_services(
    config: &SyncConfig,
    runner: Arc<dyn CommandRunner>,
    console: Arc<dyn Console>,
) -> HostServices {
    let accounts = Arc::new(LocalAccounts::new(runner.clone(), config.home_root.clone()));
    HostServices::new(
        accounts.clone(),
        accounts,
        Arc::new(HostFilesystem::new(runner)),
        console,
    )
}

/// Services for the NAS appliance. The quota capability is wired only when
/// a quota is configured.
pub fn nas_services(
    config: &SyncConfig,
    runner: Arc<dyn CommandRunner>,
    console: Arc<dyn Console>,
) -> HostServices {
    let dataset = config
        .quota
        .as_ref()
        .map(|q| q.dataset.clone())
        .unwrap_or_default();
    let accounts = Arc::new(NasAccounts::new(runner.clone(), dataset));
    let services = HostServices::new(
        accounts.clone(),
        accounts.clone(),
        Arc::new(HostFilesystem::new(runner)),
        console,
    );
    if config.quota.is_some() {
        services.with_quota(accounts)
    } else {
        services
    }
}
