//! Deprovisioning action.
//!
//! Removing the login and removing bulk local storage are gated by
//! separate confirmations: an operator may remove the account and keep
//! its data.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::SyncConfig;
use crate::error::CoreResult;
use crate::services::HostServices;

/// What happened to an inactive account that still exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeprovisionOutcome {
    Deleted {
        removed_dirs: Vec<PathBuf>,
        kept_dirs: Vec<PathBuf>,
    },
    Declined,
    /// The backend cannot delete accounts.
    Manual,
}

pub struct Deprovisioner {
    config: Arc<SyncConfig>,
    services: HostServices,
}

impl Deprovisioner {
    pub fn new(config: Arc<SyncConfig>, services: HostServices) -> Self {
        Self { config, services }
    }

    /// Remove `username` and, separately confirmed, its local storage.
    ///
    /// The caller has established that the account exists and is inactive.
    pub async fn deprovision(&self, username: &str) -> CoreResult<DeprovisionOutcome> {
        let console = &self.services.console;

        if !self.services.admin.supports_delete() {
            console.say(&format!(
                "{username} exists but not active, please remove manually"
            ));
            return Ok(DeprovisionOutcome::Manual);
        }

        if !console.confirm(&format!("delete user {username}?"))? {
            console.say(&format!("keeping user {username}"));
            return Ok(DeprovisionOutcome::Declined);
        }

        console.say(&format!("deleting user {username}"));
        self.services.admin.delete_account(username, true).await?;
        tracing::info!(username = %username, "Deleted account");

        let mut removed_dirs = Vec::new();
        let mut kept_dirs = Vec::new();
        if let Some(local) = &self.config.local_storage {
            let fs = &self.services.fs;
            for mount in fs.discover_mounts(&local.parent, &local.prefix).await? {
                let dir = mount.user_dir(username);
                if fs.probe(&dir).await?.is_missing() {
                    continue;
                }
                if console.confirm(&format!("rm -rf '{}' ?", dir.display()))? {
                    fs.remove_tree(&dir).await?;
                    tracing::info!(path = %dir.display(), "Removed local storage directory");
                    removed_dirs.push(dir);
                } else {
                    kept_dirs.push(dir);
                }
            }
        }

        Ok(DeprovisionOutcome::Deleted {
            removed_dirs,
            kept_dirs,
        })
    }
}
