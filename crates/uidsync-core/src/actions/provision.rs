//! Provisioning actions.
//!
//! Each action checks the current state first and only mutates what is
//! missing, so running it again once it has succeeded changes nothing.

use std::path::Path;
use std::sync::Arc;

use crate::config::SyncConfig;
use crate::desired::DesiredAccountRecord;
use crate::error::CoreResult;
use crate::services::HostServices;
use crate::types::{ChownMode, GroupRef, LinkPolicy, LinkSpec, NewAccount, Owner, PathState};

/// Whether the shared group was already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    Existing,
    Created,
}

/// Idempotent provisioning operations for one host.
pub struct Provisioner {
    config: Arc<SyncConfig>,
    services: HostServices,
}

impl Provisioner {
    pub fn new(config: Arc<SyncConfig>, services: HostServices) -> Self {
        Self { config, services }
    }

    /// Create the shared group with its fixed gid if it is missing.
    pub async fn ensure_group(&self) -> CoreResult<GroupStatus> {
        let group = &self.config.group;
        if self.services.oracle.group_exists(&group.name).await? {
            self.services
                .console
                .say(&format!("group {} exists", group.name));
            return Ok(GroupStatus::Existing);
        }

        self.services
            .console
            .say(&format!("creating group {}", group.name));
        self.services
            .admin
            .create_group(&group.name, group.gid)
            .await?;
        tracing::info!(group = %group.name, gid = group.gid, "Created shared group");
        Ok(GroupStatus::Created)
    }

    /// Create the system account for a record with the shared group as
    /// primary group.
    pub async fn create_account(&self, record: &DesiredAccountRecord) -> CoreResult<()> {
        let username = record.account_name();
        let password = self.config.password.password_for(username, record.uid);
        if password.is_some() {
            tracing::warn!(
                username = %username,
                "Assigning a template-derived password; legacy password mode is insecure"
            );
        }

        let account = NewAccount {
            username: username.to_string(),
            uid: record.uid,
            group: self.config.shared_group(),
            shell: self.config.shell.clone(),
            home: self.config.home_for(username),
            password,
        };
        self.services.admin.create_account(&account).await?;
        tracing::info!(username = %username, uid = record.uid, "Created account");
        Ok(())
    }

    /// Seed a new home from the template directory, when one is configured.
    ///
    /// Copies the template's contents (never the directory node itself),
    /// ensures the cache directory, then hands the whole tree to the user.
    /// Returns whether seeding ran.
    pub async fn populate_home(&self, username: &str) -> CoreResult<bool> {
        let Some(template) = &self.config.home_template else {
            return Ok(false);
        };
        let fs = &self.services.fs;
        let home = self.config.home_for(username);

        fs.copy_tree(template, &home).await?;

        let cache_dir = home.join(&self.config.cache_dir_name);
        if fs.probe(&cache_dir).await?.is_missing() {
            fs.make_dirs(&cache_dir, 0o755).await?;
        }

        let owner = Owner::new(username, self.config.shared_group());
        fs.chown(&home, &owner, ChownMode::Recursive).await?;
        tracing::info!(username = %username, template = %template.display(), "Seeded home directory");
        Ok(true)
    }

    /// Create or repair the configured link set in the user's home.
    ///
    /// Returns how many links were (re)created.
    pub async fn ensure_symlinks(&self, username: &str, group: &GroupRef) -> CoreResult<usize> {
        let owner = Owner::new(username, group.clone());
        let mut changed = 0;
        for spec in self.config.links_for(username) {
            if self.ensure_link(&spec, &owner).await? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Per-user directory and link for every local-storage mount.
    ///
    /// `group` is the shared group for managed accounts and the account's
    /// own primary group for orphans. Returns how many directories and
    /// links were created.
    pub async fn ensure_local_storage(&self, username: &str, group: &GroupRef) -> CoreResult<usize> {
        let Some(local) = &self.config.local_storage else {
            return Ok(0);
        };
        let fs = &self.services.fs;
        let owner = Owner::new(username, group.clone());
        let home = self.config.home_for(username);
        let mut changed = 0;

        for mount in fs.discover_mounts(&local.parent, &local.prefix).await? {
            let user_dir = mount.user_dir(username);
            if fs.probe(&user_dir).await?.is_missing() {
                fs.make_dirs(&user_dir, local.mode).await?;
                fs.chown(&user_dir, &owner, ChownMode::Single).await?;
                tracing::info!(path = %user_dir.display(), "Created local storage directory");
                changed += 1;
            }

            let link = LinkSpec {
                target: user_dir,
                link: home.join(format!("{}{}", local.prefix, mount.suffix)),
                policy: LinkPolicy::IfAbsent,
            };
            if self.ensure_link(&link, &owner).await? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Apply the configured quota, when both the config and the backend
    /// support it. Returns whether a quota was set.
    pub async fn set_quota(&self, uid: u32) -> CoreResult<bool> {
        let (Some(quota), Some(op)) = (&self.config.quota, &self.services.quota) else {
            return Ok(false);
        };
        op.set_quota(uid, quota.bytes).await?;
        tracing::info!(uid, bytes = quota.bytes, "Applied storage quota");
        Ok(true)
    }

    /// Bring one link in line with its policy. Returns whether it was created
    /// or re-pointed.
    async fn ensure_link(&self, spec: &LinkSpec, owner: &Owner) -> CoreResult<bool> {
        let fs = &self.services.fs;
        match (fs.probe(&spec.link).await?, spec.policy) {
            (PathState::Missing, _) => {}
            (PathState::Symlink(current), LinkPolicy::Replace) => {
                if same_target(&current, &spec.target) {
                    return Ok(false);
                }
                tracing::info!(
                    link = %spec.link.display(),
                    from = %current.display(),
                    to = %spec.target.display(),
                    "Re-pointing link"
                );
            }
            (PathState::Directory | PathState::File, LinkPolicy::Replace) => {
                self.services.console.warn(&format!(
                    "{} exists and is not a symlink, leaving it in place",
                    spec.link.display()
                ));
                return Ok(false);
            }
            (_, LinkPolicy::IfAbsent) => {
                tracing::debug!(link = %spec.link.display(), "Link path occupied, keeping it");
                return Ok(false);
            }
        }

        fs.symlink(&spec.target, &spec.link, spec.policy == LinkPolicy::Replace)
            .await?;
        fs.chown(&spec.link, owner, ChownMode::LinkItself).await?;
        Ok(true)
    }
}

fn same_target(current: &Path, wanted: &Path) -> bool {
    current.components().eq(wanted.components())
}
