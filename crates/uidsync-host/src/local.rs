//! Local account database backend.
//!
//! Queries go straight to the user and group databases through `nix`;
//! mutations run the shadow-utils tools (`groupadd`, `useradd`, `chpasswd`,
//! `userdel`). Accounts are matched by username.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nix::unistd::{Gid, Group, User};
use tracing::{debug, info};

use uidsync_core::error::{CoreError, CoreResult};
use uidsync_core::traits::{AccountAdmin, AccountOracle, CommandRunner};
use uidsync_core::types::{AccountIdentity, CommandSpec, GroupRef, NewAccount};

/// Stderr noise from `chpasswd` when a password fails the quality check.
const BAD_PASSWORD_NOISE: &str = "BAD PASSWORD";
/// Stderr noise from `userdel -r` for accounts that never received mail.
const MAIL_SPOOL_NOISE: &str = "mail spool";

/// Account backend for a host with a local passwd/group database.
pub struct LocalAccounts {
    runner: Arc<dyn CommandRunner>,
    /// Directory listed to find orphan candidates.
    home_root: PathBuf,
}

impl LocalAccounts {
    pub fn new(runner: Arc<dyn CommandRunner>, home_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            home_root: home_root.into(),
        }
    }

    fn lookup_user(username: &str) -> CoreResult<Option<User>> {
        User::from_name(username)
            .map_err(|e| CoreError::Lookup(format!("user {username}: {e}")))
    }
}

/// Reject names the account tools would misread as options or that would
/// corrupt `chpasswd` input.
pub fn validate_username(username: &str) -> CoreResult<()> {
    if username.is_empty() {
        return Err(CoreError::invalid_identifier(username, "empty name"));
    }
    if username.starts_with('-') {
        return Err(CoreError::invalid_identifier(
            username,
            "must not start with '-'",
        ));
    }
    if let Some(bad) = username
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, ':' | '/' | ','))
    {
        return Err(CoreError::invalid_identifier(
            username,
            format!("contains {bad:?}"),
        ));
    }
    Ok(())
}

#[async_trait]
impl AccountOracle for LocalAccounts {
    fn backend_name(&self) -> &str {
        "local"
    }

    async fn account_exists(&self, identity: &AccountIdentity) -> CoreResult<bool> {
        Ok(Self::lookup_user(&identity.username)?.is_some())
    }

    async fn primary_group(&self, username: &str) -> CoreResult<Option<GroupRef>> {
        let Some(user) = Self::lookup_user(username)? else {
            return Ok(None);
        };
        let gid = user.gid.as_raw();
        let group = Group::from_gid(Gid::from_raw(gid))
            .map_err(|e| CoreError::Lookup(format!("gid {gid}: {e}")))?;
        Ok(Some(match group {
            Some(group) => GroupRef::named(group.name, gid),
            None => GroupRef::gid_only(gid),
        }))
    }

    async fn group_exists(&self, name: &str) -> CoreResult<bool> {
        let group = Group::from_name(name)
            .map_err(|e| CoreError::Lookup(format!("group {name}: {e}")))?;
        Ok(group.is_some())
    }

    async fn host_usernames(&self) -> CoreResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.home_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CoreError::io(&self.home_root, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CoreError::io(&self.home_root, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if Self::lookup_user(&name)?.is_some() {
                names.push(name);
            } else {
                debug!(entry = %name, "Home entry without an account");
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl AccountAdmin for LocalAccounts {
    async fn create_group(&self, name: &str, gid: u32) -> CoreResult<()> {
        validate_username(name)?;
        let spec = CommandSpec::new(
            "groupadd",
            ["--gid".to_string(), gid.to_string(), name.to_string()],
        );
        self.runner.run(&spec).await?;
        Ok(())
    }

    async fn create_account(&self, account: &NewAccount) -> CoreResult<()> {
        validate_username(&account.username)?;
        let spec = CommandSpec::new(
            "useradd",
            [
                "--uid".to_string(),
                account.uid.to_string(),
                "--gid".to_string(),
                account.group.gid.to_string(),
                "--shell".to_string(),
                account.shell.to_string_lossy().into_owned(),
                "--home-dir".to_string(),
                account.home.to_string_lossy().into_owned(),
                "--create-home".to_string(),
                account.username.clone(),
            ],
        );
        self.runner.run(&spec).await?;

        if let Some(password) = &account.password {
            let spec = CommandSpec::new("chpasswd", Vec::<String>::new())
                .with_input(format!("{}:{}\n", account.username, password))
                .suppressing(BAD_PASSWORD_NOISE);
            self.runner.run(&spec).await?;
            info!(username = %account.username, "Assigned initial password");
        }
        Ok(())
    }

    async fn delete_account(&self, username: &str, remove_home: bool) -> CoreResult<()> {
        validate_username(username)?;
        let mut args = Vec::new();
        if remove_home {
            args.push("-r".to_string());
        }
        args.push(username.to_string());
        let spec = CommandSpec::new("userdel", args).suppressing(MAIL_SPOOL_NOISE);
        self.runner.run(&spec).await?;
        Ok(())
    }
}
