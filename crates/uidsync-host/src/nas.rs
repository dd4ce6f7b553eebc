//! NAS appliance backend.
//!
//! Every query and mutation is one `cli -c '<command>'` call to the
//! appliance's administrative CLI. The CLI only understands double quotes
//! inside a command, so values containing either quote character are
//! rejected before anything runs. Accounts are matched by uid, and the
//! CLI path offers no account removal.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use uidsync_core::error::{CoreError, CoreResult};
use uidsync_core::traits::{AccountAdmin, AccountOracle, CommandRunner, QuotaOp};
use uidsync_core::types::{AccountIdentity, CommandSpec, GroupRef, NewAccount};

const CLI_PROGRAM: &str = "cli";
const BACKEND: &str = "nas";

pub struct NasAccounts {
    runner: Arc<dyn CommandRunner>,
    /// Dataset user quotas are applied to.
    dataset: String,
}

impl NasAccounts {
    pub fn new(runner: Arc<dyn CommandRunner>, dataset: impl Into<String>) -> Self {
        Self {
            runner,
            dataset: dataset.into(),
        }
    }

    /// Build the `cli -c` invocation for one appliance command.
    pub fn cli_command(command: String) -> CoreResult<CommandSpec> {
        if command.contains('\'') {
            return Err(CoreError::invalid_identifier(
                command,
                "appliance commands must use double quotes only",
            ));
        }
        Ok(CommandSpec::new(CLI_PROGRAM, ["-c".to_string(), command]))
    }

    async fn run_cli(&self, command: String) -> CoreResult<()> {
        let spec = Self::cli_command(command)?;
        self.runner.run(&spec).await?;
        Ok(())
    }
}

/// A value placed inside double quotes in an appliance command.
fn quoted(value: &str) -> CoreResult<String> {
    if value.contains('"') || value.contains('\'') {
        return Err(CoreError::invalid_identifier(
            value,
            "quote characters are not allowed in appliance values",
        ));
    }
    Ok(format!("\"{value}\""))
}

fn quoted_path(path: &Path) -> CoreResult<String> {
    quoted(&path.to_string_lossy())
}

#[async_trait]
impl AccountOracle for NasAccounts {
    fn backend_name(&self) -> &str {
        BACKEND
    }

    async fn account_exists(&self, identity: &AccountIdentity) -> CoreResult<bool> {
        let spec = Self::cli_command(format!(
            "account user get_user_obj get_user_obj={{\"uid\": {}}}",
            identity.uid
        ))?
        .unchecked();
        let output = self.runner.run(&spec).await?;
        debug!(uid = identity.uid, code = output.code, "Queried appliance account");
        Ok(output.success())
    }

    async fn primary_group(&self, username: &str) -> CoreResult<Option<GroupRef>> {
        debug!(username = %username, "Primary group lookup requested on appliance");
        Err(CoreError::unsupported(BACKEND, "primary group lookup"))
    }

    async fn group_exists(&self, name: &str) -> CoreResult<bool> {
        let spec = Self::cli_command(format!(
            "account group get_group_obj get_group_obj={{\"groupname\": {}}}",
            quoted(name)?
        ))?
        .unchecked();
        Ok(self.runner.run(&spec).await?.success())
    }

    async fn host_usernames(&self) -> CoreResult<Vec<String>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl AccountAdmin for NasAccounts {
    async fn create_group(&self, name: &str, gid: u32) -> CoreResult<()> {
        self.run_cli(format!("account group create name={} gid={gid}", quoted(name)?))
            .await
    }

    async fn create_account(&self, account: &NewAccount) -> CoreResult<()> {
        let username = quoted(&account.username)?;
        // The appliance creates `<home>/<username>` itself.
        let home_parent = account.home.parent().unwrap_or(&account.home);
        let credentials = match &account.password {
            Some(password) => format!("password={}", quoted(password)?),
            None => "password_disabled=true".to_string(),
        };
        self.run_cli(format!(
            "account user create uid={uid} username={username} group={group} \
             full_name={username} home={home} home_mode=755 home_create=true \
             shell={shell} {credentials} smb=false",
            uid = account.uid,
            group = quoted(&account.group.to_string())?,
            home = quoted_path(home_parent)?,
            shell = quoted_path(&account.shell)?,
        ))
        .await?;
        info!(username = %account.username, uid = account.uid, "Created appliance account");
        Ok(())
    }

    async fn delete_account(&self, _username: &str, _remove_home: bool) -> CoreResult<()> {
        Err(CoreError::unsupported(BACKEND, "account deletion"))
    }

    fn supports_delete(&self) -> bool {
        false
    }
}

#[async_trait]
impl QuotaOp for NasAccounts {
    async fn set_quota(&self, uid: u32, bytes: u64) -> CoreResult<()> {
        self.run_cli(format!(
            "storage dataset set_quota ds={} quotas=[{{\"quota_type\": \"USER\", \"id\": {uid}, \"quota_value\": {bytes}}}]",
            quoted(&self.dataset)?
        ))
        .await
    }
}
