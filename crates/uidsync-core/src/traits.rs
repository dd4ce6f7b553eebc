//! Capability traits the reconciliation engine calls through.
//!
//! The engine never touches the account database, the file system or a
//! process table directly. Each concern is a trait so that a backend only
//! implements what its host supports and tests can substitute fakes.

use std::path::Path;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{
    AccountIdentity, ChownMode, CommandOutput, CommandSpec, GroupRef, LocalMount, NewAccount,
    Owner, PathState,
};

/// Read-only view of the account database.
///
/// Every method is a pure query. A missing account or group is an answer
/// (`false` / `None`), never an error.
#[async_trait]
pub trait AccountOracle: Send + Sync {
    /// Short backend name used in diagnostics.
    fn backend_name(&self) -> &str;

    /// Whether an account matching `identity` exists.
    async fn account_exists(&self, identity: &AccountIdentity) -> CoreResult<bool>;

    /// Primary group of an existing account, `None` when the account is absent.
    async fn primary_group(&self, username: &str) -> CoreResult<Option<GroupRef>>;

    /// Whether a group with this name exists.
    async fn group_exists(&self, name: &str) -> CoreResult<bool>;

    /// Usernames of accounts present on this host, candidates for the
    /// orphan pass. Backends that cannot enumerate return an empty list.
    async fn host_usernames(&self) -> CoreResult<Vec<String>>;
}

/// Account database mutations.
#[async_trait]
pub trait AccountAdmin: Send + Sync {
    /// Create a group with a fixed gid.
    async fn create_group(&self, name: &str, gid: u32) -> CoreResult<()>;

    /// Create an account with its home directory.
    async fn create_account(&self, account: &NewAccount) -> CoreResult<()>;

    /// Remove an account, optionally together with its home directory.
    async fn delete_account(&self, username: &str, remove_home: bool) -> CoreResult<()>;

    /// Whether [`AccountAdmin::delete_account`] is available on this host.
    fn supports_delete(&self) -> bool {
        true
    }
}

/// Storage quota capability, only present on some backends.
#[async_trait]
pub trait QuotaOp: Send + Sync {
    async fn set_quota(&self, uid: u32, bytes: u64) -> CoreResult<()>;
}

/// File-system queries and mutations.
#[async_trait]
pub trait HostFs: Send + Sync {
    /// Inspect a path without following a final symlink.
    async fn probe(&self, path: &Path) -> CoreResult<PathState>;

    /// Create a directory and its parents, applying `mode` to the leaf.
    async fn make_dirs(&self, path: &Path, mode: u32) -> CoreResult<()>;

    /// Create a symlink at `link` pointing to `target`. With `overwrite`
    /// an existing link is replaced.
    async fn symlink(&self, target: &Path, link: &Path, overwrite: bool) -> CoreResult<()>;

    async fn chown(&self, path: &Path, owner: &Owner, mode: ChownMode) -> CoreResult<()>;

    /// Copy the contents of `src` into `dst`, not `src` itself.
    async fn copy_tree(&self, src: &Path, dst: &Path) -> CoreResult<()>;

    async fn remove_tree(&self, path: &Path) -> CoreResult<()>;

    /// Directories directly under `parent` whose name starts with `prefix`.
    async fn discover_mounts(&self, parent: &Path, prefix: &str) -> CoreResult<Vec<LocalMount>>;
}

/// Runs external privileged commands.
///
/// A checked command that exits non-zero yields
/// [`CoreError::CommandFailed`](crate::error::CoreError::CommandFailed).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> CoreResult<CommandOutput>;
}

/// Operator-facing output and confirmation.
///
/// Classification lines go through [`Console::say`] so they are visible
/// regardless of the log filter.
pub trait Console: Send + Sync {
    fn say(&self, line: &str);

    fn warn(&self, line: &str);

    /// Ask a yes/no question. Declining is `Ok(false)`.
    fn confirm(&self, prompt: &str) -> CoreResult<bool>;
}
