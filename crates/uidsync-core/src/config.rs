//! Reconciliation configuration.
//!
//! Everything host-specific (group, shell, mount layout, quota, password
//! handling) lives in [`SyncConfig`], handed to the engine at construction
//! time. Two built-in [`Profile`]s cover the deployment targets.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{GroupRef, LinkPolicy, LinkSpec};

/// Placeholder replaced by the account name in templates.
pub const USERNAME_PLACEHOLDER: &str = "{username}";
/// Placeholder replaced by the account's home directory in link templates.
pub const HOME_PLACEHOLDER: &str = "{home}";
/// Placeholder replaced by the uid in password templates.
pub const UID_PLACEHOLDER: &str = "{uid}";

/// Built-in deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Compute node backed by the local account database.
    #[default]
    Workstation,
    /// Storage appliance administered through its CLI.
    Nas,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Workstation => write!(f, "workstation"),
            Profile::Nas => write!(f, "nas"),
        }
    }
}

/// The shared group every managed account belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub gid: u32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: "antnlp".to_string(),
            gid: 2000,
        }
    }
}

/// A link template rendered once per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTemplate {
    pub target: String,
    pub link: String,
    #[serde(default = "default_link_policy")]
    pub policy: LinkPolicy,
}

fn default_link_policy() -> LinkPolicy {
    LinkPolicy::Replace
}

impl LinkTemplate {
    pub fn new(target: &str, link: &str, policy: LinkPolicy) -> Self {
        Self {
            target: target.to_string(),
            link: link.to_string(),
            policy,
        }
    }

    /// Render for one user.
    pub fn render(&self, username: &str, home: &Path) -> LinkSpec {
        let home = home.to_string_lossy();
        let fill = |s: &str| {
            PathBuf::from(
                s.replace(HOME_PLACEHOLDER, &home)
                    .replace(USERNAME_PLACEHOLDER, username),
            )
        };
        LinkSpec {
            target: fill(&self.target),
            link: fill(&self.link),
            policy: self.policy,
        }
    }
}

/// Where local-storage mounts are discovered.
///
/// A directory `parent/<prefix><suffix>` is a mount; each user gets
/// `parent/<prefix><suffix>/<username>` and a link `<home>/<prefix><suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    #[serde(default = "default_local_parent")]
    pub parent: PathBuf,
    #[serde(default = "default_local_prefix")]
    pub prefix: String,
    #[serde(default = "default_dir_mode")]
    pub mode: u32,
}

fn default_local_parent() -> PathBuf {
    PathBuf::from("/mnt")
}

fn default_local_prefix() -> String {
    "local".to_string()
}

fn default_dir_mode() -> u32 {
    0o755
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            parent: default_local_parent(),
            prefix: default_local_prefix(),
            mode: default_dir_mode(),
        }
    }
}

/// Storage quota applied to newly created accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub bytes: u64,
    /// Dataset the quota is set on.
    pub dataset: String,
}

/// Initial password handling for new accounts.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PasswordPolicy {
    /// No password; key-based login only.
    #[default]
    Disabled,
    /// Password derived from `{username}` and `{uid}`.
    ///
    /// INSECURE: anyone who knows the pattern knows every initial password.
    /// Kept for hosts that still rely on it.
    LegacyTemplate { pattern: String },
}

impl fmt::Debug for PasswordPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordPolicy::Disabled => f.write_str("Disabled"),
            PasswordPolicy::LegacyTemplate { .. } => f
                .debug_struct("LegacyTemplate")
                .field("pattern", &"***REDACTED***")
                .finish(),
        }
    }
}

impl PasswordPolicy {
    pub fn is_legacy(&self) -> bool {
        matches!(self, PasswordPolicy::LegacyTemplate { .. })
    }

    /// Initial password for an account, if any.
    pub fn password_for(&self, username: &str, uid: u32) -> Option<String> {
        match self {
            PasswordPolicy::Disabled => None,
            PasswordPolicy::LegacyTemplate { pattern } => Some(
                pattern
                    .replace(USERNAME_PLACEHOLDER, username)
                    .replace(UID_PLACEHOLDER, &uid.to_string()),
            ),
        }
    }
}

/// Full configuration of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Desired-state CSV file.
    pub mapping_file: PathBuf,
    pub group: GroupConfig,
    pub shell: PathBuf,
    /// Parent of every managed home directory.
    pub home_root: PathBuf,
    /// Seed new homes from this directory's contents.
    pub home_template: Option<PathBuf>,
    /// Hidden cache directory created in seeded homes.
    pub cache_dir_name: String,
    pub links: Vec<LinkTemplate>,
    pub local_storage: Option<LocalStorageConfig>,
    pub quota: Option<QuotaConfig>,
    pub password: PasswordPolicy,
    /// Give accounts missing from the mapping file their local-storage links.
    pub orphan_links: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::for_profile(Profile::Workstation)
    }
}

impl SyncConfig {
    /// Defaults for a deployment profile.
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Workstation => Self {
                mapping_file: PathBuf::from("/nas/public/app/users/uid_mapping.csv"),
                group: GroupConfig::default(),
                shell: PathBuf::from("/usr/bin/zsh"),
                home_root: PathBuf::from("/home"),
                home_template: None,
                cache_dir_name: ".conda".to_string(),
                links: vec![
                    LinkTemplate::new("/nas/public", "{home}/public", LinkPolicy::Replace),
                    LinkTemplate::new("/nas/data/{username}", "{home}/data", LinkPolicy::Replace),
                    LinkTemplate::new("{home}/data/.conda", "{home}/.conda", LinkPolicy::IfAbsent),
                ],
                local_storage: Some(LocalStorageConfig::default()),
                quota: None,
                password: PasswordPolicy::Disabled,
                orphan_links: true,
            },
            Profile::Nas => Self {
                mapping_file: PathBuf::from("/mnt/truenas/nas/public/app/users/uid_mapping.csv"),
                group: GroupConfig::default(),
                shell: PathBuf::from("/usr/bin/zsh"),
                home_root: PathBuf::from("/mnt/truenas/nas/data"),
                home_template: Some(PathBuf::from("/mnt/truenas/nas/public/app/etc_skel")),
                cache_dir_name: ".conda".to_string(),
                links: Vec::new(),
                local_storage: None,
                quota: Some(QuotaConfig {
                    bytes: 5 * 1024 * 1024 * 1024 * 1024,
                    dataset: "truenas/nas".to_string(),
                }),
                password: PasswordPolicy::Disabled,
                orphan_links: false,
            },
        }
    }

    pub fn shared_group(&self) -> GroupRef {
        GroupRef::named(&self.group.name, self.group.gid)
    }

    pub fn home_for(&self, username: &str) -> PathBuf {
        self.home_root.join(username)
    }

    /// Link set for one user, in configuration order.
    pub fn links_for(&self, username: &str) -> Vec<LinkSpec> {
        let home = self.home_for(username);
        self.links
            .iter()
            .map(|t| t.render(username, &home))
            .collect()
    }

    /// Reject configurations that would act on nonsensical paths.
    pub fn validate(&self) -> CoreResult<()> {
        if self.group.name.trim().is_empty() {
            return Err(CoreError::Config("group name must not be empty".into()));
        }
        if !self.home_root.is_absolute() {
            return Err(CoreError::Config(format!(
                "home_root must be absolute: {}",
                self.home_root.display()
            )));
        }
        if self.cache_dir_name.is_empty() || self.cache_dir_name.contains('/') {
            return Err(CoreError::Config(format!(
                "cache_dir_name must be a single path component: {:?}",
                self.cache_dir_name
            )));
        }
        for link in &self.links {
            if link.target.trim().is_empty() || link.link.trim().is_empty() {
                return Err(CoreError::Config("link target and path must be set".into()));
            }
        }
        if let Some(local) = &self.local_storage {
            if local.prefix.is_empty() || local.prefix.contains('/') {
                return Err(CoreError::Config(format!(
                    "local_storage.prefix must be a single path component: {:?}",
                    local.prefix
                )));
            }
        }
        if let PasswordPolicy::LegacyTemplate { pattern } = &self.password {
            if pattern.is_empty() {
                return Err(CoreError::Config("legacy password pattern is empty".into()));
            }
        }
        Ok(())
    }
}
