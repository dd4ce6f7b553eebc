//! Run configuration resolution.
//!
//! Precedence, lowest first: built-in profile defaults, the optional YAML
//! file, individual command-line flags. The YAML file only needs the keys
//! it changes; nested tables are merged key by key.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use serde_yaml::Value;
use uidsync_core::config::{Profile, SyncConfig};

use crate::error::{CliError, CliResult};

/// Deployment target selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProfileArg {
    /// Compute node with a local account database
    #[default]
    Workstation,
    /// NAS appliance managed through its administrative CLI
    Nas,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Workstation => Profile::Workstation,
            ProfileArg::Nas => Profile::Nas,
        }
    }
}

/// Flags shared by every subcommand that needs a configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Deployment profile supplying the defaults
    #[arg(long, value_enum, default_value_t = ProfileArg::Workstation, global = true)]
    pub profile: ProfileArg,

    /// YAML file overriding profile defaults
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// uid mapping CSV file
    #[arg(long, value_name = "FILE", global = true)]
    pub mapping: Option<PathBuf>,

    /// Parent directory of user home directories
    #[arg(long, value_name = "DIR", global = true)]
    pub home_root: Option<PathBuf>,

    /// Template directory used to seed new home directories
    #[arg(long, value_name = "DIR", global = true)]
    pub template: Option<PathBuf>,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: Profile,
    pub config: SyncConfig,
}

impl Settings {
    pub fn resolve(args: &ConfigArgs) -> CliResult<Self> {
        let profile = Profile::from(args.profile);
        let mut config = SyncConfig::for_profile(profile);

        if let Some(path) = &args.config {
            config = overlay_file(config, path)?;
        }
        if let Some(mapping) = &args.mapping {
            config.mapping_file = mapping.clone();
        }
        if let Some(home_root) = &args.home_root {
            config.home_root = home_root.clone();
        }
        if let Some(template) = &args.template {
            config.home_template = Some(template.clone());
        }

        config.validate()?;
        tracing::debug!(profile = %profile, mapping = %config.mapping_file.display(), "Resolved configuration");
        Ok(Self { profile, config })
    }
}

fn overlay_file(base: SyncConfig, path: &Path) -> CliResult<SyncConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("cannot read {}: {e}", path.display())))?;
    overlay_yaml(base, &text)
}

/// Apply a partial YAML document on top of `base`.
pub fn overlay_yaml(base: SyncConfig, text: &str) -> CliResult<SyncConfig> {
    let overlay: Value = serde_yaml::from_str(text)?;
    match overlay {
        Value::Null => return Ok(base),
        Value::Mapping(_) => {}
        _ => {
            return Err(CliError::Config(
                "configuration file must be a YAML mapping".to_string(),
            ))
        }
    }

    let mut merged = serde_yaml::to_value(&base)?;
    merge(&mut merged, overlay);
    Ok(serde_yaml::from_value(merged)?)
}

/// Recursive mapping merge; anything that is not a mapping on both sides
/// is replaced wholesale, so lists are never concatenated.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uidsync_core::config::PasswordPolicy;

    #[test]
    fn test_profile_defaults_without_overrides() {
        let settings = Settings::resolve(&ConfigArgs {
            profile: ProfileArg::Nas,
            ..ConfigArgs::default()
        })
        .unwrap();
        assert_eq!(settings.profile, Profile::Nas);
        assert_eq!(settings.config, SyncConfig::for_profile(Profile::Nas));
    }

    #[test]
    fn test_partial_yaml_keeps_profile_defaults() {
        let base = SyncConfig::for_profile(Profile::Nas);
        let merged = overlay_yaml(base.clone(), "group:\n  gid: 3000\n").unwrap();

        assert_eq!(merged.group.gid, 3000);
        assert_eq!(merged.group.name, base.group.name);
        // not reset to workstation defaults
        assert_eq!(merged.home_root, base.home_root);
        assert_eq!(merged.quota, base.quota);
    }

    #[test]
    fn test_yaml_lists_replace_defaults() {
        let base = SyncConfig::for_profile(Profile::Workstation);
        let merged = overlay_yaml(
            base,
            "links:\n  - target: /srv/shared\n    link: \"{home}/shared\"\n",
        )
        .unwrap();
        assert_eq!(merged.links.len(), 1);
        assert_eq!(merged.links[0].target, "/srv/shared");
    }

    #[test]
    fn test_yaml_can_opt_into_legacy_passwords() {
        let merged = overlay_yaml(
            SyncConfig::default(),
            "password:\n  mode: legacy_template\n  pattern: \"{username}-{uid}\"\n",
        )
        .unwrap();
        assert!(merged.password.is_legacy());
        assert!(matches!(merged.password, PasswordPolicy::LegacyTemplate { .. }));
    }

    #[test]
    fn test_empty_yaml_is_noop() {
        let base = SyncConfig::default();
        assert_eq!(overlay_yaml(base.clone(), "").unwrap(), base);
    }

    #[test]
    fn test_non_mapping_yaml_rejected() {
        assert!(overlay_yaml(SyncConfig::default(), "- a\n- b\n").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("uidsync.yaml");
        std::fs::write(&file, "home_root: /srv/home\nshell: /bin/bash\n").unwrap();

        let settings = Settings::resolve(&ConfigArgs {
            config: Some(file),
            home_root: Some(PathBuf::from("/data/home")),
            mapping: Some(PathBuf::from("/tmp/map.csv")),
            ..ConfigArgs::default()
        })
        .unwrap();

        assert_eq!(settings.config.home_root, PathBuf::from("/data/home"));
        assert_eq!(settings.config.shell, PathBuf::from("/bin/bash"));
        assert_eq!(settings.config.mapping_file, PathBuf::from("/tmp/map.csv"));
    }

    #[test]
    fn test_invalid_result_rejected() {
        let err = Settings::resolve(&ConfigArgs {
            home_root: Some(PathBuf::from("relative/home")),
            ..ConfigArgs::default()
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
