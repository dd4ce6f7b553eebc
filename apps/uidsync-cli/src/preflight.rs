//! Entry checks that must pass before anything on the host is touched.

use nix::unistd::geteuid;
use uidsync_core::config::SyncConfig;
use uidsync_core::error::CoreError;

use crate::error::{CliError, CliResult};

/// Refuse to continue without root privileges.
pub fn require_root() -> CliResult<()> {
    let euid = geteuid();
    if euid.is_root() {
        Ok(())
    } else {
        Err(CliError::NotRoot(euid.as_raw()))
    }
}

/// Inputs the run reads must exist up front: the mapping file and, when
/// homes are seeded, the template directory.
pub fn require_inputs(config: &SyncConfig) -> CliResult<()> {
    if !config.mapping_file.is_file() {
        return Err(CoreError::Precondition(format!(
            "uid mapping file not found at {}",
            config.mapping_file.display()
        ))
        .into());
    }
    if let Some(template) = &config.home_template {
        if !template.is_dir() {
            return Err(CoreError::Precondition(format!(
                "home template directory not found at {}",
                template.display()
            ))
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mapping_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            mapping_file: dir.path().join("uid_mapping.csv"),
            ..SyncConfig::default()
        };
        let err = require_inputs(&config).unwrap_err();
        assert!(err.to_string().contains("uid mapping file not found"));
    }

    #[test]
    fn test_missing_template_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mapping = dir.path().join("uid_mapping.csv");
        std::fs::write(&mapping, "username,uid,active,comment\n").unwrap();
        let config = SyncConfig {
            mapping_file: mapping,
            home_template: Some(dir.path().join("etc_skel")),
            ..SyncConfig::default()
        };
        assert!(require_inputs(&config).is_err());
    }

    #[test]
    fn test_present_inputs_pass() {
        let dir = tempfile::tempdir().unwrap();
        let mapping = dir.path().join("uid_mapping.csv");
        std::fs::write(&mapping, "username,uid,active,comment\n").unwrap();
        std::fs::create_dir(dir.path().join("etc_skel")).unwrap();
        let config = SyncConfig {
            mapping_file: mapping,
            home_template: Some(dir.path().join("etc_skel")),
            ..SyncConfig::default()
        };
        assert!(require_inputs(&config).is_ok());
    }
}
