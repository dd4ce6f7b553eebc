//! Host file-system backend.
//!
//! Probing, directory creation and mount discovery use the standard
//! library. Links, ownership, tree copies and removals go through the
//! command runner, like every other privileged mutation.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use uidsync_core::error::{CoreError, CoreResult};
use uidsync_core::traits::{CommandRunner, HostFs};
use uidsync_core::types::{ChownMode, CommandSpec, LocalMount, Owner, PathState};

pub struct HostFilesystem {
    runner: Arc<dyn CommandRunner>,
}

impl HostFilesystem {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn run(&self, spec: CommandSpec) -> CoreResult<()> {
        self.runner.run(&spec).await.map(|_| ())
    }
}

#[async_trait]
impl HostFs for HostFilesystem {
    async fn probe(&self, path: &Path) -> CoreResult<PathState> {
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PathState::Missing),
            Err(e) => return Err(CoreError::io(path, e)),
        };
        let file_type = meta.file_type();
        if file_type.is_symlink() {
            let target = tokio::fs::read_link(path)
                .await
                .map_err(|e| CoreError::io(path, e))?;
            Ok(PathState::Symlink(target))
        } else if file_type.is_dir() {
            Ok(PathState::Directory)
        } else {
            Ok(PathState::File)
        }
    }

    async fn make_dirs(&self, path: &Path, mode: u32) -> CoreResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        // create_dir_all is subject to the umask
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| CoreError::io(path, e))?;
        debug!(path = %path.display(), mode = format!("{mode:o}"), "Created directory");
        Ok(())
    }

    async fn symlink(&self, target: &Path, link: &Path, overwrite: bool) -> CoreResult<()> {
        // -T: never create the link inside an existing directory
        let flags = if overwrite { "-sfnT" } else { "-snT" };
        self.run(
            CommandSpec::new("ln", [flags])
                .arg_path(target)
                .arg_path(link),
        )
        .await
    }

    async fn chown(&self, path: &Path, owner: &Owner, mode: ChownMode) -> CoreResult<()> {
        let mut args = Vec::new();
        match mode {
            ChownMode::Single => {}
            ChownMode::Recursive => args.push("-R".to_string()),
            ChownMode::LinkItself => args.push("-h".to_string()),
        }
        args.push(owner.spec());
        self.run(CommandSpec::new("chown", args).arg_path(path)).await
    }

    async fn copy_tree(&self, src: &Path, dst: &Path) -> CoreResult<()> {
        // -T copies the contents of src into dst rather than src itself
        self.run(CommandSpec::new("cp", ["-RT"]).arg_path(src).arg_path(dst))
            .await
    }

    async fn remove_tree(&self, path: &Path) -> CoreResult<()> {
        if path.parent().is_none() {
            return Err(CoreError::invalid_identifier(
                path.display().to_string(),
                "refusing to remove a file-system root",
            ));
        }
        self.run(CommandSpec::new("rm", ["-rf"]).arg_path(path)).await
    }

    async fn discover_mounts(&self, parent: &Path, prefix: &str) -> CoreResult<Vec<LocalMount>> {
        let mut entries = match tokio::fs::read_dir(parent).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CoreError::io(parent, e)),
        };

        let mut mounts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CoreError::io(parent, e))?
        {
            let name = entry.file_name();
            let Some(suffix) = name.to_str().and_then(|n| n.strip_prefix(prefix)) else {
                continue;
            };
            let path: PathBuf = entry.path();
            // follow symlinks so a linked mount point still counts
            let is_dir = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                mounts.push(LocalMount::new(path, suffix));
            }
        }
        mounts.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(parent = %parent.display(), count = mounts.len(), "Discovered local storage mounts");
        Ok(mounts)
    }
}
