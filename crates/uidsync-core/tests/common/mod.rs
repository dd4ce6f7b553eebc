//! In-memory host used by the reconciliation tests.
//!
//! `FakeHost` implements every capability trait over one shared state so
//! tests can assert on the resulting accounts, paths and mutation log.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uidsync_core::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeAccount {
    pub uid: u32,
    pub gid: u32,
    pub shell: PathBuf,
    pub home: PathBuf,
    pub password: Option<String>,
}

#[derive(Debug, Default)]
pub struct HostState {
    pub accounts: BTreeMap<String, FakeAccount>,
    pub groups: BTreeMap<String, u32>,
    pub paths: BTreeMap<PathBuf, PathState>,
    pub owners: BTreeMap<PathBuf, (String, ChownMode)>,
    pub mounts: Vec<LocalMount>,
    pub quotas: Vec<(u32, u64)>,
    /// Mutating calls in order, e.g. `create_account alice`.
    pub calls: Vec<String>,
}

pub struct FakeHost {
    pub state: Mutex<HostState>,
    /// Match accounts by uid instead of name, like the NAS appliance.
    pub match_by_uid: bool,
    pub can_delete: bool,
    /// Username whose creation fails with a command error.
    pub fail_create_for: Option<String>,
    pub query_count: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState::default()),
            match_by_uid: false,
            can_delete: true,
            fail_create_for: None,
            query_count: AtomicUsize::new(0),
        }
    }

    pub fn with_group(self, name: &str, gid: u32) -> Self {
        self.state.lock().unwrap().groups.insert(name.to_string(), gid);
        self
    }

    pub fn with_account(self, name: &str, uid: u32, gid: u32) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let home = PathBuf::from("/home").join(name);
            state.accounts.insert(
                name.to_string(),
                FakeAccount {
                    uid,
                    gid,
                    shell: PathBuf::from("/bin/bash"),
                    home: home.clone(),
                    password: None,
                },
            );
            state.paths.insert(home, PathState::Directory);
        }
        self
    }

    pub fn with_mount(self, path: &str, suffix: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.mounts.push(LocalMount::new(path, suffix));
            state.paths.insert(PathBuf::from(path), PathState::Directory);
        }
        self
    }

    pub fn with_path(self, path: &str, kind: PathState) -> Self {
        self.state
            .lock()
            .unwrap()
            .paths
            .insert(PathBuf::from(path), kind);
        self
    }

    pub fn failing_create(mut self, username: &str) -> Self {
        self.fail_create_for = Some(username.to_string());
        self
    }

    pub fn nas_like(mut self) -> Self {
        self.match_by_uid = true;
        self.can_delete = false;
        self
    }

    pub fn account(&self, name: &str) -> Option<FakeAccount> {
        self.state.lock().unwrap().accounts.get(name).cloned()
    }

    pub fn path(&self, path: &str) -> PathState {
        self.state
            .lock()
            .unwrap()
            .paths
            .get(Path::new(path))
            .cloned()
            .unwrap_or(PathState::Missing)
    }

    pub fn owner(&self, path: &str) -> Option<(String, ChownMode)> {
        self.state.lock().unwrap().owners.get(Path::new(path)).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn log(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait::async_trait]
impl AccountOracle for FakeHost {
    fn backend_name(&self) -> &str {
        "fake"
    }

    async fn account_exists(&self, identity: &AccountIdentity) -> CoreResult<bool> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if self.match_by_uid {
            Ok(state.accounts.values().any(|a| a.uid == identity.uid))
        } else {
            Ok(state.accounts.contains_key(&identity.username))
        }
    }

    async fn primary_group(&self, username: &str) -> CoreResult<Option<GroupRef>> {
        let state = self.state.lock().unwrap();
        Ok(state.accounts.get(username).map(|a| {
            state
                .groups
                .iter()
                .find(|(_, gid)| **gid == a.gid)
                .map(|(name, gid)| GroupRef::named(name, *gid))
                .unwrap_or_else(|| GroupRef::gid_only(a.gid))
        }))
    }

    async fn group_exists(&self, name: &str) -> CoreResult<bool> {
        Ok(self.state.lock().unwrap().groups.contains_key(name))
    }

    async fn host_usernames(&self) -> CoreResult<Vec<String>> {
        Ok(self.state.lock().unwrap().accounts.keys().cloned().collect())
    }
}

#[async_trait::async_trait]
impl AccountAdmin for FakeHost {
    async fn create_group(&self, name: &str, gid: u32) -> CoreResult<()> {
        self.log(format!("create_group {name} {gid}"));
        self.state.lock().unwrap().groups.insert(name.to_string(), gid);
        Ok(())
    }

    async fn create_account(&self, account: &NewAccount) -> CoreResult<()> {
        if self.fail_create_for.as_deref() == Some(account.username.as_str()) {
            return Err(CoreError::CommandFailed {
                command: format!("useradd {}", account.username),
                code: 4,
                stderr: "useradd: UID already in use".to_string(),
            });
        }
        self.log(format!("create_account {}", account.username));
        let mut state = self.state.lock().unwrap();
        state.accounts.insert(
            account.username.clone(),
            FakeAccount {
                uid: account.uid,
                gid: account.group.gid,
                shell: account.shell.clone(),
                home: account.home.clone(),
                password: account.password.clone(),
            },
        );
        state.paths.insert(account.home.clone(), PathState::Directory);
        Ok(())
    }

    async fn delete_account(&self, username: &str, remove_home: bool) -> CoreResult<()> {
        self.log(format!("delete_account {username} {remove_home}"));
        let mut state = self.state.lock().unwrap();
        if let Some(account) = state.accounts.remove(username) {
            if remove_home {
                state.paths.retain(|p, _| !p.starts_with(&account.home));
            }
        }
        Ok(())
    }

    fn supports_delete(&self) -> bool {
        self.can_delete
    }
}

#[async_trait::async_trait]
impl QuotaOp for FakeHost {
    async fn set_quota(&self, uid: u32, bytes: u64) -> CoreResult<()> {
        self.log(format!("set_quota {uid} {bytes}"));
        self.state.lock().unwrap().quotas.push((uid, bytes));
        Ok(())
    }
}

#[async_trait::async_trait]
impl HostFs for FakeHost {
    async fn probe(&self, path: &Path) -> CoreResult<PathState> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .paths
            .get(path)
            .cloned()
            .unwrap_or(PathState::Missing))
    }

    async fn make_dirs(&self, path: &Path, mode: u32) -> CoreResult<()> {
        self.log(format!("make_dirs {} {mode:o}", path.display()));
        self.state
            .lock()
            .unwrap()
            .paths
            .insert(path.to_path_buf(), PathState::Directory);
        Ok(())
    }

    async fn symlink(&self, target: &Path, link: &Path, overwrite: bool) -> CoreResult<()> {
        self.log(format!("symlink {} -> {}", link.display(), target.display()));
        let mut state = self.state.lock().unwrap();
        if !overwrite && state.paths.contains_key(link) {
            return Err(CoreError::CommandFailed {
                command: format!("ln -sn {} {}", target.display(), link.display()),
                code: 1,
                stderr: "File exists".to_string(),
            });
        }
        state
            .paths
            .insert(link.to_path_buf(), PathState::Symlink(target.to_path_buf()));
        Ok(())
    }

    async fn chown(&self, path: &Path, owner: &Owner, mode: ChownMode) -> CoreResult<()> {
        self.log(format!("chown {} {}", owner.spec(), path.display()));
        self.state
            .lock()
            .unwrap()
            .owners
            .insert(path.to_path_buf(), (owner.spec(), mode));
        Ok(())
    }

    async fn copy_tree(&self, src: &Path, dst: &Path) -> CoreResult<()> {
        self.log(format!("copy_tree {} {}", src.display(), dst.display()));
        self.state
            .lock()
            .unwrap()
            .paths
            .insert(dst.to_path_buf(), PathState::Directory);
        Ok(())
    }

    async fn remove_tree(&self, path: &Path) -> CoreResult<()> {
        self.log(format!("remove_tree {}", path.display()));
        self.state
            .lock()
            .unwrap()
            .paths
            .retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    async fn discover_mounts(&self, _parent: &Path, _prefix: &str) -> CoreResult<Vec<LocalMount>> {
        Ok(self.state.lock().unwrap().mounts.clone())
    }
}

/// Console that records output and replays scripted answers.
///
/// Unscripted prompts are answered "no".
#[derive(Default)]
pub struct ScriptedConsole {
    answers: Mutex<VecDeque<bool>>,
    pub lines: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn said(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn say(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn warn(&self, line: &str) {
        self.lines.lock().unwrap().push(format!("warning: {line}"));
    }

    fn confirm(&self, prompt: &str) -> CoreResult<bool> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or(false))
    }
}

/// Workstation defaults rooted at `/home`, no orphan pass unless asked.
pub fn workstation_config() -> SyncConfig {
    SyncConfig::for_profile(Profile::Workstation)
}

pub fn services(host: &Arc<FakeHost>, console: &Arc<ScriptedConsole>) -> HostServices {
    HostServices::new(host.clone(), host.clone(), host.clone(), console.clone())
}

pub fn rows(csv: &str) -> Vec<DesiredRow> {
    parse_desired_state(csv.as_bytes()).expect("csv parses")
}

pub async fn reconcile(
    config: SyncConfig,
    host: &Arc<FakeHost>,
    console: &Arc<ScriptedConsole>,
    csv: &str,
) -> CoreResult<RunReport> {
    Reconciler::new(Arc::new(config), services(host, console))
        .run(&rows(csv))
        .await
}
