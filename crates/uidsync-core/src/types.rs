//! Value types shared between the engine and its backends.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Identity of an account as declared in the desired-state file.
///
/// Backends choose which half they match on: the local account database
/// looks accounts up by name, the NAS appliance by uid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountIdentity {
    pub username: String,
    pub uid: u32,
}

impl AccountIdentity {
    pub fn new(username: impl Into<String>, uid: u32) -> Self {
        Self {
            username: username.into(),
            uid,
        }
    }
}

impl fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (uid {})", self.username, self.uid)
    }
}

/// A group as seen by the account database.
///
/// The name is optional because an orphan account's primary gid may have
/// no entry in the group database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    pub name: Option<String>,
    pub gid: u32,
}

impl GroupRef {
    pub fn named(name: impl Into<String>, gid: u32) -> Self {
        Self {
            name: Some(name.into()),
            gid,
        }
    }

    pub fn gid_only(gid: u32) -> Self {
        Self { name: None, gid }
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.gid),
        }
    }
}

/// Owner and group applied by `chown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user: String,
    pub group: GroupRef,
}

impl Owner {
    pub fn new(user: impl Into<String>, group: GroupRef) -> Self {
        Self {
            user: user.into(),
            group,
        }
    }

    /// `user:group` argument for chown.
    pub fn spec(&self) -> String {
        format!("{}:{}", self.user, self.group)
    }
}

/// How `chown` treats the path it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChownMode {
    /// The path only.
    Single,
    /// The path and everything below it.
    Recursive,
    /// The symbolic link itself, never its target.
    LinkItself,
}

/// Account to be created by an account backend.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub uid: u32,
    pub group: GroupRef,
    pub shell: PathBuf,
    pub home: PathBuf,
    /// Initial password. `None` leaves password login disabled.
    pub password: Option<String>,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("uid", &self.uid)
            .field("group", &self.group)
            .field("shell", &self.shell)
            .field("home", &self.home)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .finish()
    }
}

/// Whether an existing path at a link location may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    /// Re-point an existing symlink that targets something else.
    Replace,
    /// Leave anything already present at the link path untouched.
    IfAbsent,
}

/// A concrete symbolic link for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub target: PathBuf,
    pub link: PathBuf,
    pub policy: LinkPolicy,
}

/// What currently occupies a path, without following symlinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathState {
    Missing,
    Symlink(PathBuf),
    Directory,
    File,
}

impl PathState {
    pub fn is_missing(&self) -> bool {
        matches!(self, PathState::Missing)
    }
}

/// A local-storage mount discovered on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMount {
    /// Mount point, e.g. `/mnt/local2`.
    pub path: PathBuf,
    /// Name suffix after the mount prefix, e.g. `2` (may be empty).
    pub suffix: String,
}

impl LocalMount {
    pub fn new(path: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            suffix: suffix.into(),
        }
    }

    /// Per-user directory on this mount.
    pub fn user_dir(&self, username: &str) -> PathBuf {
        self.path.join(username)
    }
}

/// One external command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Written to the command's stdin, which is closed afterwards.
    pub input: Option<String>,
    /// Stderr lines containing any of these substrings are dropped.
    pub suppress: Vec<String>,
    /// When false the exit status is returned instead of failing the run
    /// and all output is discarded.
    pub check: bool,
}

impl CommandSpec {
    /// A must-succeed command.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            input: None,
            suppress: Vec::new(),
            check: true,
        }
    }

    /// Append a path argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn suppressing(mut self, pattern: impl Into<String>) -> Self {
        self.suppress.push(pattern.into());
        self
    }

    /// Run as a probe: non-zero status is an answer, not a failure.
    pub fn unchecked(mut self) -> Self {
        self.check = false;
        self
    }

    /// argv as a single vector, program first.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

/// Outcome of a command that was allowed to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}
