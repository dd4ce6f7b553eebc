//! External command execution.
//!
//! Checked commands inherit stdout and capture stderr. Captured lines that
//! match a suppression pattern are dropped; the rest are echoed after a
//! successful exit or carried in [`CoreError::CommandFailed`] after a
//! failed one. Unchecked commands run silently and only report a status.

use std::borrow::Cow;
use std::io::ErrorKind;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, Command};
use tracing::debug;

use uidsync_core::error::{CoreError, CoreResult};
use uidsync_core::traits::CommandRunner;
use uidsync_core::types::{CommandOutput, CommandSpec};

/// Status reported when the program could not be started.
pub const SPAWN_FAILURE_STATUS: i32 = 127;

/// Runs commands as child processes of this one.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Shell-quoted command line, for messages only.
pub fn display_command(spec: &CommandSpec) -> String {
    spec.argv()
        .into_iter()
        .map(|arg| shell_escape::escape(Cow::Borrowed(arg)).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop stderr lines containing any of `patterns`.
pub fn filter_stderr(stderr: &str, patterns: &[String]) -> String {
    stderr
        .lines()
        .filter(|line| !patterns.iter().any(|p| line.contains(p.as_str())))
        .collect::<Vec<_>>()
        .join("\n")
}

fn status_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

/// Write `input` and close stdin. A child that exits without reading its
/// input is not an error here; its exit status decides the outcome.
async fn feed_stdin(stdin: Option<ChildStdin>, input: Option<&str>) -> std::io::Result<()> {
    let (Some(mut stdin), Some(input)) = (stdin, input) else {
        return Ok(());
    };
    match stdin.write_all(input.as_bytes()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            debug!("Command closed stdin before reading all input");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn drain_stderr(stderr: Option<ChildStderr>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = stderr {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> CoreResult<CommandOutput> {
        let command = display_command(spec);
        debug!(command = %command, checked = spec.check, "Running command");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(if spec.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        if spec.check {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let mut child = cmd.spawn().map_err(|e| CoreError::CommandFailed {
            command: command.clone(),
            code: SPAWN_FAILURE_STATUS,
            stderr: e.to_string(),
        })?;

        // stdin is fed while stderr drains so neither pipe can fill up and
        // stall the child.
        let feed = feed_stdin(child.stdin.take(), spec.input.as_deref());
        let drain = drain_stderr(child.stderr.take());
        let (fed, drained) = tokio::join!(feed, drain);

        let status = child
            .wait()
            .await
            .map_err(|e| CoreError::io(&spec.program, e))?;
        let stderr = drained.map_err(|e| CoreError::io(&spec.program, e))?;
        let code = status_code(status);

        let kept = filter_stderr(&stderr, &spec.suppress);
        let dropped = stderr.lines().count() - kept.lines().count();
        if dropped > 0 {
            debug!(command = %command, lines = dropped, "Suppressed known stderr noise");
        }

        if spec.check && code != 0 {
            return Err(CoreError::CommandFailed {
                command,
                code,
                stderr: kept,
            });
        }
        fed.map_err(|e| CoreError::io(&spec.program, e))?;
        if !kept.is_empty() {
            eprintln!("{kept}");
        }

        debug!(command = %command, code, "Command finished");
        Ok(CommandOutput { code })
    }
}
