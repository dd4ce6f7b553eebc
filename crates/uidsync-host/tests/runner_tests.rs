//! Process runner tests against harmless system commands.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use uidsync_core::error::CoreError;
use uidsync_core::traits::CommandRunner;
use uidsync_core::types::CommandSpec;
use uidsync_host::runner::SPAWN_FAILURE_STATUS;
use uidsync_host::ProcessRunner;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh", ["-c", script])
}

/// Log sink shared with a test subscriber.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_successful_command() {
    let output = ProcessRunner::new()
        .run(&CommandSpec::new("true", Vec::<String>::new()))
        .await
        .unwrap();
    assert!(output.success());
}

#[tokio::test]
async fn test_failed_checked_command_carries_status_and_stderr() {
    let err = ProcessRunner::new()
        .run(&sh("echo 'useradd: uid 1001 is not unique' >&2; exit 4"))
        .await
        .unwrap_err();
    match err {
        CoreError::CommandFailed {
            command,
            code,
            stderr,
        } => {
            assert_eq!(code, 4);
            assert!(command.starts_with("sh -c "));
            assert_eq!(stderr, "useradd: uid 1001 is not unique");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_suppressed_lines_are_dropped_from_failure() {
    let spec = sh("echo 'userdel: bob mail spool (/var/mail/bob) not found' >&2; echo real >&2; exit 6")
        .suppressing("mail spool");
    let err = ProcessRunner::new().run(&spec).await.unwrap_err();
    match err {
        CoreError::CommandFailed { code, stderr, .. } => {
            assert_eq!(code, 6);
            assert_eq!(stderr, "real");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unchecked_command_reports_status() {
    let output = ProcessRunner::new()
        .run(&CommandSpec::new("false", Vec::<String>::new()).unchecked())
        .await
        .unwrap();
    assert_eq!(output.code, 1);
    assert!(!output.success());
}

#[tokio::test]
async fn test_input_is_written_to_stdin() {
    let spec = sh(r#"read line; test "$line" = "alice:secret""#).with_input("alice:secret\n");
    let output = ProcessRunner::new().run(&spec).await.unwrap();
    assert!(output.success());
}

#[tokio::test]
async fn test_missing_program_is_a_command_failure() {
    let err = ProcessRunner::new()
        .run(&CommandSpec::new(
            "uidsync-no-such-program",
            Vec::<String>::new(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), SPAWN_FAILURE_STATUS);
}

#[tokio::test]
async fn test_signal_exit_maps_above_128() {
    let err = ProcessRunner::new()
        .run(&sh("kill -9 $$"))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 128 + 9);
}

#[tokio::test]
async fn test_suppressed_lines_stay_out_of_default_log_output() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let spec = sh("echo 'userdel: bob mail spool (/var/mail/bob) not found' >&2; exit 0")
        .suppressing("mail spool");
    let output = ProcessRunner::new().run(&spec).await.unwrap();

    assert!(output.success());
    assert!(logs.text().is_empty(), "unexpected log output: {}", logs.text());
}

#[tokio::test]
async fn test_unread_input_keeps_command_status() {
    let spec = sh("echo 'chpasswd: pam_chauthtok() failed' >&2; exit 3")
        .with_input("x".repeat(1 << 20));
    let err = ProcessRunner::new().run(&spec).await.unwrap_err();
    match err {
        CoreError::CommandFailed { code, stderr, .. } => {
            assert_eq!(code, 3);
            assert_eq!(stderr, "chpasswd: pam_chauthtok() failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_large_stderr_with_input_does_not_stall() {
    // writes more stderr than a pipe buffer holds before touching stdin
    let spec = sh("head -c 200000 /dev/zero | tr '\\0' e >&2; cat >/dev/null; exit 5")
        .with_input("y".repeat(1 << 20));
    let err = ProcessRunner::new().run(&spec).await.unwrap_err();
    assert_eq!(err.exit_code(), 5);
}
