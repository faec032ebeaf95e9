#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Stdio,
    time::Duration,
};

use anyhow::Context;
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, BufReader},
    process::{Child, Command},
    time::timeout,
};

/// Failure modes of [`run_collect`].
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started at all.
    #[error("failed to spawn {program}")]
    Spawn {
        /// Program that was being launched
        program: String,
        /// Underlying OS error
        #[source]
        source:  std::io::Error,
    },
    /// The deadline passed; the child has been killed.
    #[error("subprocess timed out after {0:?}")]
    TimedOut(Duration),
    /// Any failure while talking to a running child.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Drop guard that terminates a spawned child, and every process it
/// started, if callers forget to await it or the wait is abandoned on
/// timeout.
struct ChildDropGuard {
    /// The child, until the guard is disarmed.
    child: Option<Child>,
    /// Process group led by the child.
    group: Option<u32>,
}

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        let group = child.id();
        Self {
            child: Some(child),
            group,
        }
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> anyhow::Result<&mut Child> {
        self.child
            .as_mut()
            .context("child process already taken from guard")
    }

    /// Prevents the guard from killing the process on drop.
    fn disarm(mut self) {
        self.child = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Some(group) = self.group {
                kill_group(group);
            }
            let _ = child.start_kill();
        }
    }
}

/// Sends `SIGKILL` to every process in the group led by `leader`.
#[cfg(unix)]
fn kill_group(leader: u32) {
    use nix::{
        sys::signal::{Signal, killpg},
        unistd::Pid,
    };

    #[allow(clippy::cast_possible_wrap)]
    let group = Pid::from_raw(leader as i32);
    if let Err(e) = killpg(group, Signal::SIGKILL) {
        tracing::debug!("Could not kill process group {leader}: {e}");
    }
}

/// Only the direct child can be killed here.
#[cfg(not(unix))]
fn kill_group(_leader: u32) {}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: std::process::ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

impl Collected {
    /// Stdout followed by stderr, lossily decoded and trimmed.
    pub fn combined(&self) -> String {
        format!(
            "{}\n{}",
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        )
        .trim()
        .to_string()
    }
}

/// Spawns a command with a null stdin and collects stdout/stderr, killing
/// the child if `deadline` passes first.
pub async fn run_collect(
    program: impl AsRef<OsStr>,
    args: &[OsString],
    cwd: Option<&Path>,
    deadline: Option<Duration>,
) -> Result<Collected, ProcessError> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;
    let mut guard = ChildDropGuard::new(child);

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .context("missing stdout pipe")?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .context("missing stderr pipe")?;

    let out_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stdout")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let err_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stderr")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let wait_future = async move {
        let mut guard = guard;
        let status = guard
            .child_mut()?
            .wait()
            .await
            .context("failed to wait on process")?;
        let stdout = out_task.await.context("stdout task join error")??;
        let stderr = err_task.await.context("stderr task join error")??;
        guard.disarm();
        Ok::<Collected, anyhow::Error>(Collected {
            status,
            stdout,
            stderr,
        })
    };

    match deadline {
        Some(limit) => match timeout(limit, wait_future).await {
            Ok(collected) => Ok(collected?),
            Err(_) => Err(ProcessError::TimedOut(limit)),
        },
        None => Ok(wait_future.await?),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Instant;

    use super::*;

    fn sh(script: &str) -> Vec<OsString> {
        vec![OsString::from("-c"), OsString::from(script)]
    }

    #[tokio::test]
    async fn collects_both_streams() {
        let out = run_collect("sh", &sh("echo out; echo err 1>&2"), None, None)
            .await
            .expect("run sh");
        assert!(out.status.success());
        assert_eq!(out.combined(), "out\n\nerr");
    }

    #[tokio::test]
    async fn runs_in_requested_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("marker.txt"), "here").expect("write marker");
        let out = run_collect("sh", &sh("cat marker.txt"), Some(dir.path()), None)
            .await
            .expect("run sh");
        assert_eq!(String::from_utf8_lossy(&out.stdout), "here");
    }

    #[tokio::test]
    async fn times_out_and_returns_promptly() {
        let started = Instant::now();
        let err = run_collect("sh", &sh("exec sleep 30"), None, Some(Duration::from_millis(200)))
            .await
            .expect_err("should time out");
        assert!(matches!(err, ProcessError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn timeout_kills_background_grandchildren() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = "(while :; do echo x >> ticks; sleep 0.05; done) & sleep 30; true";
        let err = run_collect("sh", &sh(script), Some(dir.path()), Some(Duration::from_millis(300)))
            .await
            .expect_err("should time out");
        assert!(matches!(err, ProcessError::TimedOut(_)));

        let ticks = dir.path().join("ticks");
        let size = || std::fs::metadata(&ticks).map(|m| m.len()).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(300)).await;
        let settled = size();
        assert!(settled > 0, "grandchild never started");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(size(), settled, "grandchild still running");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = run_collect("/definitely/not/a/simulator", &[], None, None)
            .await
            .expect_err("should fail to spawn");
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
