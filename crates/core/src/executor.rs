//! External process execution.
//!
//! Runs a [`BoundCommand`] as a discrete argument vector (never through
//! a shell), captures both output streams, and measures wall-clock
//! duration. Process failure is data, not an error: a non-zero exit, a
//! missing executable, or a timeout all come back as a failed
//! [`ExecutionResult`] carrying diagnostics, so callers can report
//! `status: error` with `stderr` and `duration_ms` intact.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::template::BoundCommand;

/// Maximum bytes captured per output stream (10 MiB).
///
/// ffmpeg progress output can be extremely verbose; anything past the
/// cap is dropped to bound memory use.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Outcome of one external-process invocation.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Process exit code; `None` if the process never launched, was
    /// killed by a signal, or hit the timeout.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Wall clock from spawn to exit (or to the failure that ended the
    /// attempt).
    pub duration_ms: u64,
    /// Where the command was told to write its artifact.
    pub output_path: PathBuf,
    /// True when the configured execution timeout killed the process.
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `cmd`, waiting at most `timeout` if one is configured.
///
/// On timeout the child is killed (`kill_on_drop` backstops the
/// explicit kill) and a failed result is returned; the caller's gate
/// permit drops normally afterwards, so a stuck encoder cannot wedge
/// serial mode.
pub async fn run(
    cmd: &BoundCommand,
    output_path: &Path,
    timeout: Option<Duration>,
) -> ExecutionResult {
    let start = Instant::now();

    let mut child = match tokio::process::Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            // Executable missing or not runnable: a failed result, not
            // a service error.
            return ExecutionResult {
                exit_code: None,
                stdout: String::new(),
                stderr: format!("failed to launch {}: {e}", cmd.program),
                duration_ms: start.elapsed().as_millis() as u64,
                output_path: output_path.to_path_buf(),
                timed_out: false,
            };
        }
    };

    // Read both streams in their own tasks so `child.wait()` can run
    // concurrently without deadlocking on full pipes.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    let wait_result = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait()).await,
        None => Ok(child.wait().await),
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let stdout = String::from_utf8_lossy(&stdout_task.await.unwrap_or_default()).into_owned();
    let stderr_captured =
        String::from_utf8_lossy(&stderr_task.await.unwrap_or_default()).into_owned();

    match wait_result {
        Ok(Ok(status)) => ExecutionResult {
            exit_code: status.code(),
            stdout,
            stderr: stderr_captured,
            duration_ms,
            output_path: output_path.to_path_buf(),
            timed_out: false,
        },
        Ok(Err(e)) => ExecutionResult {
            exit_code: None,
            stdout,
            stderr: format!("wait failed: {e}"),
            duration_ms,
            output_path: output_path.to_path_buf(),
            timed_out: false,
        },
        Err(_elapsed) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            ExecutionResult {
                exit_code: None,
                stdout,
                stderr: format!("execution timed out after {duration_ms}ms"),
                duration_ms,
                output_path: output_path.to_path_buf(),
                timed_out: true,
            }
        }
    }
}

/// Drain an output stream into a buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::gate::{ExecutionGate, ExecutionMode};

    fn sh(script: &str) -> BoundCommand {
        BoundCommand {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
        }
    }

    #[tokio::test]
    async fn captures_stdout_and_zero_exit() {
        let result = run(&sh("echo hello"), Path::new("/tmp/out"), None).await;
        assert!(result.success());
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failed_result() {
        let result = run(&sh("echo boom >&2; exit 42"), Path::new("/tmp/out"), None).await;
        assert!(!result.success());
        assert_eq!(result.exit_code, Some(42));
        assert!(result.stderr.contains("boom"));
    }

    #[tokio::test]
    async fn launch_failure_is_a_failed_result() {
        let cmd = BoundCommand {
            program: "definitely-not-a-real-binary".into(),
            args: vec![],
        };
        let result = run(&cmd, Path::new("/tmp/out"), None).await;
        assert!(!result.success());
        assert_eq!(result.exit_code, None);
        assert!(result.stderr.contains("failed to launch"));
    }

    #[tokio::test]
    async fn timeout_kills_the_process() {
        let start = Instant::now();
        let result = run(
            &sh("sleep 30"),
            Path::new("/tmp/out"),
            Some(Duration::from_millis(200)),
        )
        .await;
        assert!(result.timed_out);
        assert!(!result.success());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn duration_reflects_wall_clock() {
        let result = run(&sh("sleep 0.2"), Path::new("/tmp/out"), None).await;
        assert!(result.success());
        assert!(result.duration_ms >= 150, "got {}ms", result.duration_ms);
    }

    /// Serial mode: two gated executions never overlap, so the total
    /// elapsed time is at least the sum of both sleeps.
    #[tokio::test]
    async fn serial_gate_serializes_executions() {
        let gate = ExecutionGate::new(ExecutionMode::Serial);
        let start = Instant::now();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move {
                    let _permit = gate.acquire().await;
                    run(&sh("sleep 0.4"), Path::new("/tmp/out"), None).await
                })
            })
            .collect();
        for t in tasks {
            assert!(t.await.unwrap().success());
        }

        assert!(
            start.elapsed() >= Duration::from_millis(750),
            "serial executions overlapped: {:?}",
            start.elapsed()
        );
    }

    /// Parallel mode: the same two sleeps run concurrently and finish
    /// well before the serial sum.
    #[tokio::test]
    async fn parallel_gate_allows_overlap() {
        let gate = ExecutionGate::new(ExecutionMode::Parallel);
        let start = Instant::now();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move {
                    let _permit = gate.acquire().await;
                    run(&sh("sleep 0.4"), Path::new("/tmp/out"), None).await
                })
            })
            .collect();
        for t in tasks {
            assert!(t.await.unwrap().success());
        }

        assert!(
            start.elapsed() < Duration::from_millis(750),
            "parallel executions did not overlap: {:?}",
            start.elapsed()
        );
    }
}
