use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use crate::error::PipelineError;
use crate::pipeline::Stage;

/// Keep only this many trailing bytes of the child's stderr.
const STDERR_TAIL_BYTES: usize = 2048;

/// Exit information of an external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stderr: String,
}

impl ProcessExit {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failure(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external executable to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<ProcessExit, PipelineError>;
}

/// Spawns real child processes via tokio.
#[derive(Debug, Default, Clone)]
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<ProcessExit, PipelineError> {
        debug!("Running {} {:?}", program, args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PipelineError::ProcessSpawn {
                program: program.to_string(),
                source,
            })?;

        let mut stderr = child.stderr.take();
        let wait = async {
            let captured = match stderr.as_mut() {
                Some(stderr) => read_tail(stderr, STDERR_TAIL_BYTES).await,
                None => Vec::new(),
            };
            child.wait().await.map(|status| (status, captured))
        };

        let (status, captured) = match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result.map_err(|source| PipelineError::ProcessSpawn {
                program: program.to_string(),
                source,
            })?,
            // Dropping the future drops the child, which kills it.
            Err(_) => {
                return Err(PipelineError::Timeout {
                    stage: Stage::Extraction,
                });
            }
        };

        Ok(ProcessExit {
            code: status.code(),
            stderr: stderr_tail(&captured),
        })
    }
}

/// Drain `reader`, holding on to at most `limit` trailing bytes (plus one read
/// buffer) at any time.
async fn read_tail<R: AsyncRead + Unpin>(reader: &mut R, limit: usize) -> Vec<u8> {
    let mut tail = Vec::with_capacity(limit * 2);
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > limit * 2 {
                    tail.drain(..tail.len() - limit);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            // A broken stderr pipe does not change the exit status.
            Err(_) => break,
        }
    }
    tail
}

fn stderr_tail(captured: &[u8]) -> String {
    let start = captured.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&captured[start..]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_tail_keeps_the_end() {
        let mut captured = vec![b'a'; STDERR_TAIL_BYTES];
        captured.extend_from_slice(b"\nInvalid data found when processing input\n");
        let tail = stderr_tail(&captured);
        assert!(tail.ends_with("Invalid data found when processing input"));
        assert!(tail.len() <= STDERR_TAIL_BYTES);
    }

    #[tokio::test]
    async fn read_tail_stays_bounded() {
        let mut noisy = Vec::new();
        for frame in 0..20_000 {
            noisy.extend_from_slice(format!("frame={} fps=25 q=2.0 size=N/A\n", frame).as_bytes());
        }
        noisy.extend_from_slice(b"Conversion failed!\n");

        let tail = read_tail(&mut noisy.as_slice(), STDERR_TAIL_BYTES).await;

        assert!(tail.len() <= STDERR_TAIL_BYTES * 2);
        assert!(tail.ends_with(b"Conversion failed!\n"));
        assert!(stderr_tail(&tail).ends_with("Conversion failed!"));
    }

    #[test]
    fn exit_success_requires_zero() {
        assert!(ProcessExit::success().is_success());
        assert!(!ProcessExit::failure(Some(1), "").is_success());
        assert!(!ProcessExit::failure(None, "killed").is_success());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = SystemProcessRunner
            .run(
                "prism-definitely-not-installed",
                &[],
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ProcessSpawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_exit_code_and_stderr() {
        let args: Vec<OsString> = vec!["-c".into(), "echo boom >&2; exit 3".into()];
        let exit = SystemProcessRunner
            .run("sh", &args, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(exit.code, Some(3));
        assert_eq!(exit.stderr, "boom");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_process_times_out() {
        let args: Vec<OsString> = vec!["-c".into(), "sleep 5".into()];
        let err = SystemProcessRunner
            .run("sh", &args, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Timeout {
                stage: Stage::Extraction
            }
        ));
    }
}
