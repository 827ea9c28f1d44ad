//! Direct backend: runs the language toolchain as a host process.
//!
//! Used when the Docker daemon is unreachable at startup or a sandboxed run
//! fails for infrastructure reasons. Isolation is reduced to a wall-clock
//! deadline and a throwaway working directory; resource ceilings from the
//! profile are not enforced here.

use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout_at, Instant};

use super::{Backend, CodeExecutor, ExecutionResult};
use crate::errors::ExecutorError;
use crate::profiles::LanguageProfile;

pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeExecutor for LocalExecutor {
    async fn run(
        &self,
        code: &str,
        profile: &LanguageProfile,
    ) -> Result<ExecutionResult, ExecutorError> {
        // TempDir removes the staging directory on every return path below.
        let temp_dir = tempfile::Builder::new().prefix("runlab-exec-").tempdir()?;
        let source_path = temp_dir.path().join(&profile.source_file_name);
        tokio::fs::write(&source_path, code).await?;
        log::debug!("staged source at {}", source_path.display());

        // One budget covers compile and run together.
        let deadline = Instant::now() + profile.timeout;

        if let Some(compile_cmd) = &profile.compile_cmd {
            let output = match run_command(compile_cmd, temp_dir.path(), deadline).await? {
                CommandOutcome::Completed(output) => output,
                CommandOutcome::DeadlineExceeded => {
                    return Ok(ExecutionResult::deadline_exceeded(
                        deadline_message(profile),
                        Backend::Direct,
                    ))
                }
            };
            if !output.status.success() {
                // The run step is never attempted after a failed compile.
                let exit_code = output.status.code().map(i64::from).unwrap_or(1);
                return Ok(ExecutionResult::completed(
                    String::new(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code,
                    Backend::Direct,
                ));
            }
        }

        match run_command(&profile.run_cmd, temp_dir.path(), deadline).await? {
            CommandOutcome::Completed(output) => {
                // None means the process died to a signal; report a non-zero
                // code rather than pretending it exited cleanly.
                let exit_code = output.status.code().map(i64::from).unwrap_or(-1);
                Ok(ExecutionResult::completed(
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code,
                    Backend::Direct,
                ))
            }
            CommandOutcome::DeadlineExceeded => Ok(ExecutionResult::deadline_exceeded(
                deadline_message(profile),
                Backend::Direct,
            )),
        }
    }
}

enum CommandOutcome {
    Completed(Output),
    DeadlineExceeded,
}

/// Spawn one pipeline step with the staging directory as its cwd and wait
/// for it until `deadline`. `kill_on_drop` reaps the child when the timeout
/// branch drops the wait future.
async fn run_command(
    argv: &[String],
    cwd: &Path,
    deadline: Instant,
) -> Result<CommandOutcome, ExecutorError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ExecutorError::InvalidProfile("empty command".to_string()))?;

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    match timeout_at(deadline, child.wait_with_output()).await {
        Ok(output) => Ok(CommandOutcome::Completed(output?)),
        Err(_) => Ok(CommandOutcome::DeadlineExceeded),
    }
}

fn deadline_message(profile: &LanguageProfile) -> String {
    format!(
        "execution timed out after {}s",
        profile.timeout.as_secs()
    )
}
