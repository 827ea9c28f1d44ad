//! Execution backends for untrusted code.
//!
//! Two implementations of one capability interface: [`docker::DockerExecutor`]
//! runs the language pipeline inside an isolated container, and
//! [`local::LocalExecutor`] runs it as a host process when the sandbox is
//! unavailable. Both produce the same [`ExecutionResult`] shape; the
//! orchestrator owns the choice between them.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::errors::ExecutorError;
use crate::profiles::LanguageProfile;

/// Sentinel exit code reported when the wall-clock deadline elapses, matching
/// the convention of the `timeout(1)` utility.
pub const TIMEOUT_EXIT_CODE: i64 = 124;

/// Which backend produced a result. Observability only; callers never need
/// to branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sandbox,
    Direct,
}

/// Normalized outcome of one run, identical across backends.
///
/// `success` is derived, never set directly: it holds exactly when the exit
/// code is zero and the deadline did not elapse, so it can never be true for
/// a timed-out run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
    pub success: bool,
    pub timed_out: bool,
    pub backend: Backend,
    /// Wall-clock time of the whole run, filled in by the orchestrator.
    pub duration: Option<Duration>,
}

impl ExecutionResult {
    /// Result for a pipeline that ran to completion with the given exit code.
    pub fn completed(stdout: String, stderr: String, exit_code: i64, backend: Backend) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            success: exit_code == 0,
            timed_out: false,
            backend,
            duration: None,
        }
    }

    /// Result for a pipeline that was forcibly terminated at the deadline.
    pub fn deadline_exceeded(stderr: String, backend: Backend) -> Self {
        Self {
            stdout: String::new(),
            stderr,
            exit_code: TIMEOUT_EXIT_CODE,
            success: false,
            timed_out: true,
            backend,
            duration: None,
        }
    }

    /// Stdout and stderr concatenated the way the response layer renders
    /// them: stderr appended after stdout, separated by a newline when both
    /// are present.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn run(&self, code: &str, profile: &LanguageProfile)
        -> Result<ExecutionResult, ExecutorError>;
}

pub mod docker;
pub mod local;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_derived_from_exit_code() {
        let ok = ExecutionResult::completed("hi\n".into(), String::new(), 0, Backend::Direct);
        assert!(ok.success);
        assert!(!ok.timed_out);

        let failed = ExecutionResult::completed(String::new(), "boom\n".into(), 3, Backend::Sandbox);
        assert!(!failed.success);
        assert_eq!(failed.exit_code, 3);
    }

    #[test]
    fn timed_out_runs_are_never_successful() {
        let result = ExecutionResult::deadline_exceeded("execution timed out".into(), Backend::Direct);
        assert!(result.timed_out);
        assert!(!result.success);
        assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    }

    #[test]
    fn combined_output_appends_stderr_after_stdout() {
        let both = ExecutionResult::completed("out".into(), "err".into(), 1, Backend::Direct);
        assert_eq!(both.combined_output(), "out\nerr");

        let only_out = ExecutionResult::completed("out".into(), String::new(), 0, Backend::Direct);
        assert_eq!(only_out.combined_output(), "out");

        let only_err = ExecutionResult::completed(String::new(), "err".into(), 1, Backend::Direct);
        assert_eq!(only_err.combined_output(), "err");
    }
}
