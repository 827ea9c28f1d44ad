//! Single entry point for code execution; hides backend selection.
//!
//! The orchestrator tries the Docker sandbox first when it was reachable at
//! startup and transparently retries the same request against the direct
//! backend on any infrastructure failure. Program outcomes — compile errors,
//! non-zero exits, timeouts — are never retried: they are facts about the
//! submitted code and come back as data.

use std::time::Instant;

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::executors::docker::DockerExecutor;
use crate::executors::local::LocalExecutor;
use crate::executors::{CodeExecutor, ExecutionResult};
use crate::profiles::LanguageRegistry;

pub struct ExecutionOrchestrator {
    registry: LanguageRegistry,
    sandbox: Option<Box<dyn CodeExecutor>>,
    direct: LocalExecutor,
    config: EngineConfig,
}

impl ExecutionOrchestrator {
    /// Build the orchestrator, probing the Docker daemon once. A failed
    /// probe is non-fatal: the engine runs direct-only until
    /// [`Self::reprobe_sandbox`] succeeds.
    pub async fn new(config: EngineConfig) -> Self {
        let registry = LanguageRegistry::from_config(&config);
        let sandbox: Option<Box<dyn CodeExecutor>> =
            match DockerExecutor::new(config.ping_timeout()).await {
                Ok(executor) => Some(Box::new(executor)),
                Err(e) => {
                    log::warn!("Docker sandbox unavailable, falling back to direct execution: {}", e);
                    None
                }
            };
        Self {
            registry,
            sandbox,
            direct: LocalExecutor::new(),
            config,
        }
    }

    pub fn sandbox_available(&self) -> bool {
        self.sandbox.is_some()
    }

    /// Retry the daemon probe. A no-op when the sandbox is already up.
    /// Returns whether the sandbox is available afterwards.
    pub async fn reprobe_sandbox(&mut self) -> bool {
        if self.sandbox.is_none() {
            match DockerExecutor::new(self.config.ping_timeout()).await {
                Ok(executor) => {
                    log::info!("Docker sandbox became available");
                    self.sandbox = Some(Box::new(executor));
                }
                Err(e) => log::debug!("Docker sandbox still unavailable: {}", e),
            }
        }
        self.sandbox.is_some()
    }

    /// Execute `code` for `language` and return the normalized result.
    ///
    /// Fails with [`EngineError::UnsupportedLanguage`] before any backend is
    /// invoked when the registry has no profile, and with
    /// [`EngineError::ExecutionFailed`] only when the direct backend also
    /// hits an infrastructure failure.
    pub async fn run(&self, code: &str, language: &str) -> Result<ExecutionResult, EngineError> {
        let profile = self.registry.lookup(language)?;
        let started = Instant::now();

        let mut result = match &self.sandbox {
            Some(sandbox) => match sandbox.run(code, profile).await {
                Ok(result) => result,
                Err(e) => {
                    // Fallback happens at most once and only for this call;
                    // the sandbox stays in rotation for the next request.
                    log::warn!("sandbox execution failed, retrying on direct backend: {}", e);
                    self.direct.run(code, profile).await?
                }
            },
            None => self.direct.run(code, profile).await?,
        };

        result.duration = Some(started.elapsed());
        log::info!(
            "executed language={} backend={:?} success={} exit_code={} timed_out={} in {:?}",
            language,
            result.backend,
            result.success,
            result.exit_code,
            result.timed_out,
            result.duration.unwrap_or_default(),
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExecutorError;
    use crate::executors::Backend;
    use crate::profiles::{LanguageProfile, LanguageRegistry};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Sandbox stand-in that always reports an infrastructure failure.
    struct FailingExecutor;

    #[async_trait]
    impl CodeExecutor for FailingExecutor {
        async fn run(
            &self,
            _code: &str,
            _profile: &LanguageProfile,
        ) -> Result<ExecutionResult, ExecutorError> {
            Err(ExecutorError::Staging("injected failure".to_string()))
        }
    }

    fn shell_registry() -> LanguageRegistry {
        let mut profiles = HashMap::new();
        profiles.insert(
            "shell".to_string(),
            LanguageProfile {
                image: "alpine:latest".to_string(),
                compile_cmd: None,
                run_cmd: vec!["sh".to_string(), "code.sh".to_string()],
                source_file_name: "code.sh".to_string(),
                timeout: Duration::from_secs(5),
                memory_limit_bytes: 100 * 1024 * 1024,
                cpu_share_weight: 512,
            },
        );
        LanguageRegistry::with_profiles(profiles)
    }

    fn direct_only(registry: LanguageRegistry) -> ExecutionOrchestrator {
        ExecutionOrchestrator {
            registry,
            sandbox: None,
            direct: LocalExecutor::new(),
            config: EngineConfig::default(),
        }
    }

    #[tokio::test]
    async fn unsupported_language_is_rejected_before_any_backend_runs() {
        let orchestrator = direct_only(LanguageRegistry::builtin());
        let err = orchestrator.run("print(1)", "brainfuck").await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedLanguage(_)));
    }

    #[tokio::test]
    async fn direct_backend_runs_when_no_sandbox_exists() {
        let orchestrator = direct_only(shell_registry());
        let result = orchestrator
            .run("echo Hello, World!", "shell")
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "Hello, World!\n");
        assert_eq!(result.backend, Backend::Direct);
        assert!(result.duration.is_some());
    }

    #[tokio::test]
    async fn sandbox_failure_falls_back_transparently() {
        let mut orchestrator = direct_only(shell_registry());
        orchestrator.sandbox = Some(Box::new(FailingExecutor));
        assert!(orchestrator.sandbox_available());

        let result = orchestrator
            .run("echo Hello, World!", "shell")
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stdout, "Hello, World!\n");
        assert_eq!(result.backend, Backend::Direct);
        // A single failed call does not disable the sandbox.
        assert!(orchestrator.sandbox_available());
    }

    #[tokio::test]
    async fn program_failure_is_data_not_an_engine_error() {
        let orchestrator = direct_only(shell_registry());
        let result = orchestrator.run("exit 3", "shell").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn repeated_runs_are_idempotent() {
        let orchestrator = direct_only(shell_registry());
        let first = orchestrator.run("echo again", "shell").await.unwrap();
        let second = orchestrator.run("echo again", "shell").await.unwrap();
        assert_eq!(first.stdout, second.stdout);
        assert_eq!(first.stderr, second.stderr);
        assert_eq!(first.exit_code, second.exit_code);
        assert_eq!(first.success, second.success);
    }
}
