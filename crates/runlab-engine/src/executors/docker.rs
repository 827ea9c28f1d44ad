//! Sandboxed backend: one ephemeral Docker container per run.
//!
//! Each run stages the source into a host tempdir, bind-mounts it at
//! [`WORK_DIR`], and starts a single-use container with the profile's memory
//! and CPU ceilings and no network. The container is removed on every path,
//! timeout and error included, before the call returns.

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions, WaitContainerOptions,
};
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::time::Duration;
use uuid::Uuid;

use super::{Backend, CodeExecutor, ExecutionResult};
use crate::errors::ExecutorError;
use crate::profiles::{LanguageProfile, WORK_DIR};

pub struct DockerExecutor {
    docker: Docker,
}

impl DockerExecutor {
    /// Connect to the local Docker daemon and probe it. The probe is bounded
    /// by `ping_timeout` so an unreachable daemon fails fast instead of
    /// hanging startup; the orchestrator treats that failure as non-fatal.
    pub async fn new(ping_timeout: Duration) -> Result<Self, ExecutorError> {
        let docker = Docker::connect_with_local_defaults()?;
        match tokio::time::timeout(ping_timeout, docker.ping()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(ExecutorError::DaemonUnreachable(e.to_string())),
            Err(_) => {
                return Err(ExecutorError::DaemonUnreachable(format!(
                    "no ping response within {}s",
                    ping_timeout.as_secs()
                )))
            }
        }
        log::info!("Docker sandbox initialized");
        Ok(Self { docker })
    }

    async fn create_container(
        &self,
        host_dir: &str,
        profile: &LanguageProfile,
    ) -> Result<String, ExecutorError> {
        // Success-gated conjunction: the run step never executes after a
        // failed compile.
        let cmd = match &profile.compile_cmd {
            Some(compile_cmd) => vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                format!("{} && {}", compile_cmd.join(" "), profile.run_cmd.join(" ")),
            ],
            None => profile.run_cmd.clone(),
        };

        let options = Some(CreateContainerOptions {
            name: Some(format!("runlab-{}", Uuid::new_v4())),
            ..Default::default()
        });

        let config = ContainerCreateBody {
            image: Some(profile.image.clone()),
            cmd: Some(cmd),
            working_dir: Some(WORK_DIR.to_string()),
            host_config: Some(HostConfig {
                binds: Some(vec![format!("{}:{}", host_dir, WORK_DIR)]),
                memory: Some(profile.memory_limit_bytes),
                cpu_shares: Some(profile.cpu_share_weight),
                network_mode: Some("none".to_string()),
                ..Default::default()
            }),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let container = self.docker.create_container(options, config).await?;
        Ok(container.id)
    }

    async fn execute_in_container(
        &self,
        container_id: &str,
        profile: &LanguageProfile,
    ) -> Result<ExecutionResult, ExecutorError> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions>)
            .await?;
        log::debug!("container {} started", container_id);

        let mut wait_stream = self
            .docker
            .wait_container(container_id, None::<WaitContainerOptions>);
        let deadline = tokio::time::sleep(profile.timeout);

        let wait_outcome = tokio::select! {
            res = wait_stream.next() => res,
            _ = deadline => {
                log::warn!("execution timed out in container {}", container_id);
                let _ = self
                    .docker
                    .stop_container(container_id, None::<StopContainerOptions>)
                    .await;
                return Ok(ExecutionResult::deadline_exceeded(
                    format!("execution timed out after {}s", profile.timeout.as_secs()),
                    Backend::Sandbox,
                ));
            }
        };

        // Bollard reports a non-zero container exit either as an Ok response
        // or as a DockerContainerWaitError; both are program outcomes, not
        // infrastructure failures.
        let exit_code = match wait_outcome {
            Some(Ok(response)) => response.status_code,
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => code,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(ExecutorError::WaitChannelClosed),
        };

        let (stdout, stderr) = self.collect_logs(container_id).await?;
        Ok(ExecutionResult::completed(
            stdout,
            stderr,
            exit_code,
            Backend::Sandbox,
        ))
    }

    /// Fetch the container's output. The logs API multiplexes both streams
    /// with per-chunk framing headers; bollard demultiplexes them back into
    /// separate stdout and stderr.
    async fn collect_logs(&self, container_id: &str) -> Result<(String, String), ExecutorError> {
        let mut log_stream = self.docker.logs(
            container_id,
            Some(LogsOptions {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );

        let mut stdout = String::new();
        let mut stderr = String::new();
        while let Some(chunk) = log_stream.next().await {
            match chunk? {
                LogOutput::StdOut { message } => stdout.push_str(std::str::from_utf8(&message)?),
                LogOutput::StdErr { message } => stderr.push_str(std::str::from_utf8(&message)?),
                _ => {}
            }
        }
        Ok((stdout, stderr))
    }

    async fn remove_container(&self, container_id: &str) {
        let options = Some(RemoveContainerOptions {
            force: true,
            ..Default::default()
        });
        if let Err(e) = self.docker.remove_container(container_id, options).await {
            log::warn!("failed to remove container {}: {}", container_id, e);
        }
    }
}

#[async_trait]
impl CodeExecutor for DockerExecutor {
    async fn run(
        &self,
        code: &str,
        profile: &LanguageProfile,
    ) -> Result<ExecutionResult, ExecutorError> {
        let temp_dir = tempfile::Builder::new().prefix("runlab-sandbox-").tempdir()?;
        let host_dir = temp_dir
            .path()
            .to_str()
            .ok_or_else(|| ExecutorError::Staging("staging path is not valid UTF-8".to_string()))?
            .to_string();
        tokio::fs::write(temp_dir.path().join(&profile.source_file_name), code).await?;

        let container_id = self.create_container(&host_dir, profile).await?;
        log::debug!("container {} created for image {}", container_id, profile.image);

        // The container is single-use and owned by this call: whatever
        // happened above the waterline, it gets removed before we return.
        let outcome = self.execute_in_container(&container_id, profile).await;
        self.remove_container(&container_id).await;
        outcome
    }
}
