//! Docker-based execution client
//!
//! **Docker Execution Rules:**
//! 1. Pulls the language image if not present
//! 2. Creates a container with security constraints:
//!    - Network disabled
//!    - CPU/memory limits from languages.json
//! 3. Injects source code base64-encoded through `SOURCE_CODE`
//! 4. Captures stdout/stderr
//! 5. Kills the container on timeout
//! 6. Removes the container afterwards, even on panic or cancellation

use arena_common::languages::{LanguageConfig, LanguageConfigManager};
use arena_common::types::{ExecutionOutcome, Language};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::ExecutionClient;
use crate::error::ClientError;

/// Safety limit to keep pathological submissions away from Docker
const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB

/// Container cleanup guard - guarantees container removal on drop
struct ContainerGuard {
    docker: Docker,
    container_id: String,
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        // Drop cannot be async; removal is best-effort
        let container_id = self.container_id.clone();
        let docker = self.docker.clone();

        tokio::spawn(async move {
            let remove_options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };

            if let Err(e) = docker.remove_container(&container_id, Some(remove_options)).await {
                warn!(container_id = %container_id, error = %e, "Failed to clean up container");
            }
        });
    }
}

pub struct DockerClient {
    docker: Docker,
    languages: LanguageConfigManager,
    timeout: Duration,
}

impl DockerClient {
    pub fn new(languages: LanguageConfigManager, timeout: Duration) -> Result<Self, ClientError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self {
            docker,
            languages,
            timeout,
        })
    }

    /// Ensure the image is available locally, pulling it if needed
    async fn ensure_image(&self, image: &str) -> Result<(), ClientError> {
        if self.docker.inspect_image(image).await.is_ok() {
            debug!(image, "Image cache hit");
            return Ok(());
        }

        warn!(image, "Image cache miss, pulling");

        let options = Some(CreateImageOptions {
            from_image: image,
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(result) = stream.next().await {
            result?;
        }

        info!(image, "Image pulled");
        Ok(())
    }
}

/// Shell script that restores the source file and runs it
fn launch_script(config: &LanguageConfig) -> String {
    let mut run = config.command.clone();
    for arg in &config.args {
        run.push(' ');
        run.push_str(arg);
    }
    format!(
        "printf '%s' \"$SOURCE_CODE\" | base64 -d > /tmp/main.{} && exec {}",
        config.file_extension, run
    )
}

/// Turn what the container did into an outcome
fn classify_exit(stdout: String, mut stderr: String, exit_code: Option<i64>) -> ExecutionOutcome {
    match exit_code {
        Some(0) if stderr.is_empty() => ExecutionOutcome::succeeded(stdout),
        Some(0) => ExecutionOutcome::failed(stdout, stderr),
        Some(code) => {
            match code {
                137 => stderr.push_str("\n[Container killed: likely OOM or exceeded memory limit]"),
                139 => stderr.push_str("\n[Container killed: segmentation fault]"),
                _ => {}
            }
            if stderr.trim().is_empty() {
                stderr = format!("Process exited with code {}", code);
            }
            ExecutionOutcome::failed(stdout, stderr)
        }
        None => ExecutionOutcome::failed(stdout, "No exit code captured from container"),
    }
}

#[async_trait]
impl ExecutionClient for DockerClient {
    #[instrument(
        skip(self, source_code),
        fields(language = %language, source_size = source_code.len())
    )]
    async fn execute(
        &self,
        language: Language,
        source_code: &str,
    ) -> Result<ExecutionOutcome, ClientError> {
        if source_code.len() > MAX_SOURCE_CODE_BYTES {
            return Ok(ExecutionOutcome::failed(
                "",
                format!("Source code exceeds maximum size of {} bytes", MAX_SOURCE_CODE_BYTES),
            ));
        }

        let Ok(config) = self.languages.get_config(language) else {
            return Ok(ExecutionOutcome::failed("", format!("Unsupported language: {}", language)));
        };

        self.ensure_image(&config.image).await?;

        let container_name = format!("arena-{}", uuid::Uuid::new_v4());
        let container_config = Config {
            image: Some(config.image.clone()),
            cmd: Some(vec!["sh".to_string(), "-c".to_string(), launch_script(config)]),
            env: Some(vec![format!(
                "SOURCE_CODE={}",
                general_purpose::STANDARD.encode(source_code)
            )]),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            network_disabled: Some(true),
            host_config: Some(bollard::models::HostConfig {
                memory: Some(i64::from(config.memory_limit_mb) * 1024 * 1024),
                nano_cpus: Some((f64::from(config.cpu_limit) * 1_000_000_000.0) as i64),
                ..Default::default()
            }),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: container_name.as_str(),
            platform: None,
        };

        let container = self
            .docker
            .create_container(Some(create_options), container_config)
            .await?;
        let container_id = container.id;

        let _guard = ContainerGuard {
            docker: self.docker.clone(),
            container_id: container_id.clone(),
        };

        let start_time = Instant::now();
        self.docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await?;

        let execution = async {
            let mut stdout = String::new();
            let mut stderr = String::new();

            let logs_options = Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                follow: true,
                ..Default::default()
            });

            let mut logs = self.docker.logs(&container_id, logs_options);
            while let Some(chunk) = logs.next().await {
                match chunk {
                    Ok(LogOutput::StdOut { message }) => {
                        stdout.push_str(&String::from_utf8_lossy(&message))
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        stderr.push_str(&String::from_utf8_lossy(&message))
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Error reading container logs");
                        break;
                    }
                }
            }

            let wait_options = Some(WaitContainerOptions {
                condition: "not-running",
            });
            let mut wait = self.docker.wait_container(&container_id, wait_options);
            // bollard reports non-zero exits as a wait error carrying the code
            let exit_code = match wait.next().await {
                Some(Ok(response)) => Some(response.status_code),
                Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => {
                    Some(code)
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Failed to get container exit code");
                    None
                }
                None => None,
            };

            (stdout, stderr, exit_code)
        };

        let outcome = match tokio::time::timeout(self.timeout, execution).await {
            Ok((stdout, stderr, exit_code)) => classify_exit(stdout, stderr, exit_code),
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Execution timed out, killing container"
                );
                if let Err(e) = self
                    .docker
                    .kill_container(&container_id, None::<KillContainerOptions<String>>)
                    .await
                {
                    warn!(error = %e, "Failed to kill timed-out container");
                }
                ExecutionOutcome::failed(
                    "",
                    format!("Execution timed out after {}ms", self.timeout.as_millis()),
                )
            }
        };

        debug!(
            execution_ms = start_time.elapsed().as_millis() as u64,
            success = outcome.success,
            "Container finished"
        );

        Ok(outcome)
    }
}
