//! Execution Client - Abstraction for Code Execution
//!
//! **Core Responsibility:**
//! Run a submission's source code and report what it printed.
//!
//! **Critical Architectural Boundary:**
//! - Clients know HOW to execute (Piston service, Docker, ...)
//! - Clients do NOT know expected outputs
//! - Clients do NOT evaluate correctness
//! - Program failures (compile error, crash, non-zero exit) are an
//!   `ExecutionOutcome` with `success == false`, never a `ClientError`

pub mod docker;
pub mod piston;

use arena_common::config::{ArenaConfig, ExecutorKind};
use arena_common::languages::LanguageConfigManager;
use arena_common::types::{ExecutionOutcome, Language};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::ClientError;

pub use docker::DockerClient;
pub use piston::PistonClient;

#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn execute(
        &self,
        language: Language,
        source_code: &str,
    ) -> Result<ExecutionOutcome, ClientError>;
}

/// Build the execution client selected by `ARENA_EXECUTOR`
pub fn from_config(
    config: &ArenaConfig,
    languages: LanguageConfigManager,
) -> Result<Arc<dyn ExecutionClient>, ClientError> {
    match config.executor {
        ExecutorKind::Piston => {
            info!(url = %config.piston_url, "Using Piston executor");
            Ok(Arc::new(PistonClient::new(config.piston_url.clone(), languages)?))
        }
        ExecutorKind::Docker => {
            info!(timeout_ms = config.docker_timeout_ms, "Using Docker executor");
            Ok(Arc::new(DockerClient::new(
                languages,
                Duration::from_millis(config.docker_timeout_ms),
            )?))
        }
    }
}
