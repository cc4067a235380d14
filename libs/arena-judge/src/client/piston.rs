// Client for a Piston-compatible code execution service
use arena_common::languages::LanguageConfigManager;
use arena_common::types::{ExecutionOutcome, Language};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::ExecutionClient;
use crate::error::ClientError;

const USER_AGENT: &str = concat!("arena-judge/", env!("CARGO_PKG_VERSION"));
const NO_OUTPUT: &str = "No output";

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<SourceFile<'a>>,
}

#[derive(Debug, Serialize)]
struct SourceFile<'a> {
    name: String,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    run: Stage,
    #[serde(default)]
    compile: Option<Stage>,
}

#[derive(Debug, Default, Deserialize)]
struct Stage {
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    output: String,
    #[serde(default)]
    code: Option<i64>,
}

pub struct PistonClient {
    http: reqwest::Client,
    base_url: String,
    languages: LanguageConfigManager,
}

impl PistonClient {
    pub fn new(
        base_url: impl Into<String>,
        languages: LanguageConfigManager,
    ) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, languages, None)
    }

    /// `timeout` bounds the HTTP exchange only; `None` waits indefinitely
    pub fn with_timeout(
        base_url: impl Into<String>,
        languages: LanguageConfigManager,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            languages,
        })
    }
}

#[async_trait]
impl ExecutionClient for PistonClient {
    #[instrument(
        skip(self, source_code),
        fields(language = %language, source_size = source_code.len())
    )]
    async fn execute(
        &self,
        language: Language,
        source_code: &str,
    ) -> Result<ExecutionOutcome, ClientError> {
        let Ok(config) = self.languages.get_config(language) else {
            return Ok(ExecutionOutcome {
                success: false,
                output: String::new(),
                error: Some(format!("Unsupported language: {}", language)),
            });
        };

        let request = ExecuteRequest {
            language: &config.piston_language,
            version: &config.piston_version,
            files: vec![SourceFile {
                name: format!("main.{}", config.file_extension),
                content: source_code,
            }],
        };

        let response = self
            .http
            .post(format!("{}/execute", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "Execution service returned an error status");
            return Ok(ExecutionOutcome {
                success: false,
                output: String::new(),
                error: Some(format!("HTTP error! status: {}", status.as_u16())),
            });
        }

        let body: ExecuteResponse = response.json().await?;
        Ok(into_outcome(body))
    }
}

fn into_outcome(body: ExecuteResponse) -> ExecutionOutcome {
    if let Some(compile) = body.compile {
        if compile.code.is_some_and(|code| code != 0) {
            let detail = if compile.stderr.is_empty() {
                compile.output.clone()
            } else {
                compile.stderr
            };
            return ExecutionOutcome::failed(compile.output, detail);
        }
    }

    let run = body.run;
    if !run.stderr.is_empty() {
        return ExecutionOutcome::failed(run.output, run.stderr);
    }

    if run.output.is_empty() {
        ExecutionOutcome::succeeded(NO_OUTPUT)
    } else {
        ExecutionOutcome::succeeded(run.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> ExecuteResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_clean_run_succeeds() {
        let outcome = into_outcome(response(
            r#"{"run": {"stdout": "[ 0, 1 ]\n", "stderr": "", "output": "[ 0, 1 ]\n", "code": 0}}"#,
        ));
        assert_eq!(outcome, ExecutionOutcome::succeeded("[ 0, 1 ]\n"));
    }

    #[test]
    fn test_stderr_fails_run() {
        let outcome = into_outcome(response(
            r#"{"run": {"stdout": "", "stderr": "ReferenceError: x is not defined", "output": "ReferenceError: x is not defined", "code": 1}}"#,
        ));
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("ReferenceError: x is not defined"));
    }

    #[test]
    fn test_empty_output_is_reported() {
        let outcome = into_outcome(response(
            r#"{"run": {"stdout": "", "stderr": "", "output": "", "code": 0}}"#,
        ));
        assert_eq!(outcome, ExecutionOutcome::succeeded("No output"));
    }

    #[test]
    fn test_compile_failure() {
        let outcome = into_outcome(response(
            r#"{
                "compile": {"stdout": "", "stderr": "Main.java:3: error: ';' expected", "output": "Main.java:3: error: ';' expected", "code": 1},
                "run": {"stdout": "", "stderr": "", "output": "", "code": null}
            }"#,
        ));
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Main.java:3: error: ';' expected"));
    }

    #[test]
    fn test_successful_compile_stage_is_ignored() {
        let outcome = into_outcome(response(
            r#"{
                "compile": {"stdout": "", "stderr": "", "output": "", "code": 0},
                "run": {"stdout": "[0, 1]\n", "stderr": "", "output": "[0, 1]\n", "code": 0}
            }"#,
        ));
        assert!(outcome.success);
    }

    #[test]
    fn test_request_shape() {
        let request = ExecuteRequest {
            language: "python",
            version: "3.10.0",
            files: vec![SourceFile {
                name: "main.py".to_string(),
                content: "print(1)",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["language"], "python");
        assert_eq!(json["version"], "3.10.0");
        assert_eq!(json["files"][0]["name"], "main.py");
        assert_eq!(json["files"][0]["content"], "print(1)");
    }
}
