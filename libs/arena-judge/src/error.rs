use arena_common::types::Language;

/// Errors creating a session. Switches on a live session never error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("unknown problem: {0}")]
    UnknownProblem(String),

    #[error("problem '{problem_id}' has no starter code for {language}")]
    UnsupportedLanguage {
        problem_id: String,
        language: Language,
    },
}

/// Failures of the execution client itself, as opposed to failures of the
/// submitted program (those are reported through `ExecutionOutcome`).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("sandbox unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::MalformedResponse(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<bollard::errors::Error> for ClientError {
    fn from(err: bollard::errors::Error) -> Self {
        ClientError::Unavailable(err.to_string())
    }
}
