// HTTP route handlers for the Arena API

use arena_common::types::{Difficulty, Language, Problem, ProblemExample};
use arena_judge::context::SwitchRejected;
use arena_judge::notify::{Celebration, CollectingSink, Notification, Presenter};
use arena_judge::session::{Ignored, Transition};
use arena_judge::{Command, RunReport, SessionError, SessionSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics::{IGNORED_SUBMITS_TOTAL, RUNS_TOTAL, RUN_DURATION_SECONDS};
use crate::state::{AppState, SessionEntry};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

async fn find_session(state: &AppState, session_id: &str) -> Result<Arc<SessionEntry>, Response> {
    let id = Uuid::parse_str(session_id)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid session ID format"))?;

    state
        .get_session(&id)
        .await
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Session not found: {}", id)))
}

/// Map an ignored switch onto an HTTP error, or return the new snapshot
fn switch_response(transition: Transition, snapshot: SessionSnapshot) -> Response {
    match transition.ignored {
        Some(Ignored::Switch(SwitchRejected::CatalogMiss)) => {
            error_response(StatusCode::NOT_FOUND, "Problem not found")
        }
        Some(Ignored::Switch(SwitchRejected::UnsupportedLanguage)) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "Problem '{}' has no starter code for the requested language",
                snapshot.problem_id
            ),
        ),
        _ => (StatusCode::OK, Json(snapshot)).into_response(),
    }
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "msg": "success from api." })))
}

/// GET /metrics - Prometheus exposition
pub async fn metrics() -> Response {
    match crate::metrics::render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render metrics")
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProblemSummary<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub difficulty: Difficulty,
    pub category: &'a str,
    pub languages: Vec<Language>,
}

/// Everything a solver may see; expected outputs stay on the server
#[derive(Debug, Serialize)]
pub struct ProblemView<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub difficulty: Difficulty,
    pub category: &'a str,
    pub description: &'a str,
    pub examples: &'a [ProblemExample],
    pub constraints: &'a [String],
    pub starter_code: &'a BTreeMap<Language, String>,
}

impl<'a> From<&'a Problem> for ProblemView<'a> {
    fn from(problem: &'a Problem) -> Self {
        Self {
            id: &problem.id,
            title: &problem.title,
            difficulty: problem.difficulty,
            category: &problem.category,
            description: &problem.description,
            examples: &problem.examples,
            constraints: &problem.constraints,
            starter_code: &problem.starter_code,
        }
    }
}

/// GET /problems - List the catalog
pub async fn list_problems(State(state): State<Arc<AppState>>) -> Response {
    let summaries: Vec<ProblemSummary> = state
        .catalog()
        .all_problems()
        .into_iter()
        .map(|p| ProblemSummary {
            id: &p.id,
            title: &p.title,
            difficulty: p.difficulty,
            category: &p.category,
            languages: p.languages(),
        })
        .collect();

    (StatusCode::OK, Json(summaries)).into_response()
}

/// GET /problems/{problem_id} - One problem with its starter code
pub async fn get_problem(
    State(state): State<Arc<AppState>>,
    Path(problem_id): Path<String>,
) -> Response {
    match state.catalog().get(&problem_id) {
        Some(problem) => (StatusCode::OK, Json(ProblemView::from(problem))).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Problem not found: {}", problem_id)),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub problem_id: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

/// POST /sessions - Open a session on a problem
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Response {
    match state
        .create_session(payload.problem_id.as_deref(), payload.language)
        .await
    {
        Ok((session_id, entry)) => {
            let snapshot = entry.session.lock().await.snapshot();
            (
                StatusCode::CREATED,
                Json(CreateSessionResponse {
                    session_id,
                    snapshot,
                }),
            )
                .into_response()
        }
        Err(e @ SessionError::UnknownProblem(_)) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e @ SessionError::UnsupportedLanguage { .. }) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
    }
}

/// GET /sessions/{session_id} - Current session state
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    let entry = match find_session(&state, &session_id).await {
        Ok(entry) => entry,
        Err(response) => return response,
    };

    let snapshot = entry.session.lock().await.snapshot();
    (StatusCode::OK, Json(snapshot)).into_response()
}

/// DELETE /sessions/{session_id} - Close a session
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&session_id) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid session ID format");
    };

    if state.remove_session(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, format!("Session not found: {}", id))
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectProblemRequest {
    pub problem_id: String,
}

/// PUT /sessions/{session_id}/problem - Switch problem
pub async fn select_problem(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<SelectProblemRequest>,
) -> Response {
    let entry = match find_session(&state, &session_id).await {
        Ok(entry) => entry,
        Err(response) => return response,
    };

    let mut session = entry.session.lock().await;
    let transition = session.apply(state.catalog(), Command::SelectProblem(payload.problem_id));
    switch_response(transition, session.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct SelectLanguageRequest {
    pub language: Language,
}

/// PUT /sessions/{session_id}/language - Switch language
pub async fn select_language(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<SelectLanguageRequest>,
) -> Response {
    let entry = match find_session(&state, &session_id).await {
        Ok(entry) => entry,
        Err(response) => return response,
    };

    let mut session = entry.session.lock().await;
    let transition = session.apply(state.catalog(), Command::SelectLanguage(payload.language));
    switch_response(transition, session.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct EditCodeRequest {
    pub code: String,
}

/// PUT /sessions/{session_id}/code - Replace the code buffer
pub async fn edit_code(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<EditCodeRequest>,
) -> Response {
    let entry = match find_session(&state, &session_id).await {
        Ok(entry) => entry,
        Err(response) => return response,
    };

    let mut session = entry.session.lock().await;
    session.apply(state.catalog(), Command::EditCode(payload.code));
    (StatusCode::OK, Json(session.snapshot())).into_response()
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    #[serde(flatten)]
    pub report: RunReport,
    pub snapshot: SessionSnapshot,
    pub notifications: Vec<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celebration: Option<Celebration>,
}

fn record_run(report: &RunReport) {
    match report {
        RunReport::Evaluated {
            verdict, elapsed_ms, ..
        } => {
            RUNS_TOTAL.with_label_values(&[verdict.as_str()]).inc();
            RUN_DURATION_SECONDS.observe(*elapsed_ms as f64 / 1000.0);
        }
        RunReport::Ignored => IGNORED_SUBMITS_TOTAL.inc(),
        RunReport::Superseded { .. } => RUNS_TOTAL.with_label_values(&["superseded"]).inc(),
        RunReport::Cancelled { .. } => RUNS_TOTAL.with_label_values(&["cancelled"]).inc(),
    }
}

/// POST /sessions/{session_id}/run - Execute and judge the current code
///
/// Waits for the verdict. A submit while a run is in flight returns 409
/// and changes nothing.
pub async fn run_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    let entry = match find_session(&state, &session_id).await {
        Ok(entry) => entry,
        Err(response) => return response,
    };

    let sink = CollectingSink::new();
    let presenter = Presenter::new(&sink, &sink);

    let report = match state.controller.start(&entry.session).await {
        Some(run) => {
            let run_id = run.id;
            let token = entry.arm(run_id);
            let report = state
                .controller
                .finish(&entry.session, &presenter, run, &token)
                .await;
            entry.disarm(run_id);
            report
        }
        None => RunReport::Ignored,
    };
    record_run(&report);

    let status = match report {
        RunReport::Ignored => {
            warn!(session_id = %session_id, "Submit ignored: run already in flight");
            StatusCode::CONFLICT
        }
        _ => StatusCode::OK,
    };

    let snapshot = entry.session.lock().await.snapshot();
    (
        status,
        Json(RunResponse {
            report,
            snapshot,
            notifications: sink.notifications(),
            celebration: sink.celebrations().into_iter().next(),
        }),
    )
        .into_response()
}

/// POST /sessions/{session_id}/cancel - Abandon the in-flight run
pub async fn cancel_run(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    let entry = match find_session(&state, &session_id).await {
        Ok(entry) => entry,
        Err(response) => return response,
    };

    let mut session = entry.session.lock().await;
    let Some(run_id) = session.in_flight().map(|run| run.id) else {
        return error_response(StatusCode::CONFLICT, "No run in flight");
    };

    session.apply(
        state.catalog(),
        Command::Cancel {
            run_id: Some(run_id),
        },
    );
    entry.abort(Some(run_id));
    info!(session_id = %session_id, "Run cancelled by client");
    (StatusCode::OK, Json(session.snapshot())).into_response()
}
