/// Run Controller - High-Level Orchestration
///
/// **Responsibility:**
/// Drive one submission through a session: start the run, await the
/// execution client, feed the outcome back, and present the effects.
///
/// **Architecture:**
/// 1. `Session::apply(Submit)` decides whether a run may start (session.rs)
/// 2. The execution client runs the code (client/)
/// 3. `Session::apply(Complete)` normalizes, evaluates and picks effects
/// 4. The presenter shows notifications and the celebration (notify.rs)
///
/// The session lock is never held across the execution await, so the
/// session stays usable (edits, switches, snapshots) while a run is out.
use arena_common::catalog::ProblemCatalog;
use arena_common::types::{ExecutionOutcome, Verdict};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::client::ExecutionClient;
use crate::notify::Presenter;
use crate::session::{Command, Run, Session};

/// What became of one submit request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunReport {
    Evaluated {
        run_id: Uuid,
        verdict: Verdict,
        elapsed_ms: u64,
    },
    /// A run was already in flight; nothing was sent
    Ignored,
    /// A context switch or cancel replaced the run before it finished
    Superseded { run_id: Uuid },
    Cancelled { run_id: Uuid },
}

#[derive(Clone)]
pub struct RunController {
    catalog: Arc<dyn ProblemCatalog>,
    client: Arc<dyn ExecutionClient>,
}

impl RunController {
    pub fn new(catalog: Arc<dyn ProblemCatalog>, client: Arc<dyn ExecutionClient>) -> Self {
        Self { catalog, client }
    }

    pub fn catalog(&self) -> &dyn ProblemCatalog {
        self.catalog.as_ref()
    }

    /// Submit the session's current code and wait for the verdict
    pub async fn submit(&self, session: &Mutex<Session>, presenter: &Presenter<'_>) -> RunReport {
        self.submit_with_cancel(session, presenter, &CancellationToken::new())
            .await
    }

    /// Like `submit`, but gives up on the run when `cancel` fires
    pub async fn submit_with_cancel(
        &self,
        session: &Mutex<Session>,
        presenter: &Presenter<'_>,
        cancel: &CancellationToken,
    ) -> RunReport {
        match self.start(session).await {
            Some(run) => self.finish(session, presenter, run, cancel).await,
            None => RunReport::Ignored,
        }
    }

    /// Apply `Submit`. Returns the run to execute, or `None` when one is
    /// already in flight.
    pub async fn start(&self, session: &Mutex<Session>) -> Option<Run> {
        let mut guard = session.lock().await;
        let transition = guard.apply(self.catalog(), Command::Submit);
        transition.run().cloned()
    }

    /// Execute a run returned by `start`, feed the outcome back and
    /// present the effects
    #[instrument(skip_all, fields(run_id = %run.id))]
    pub async fn finish(
        &self,
        session: &Mutex<Session>,
        presenter: &Presenter<'_>,
        run: Run,
        cancel: &CancellationToken,
    ) -> RunReport {
        info!(
            run_id = %run.id,
            problem_id = %run.problem_id,
            language = %run.language,
            source_size = run.source_code.len(),
            "Run started"
        );

        let started = Instant::now();
        let outcome = tokio::select! {
            result = self.client.execute(run.language, &run.source_code) => match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(run_id = %run.id, error = %e, "Execution client failed");
                    ExecutionOutcome::failed("", format!("Failed to execute code: {}", e))
                }
            },
            _ = cancel.cancelled() => {
                let mut guard = session.lock().await;
                guard.apply(self.catalog(), Command::Cancel { run_id: Some(run.id) });
                info!(run_id = %run.id, "Run cancelled");
                return RunReport::Cancelled { run_id: run.id };
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let (transition, verdict) = {
            let mut guard = session.lock().await;
            let transition = guard.apply(
                self.catalog(),
                Command::Complete {
                    run_id: run.id,
                    outcome,
                },
            );
            (transition, guard.verdict())
        };

        if transition.is_ignored() {
            info!(run_id = %run.id, "Run superseded before its outcome arrived");
            return RunReport::Superseded { run_id: run.id };
        }

        info!(run_id = %run.id, verdict = %verdict, elapsed_ms, "Run evaluated");
        presenter.present(&transition.effects);

        RunReport::Evaluated {
            run_id: run.id,
            verdict,
            elapsed_ms,
        }
    }
}
