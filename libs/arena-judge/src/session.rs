//! Session - the state machine behind one problem page
//!
//! **Run states:**
//! - `Idle`: nothing submitted since the last switch
//! - `Running`: one run in flight, waiting on the execution client
//! - `Evaluated(verdict)`: the last run finished with Pass, Fail or ExecutionError
//!
//! **Transitions:**
//! - `Submit` moves `Idle | Evaluated` to `Running` and emits `Effect::Execute`.
//!   While `Running` it is ignored, never queued.
//! - `Complete` moves `Running` to `Evaluated` if it carries the in-flight
//!   run id. Outcomes of superseded runs are dropped.
//! - `SelectProblem` / `SelectLanguage` reset to `Idle` and clear the last
//!   outcome, superseding any in-flight run.
//! - `Cancel` abandons the in-flight run and returns to `Idle`.
//!
//! All mutation goes through `Session::apply`, so sessions can be driven
//! in tests without any I/O.

use arena_common::catalog::ProblemCatalog;
use arena_common::types::{ExecutionOutcome, Language, Verdict};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::{CodeContext, SwitchRejected};
use crate::error::SessionError;
use crate::evaluator::Comparison;
use crate::notify::{Celebration, EXECUTION_FAILED_MESSAGE, PASS_MESSAGE, TESTS_FAILED_MESSAGE};

/// One submission attempt: exactly what was sent for execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Run {
    pub id: Uuid,
    pub problem_id: String,
    pub language: Language,
    pub source_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running(Run),
    Evaluated(Verdict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SelectProblem(String),
    SelectLanguage(Language),
    EditCode(String),
    Submit,
    Complete { run_id: Uuid, outcome: ExecutionOutcome },
    /// Abandon the in-flight run; `None` matches whichever run is in flight
    Cancel { run_id: Option<Uuid> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send this run to the execution client and report back with `Complete`
    Execute(Run),
    Celebrate(Celebration),
    NotifySuccess(String),
    NotifyFailure(String),
}

/// Why a command changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ignored {
    Switch(SwitchRejected),
    AlreadyRunning,
    StaleOutcome,
    NothingToCancel,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transition {
    pub effects: Vec<Effect>,
    pub ignored: Option<Ignored>,
}

impl Transition {
    fn applied(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            ignored: None,
        }
    }

    fn ignored(reason: Ignored) -> Self {
        Self {
            effects: Vec::new(),
            ignored: Some(reason),
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored.is_some()
    }

    /// The run to execute, if this transition started one
    pub fn run(&self) -> Option<&Run> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Execute(run) => Some(run),
            _ => None,
        })
    }
}

/// Serializable view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub problem_id: String,
    pub language: Language,
    pub code: String,
    pub last_outcome: Option<ExecutionOutcome>,
    pub verdict: Verdict,
    pub is_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct Session {
    context: CodeContext,
    last_outcome: Option<ExecutionOutcome>,
    phase: RunPhase,
}

impl Session {
    pub fn new(
        catalog: &dyn ProblemCatalog,
        problem_id: &str,
        language: Language,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            context: CodeContext::new(catalog, problem_id, language)?,
            last_outcome: None,
            phase: RunPhase::Idle,
        })
    }

    pub fn problem_id(&self) -> &str {
        self.context.problem_id()
    }

    pub fn language(&self) -> Language {
        self.context.language()
    }

    pub fn code_buffer(&self) -> &str {
        self.context.code_buffer()
    }

    pub fn last_outcome(&self) -> Option<&ExecutionOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, RunPhase::Running(_))
    }

    pub fn in_flight(&self) -> Option<&Run> {
        match &self.phase {
            RunPhase::Running(run) => Some(run),
            _ => None,
        }
    }

    pub fn verdict(&self) -> Verdict {
        match self.phase {
            RunPhase::Evaluated(verdict) => verdict,
            RunPhase::Idle | RunPhase::Running(_) => Verdict::Pending,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            problem_id: self.problem_id().to_string(),
            language: self.language(),
            code: self.code_buffer().to_string(),
            last_outcome: self.last_outcome.clone(),
            verdict: self.verdict(),
            is_running: self.is_running(),
            run_id: self.in_flight().map(|run| run.id),
        }
    }

    /// Apply one command. The only way a session changes.
    pub fn apply(&mut self, catalog: &dyn ProblemCatalog, command: Command) -> Transition {
        match command {
            Command::SelectProblem(problem_id) => {
                let result = self.context.select_problem(catalog, &problem_id);
                self.after_switch(result)
            }
            Command::SelectLanguage(language) => {
                let result = self.context.select_language(catalog, language);
                self.after_switch(result)
            }
            Command::EditCode(code) => {
                self.context.edit(code);
                Transition::applied(Vec::new())
            }
            Command::Submit => self.submit(),
            Command::Complete { run_id, outcome } => self.complete(catalog, run_id, outcome),
            Command::Cancel { run_id } => self.cancel(run_id),
        }
    }

    fn after_switch(&mut self, result: Result<(), SwitchRejected>) -> Transition {
        match result {
            Ok(()) => {
                if let Some(run) = self.in_flight() {
                    debug!(run_id = %run.id, "In-flight run superseded by context switch");
                }
                self.reset_run_state();
                Transition::applied(Vec::new())
            }
            Err(rejected) => Transition::ignored(Ignored::Switch(rejected)),
        }
    }

    fn reset_run_state(&mut self) {
        self.phase = RunPhase::Idle;
        self.last_outcome = None;
    }

    fn submit(&mut self) -> Transition {
        if let Some(run) = self.in_flight() {
            debug!(run_id = %run.id, "Submit ignored: run already in flight");
            return Transition::ignored(Ignored::AlreadyRunning);
        }

        let run = Run {
            id: Uuid::new_v4(),
            problem_id: self.context.problem_id().to_string(),
            language: self.context.language(),
            source_code: self.context.code_buffer().to_string(),
        };

        self.last_outcome = None;
        self.phase = RunPhase::Running(run.clone());
        Transition::applied(vec![Effect::Execute(run)])
    }

    fn complete(
        &mut self,
        catalog: &dyn ProblemCatalog,
        run_id: Uuid,
        outcome: ExecutionOutcome,
    ) -> Transition {
        let run = match &self.phase {
            RunPhase::Running(run) if run.id == run_id => run.clone(),
            _ => {
                debug!(run_id = %run_id, "Outcome dropped: run no longer in flight");
                return Transition::ignored(Ignored::StaleOutcome);
            }
        };

        let expected = catalog
            .get(&run.problem_id)
            .and_then(|problem| problem.expected_output_for(run.language));

        let verdict = classify(&outcome, expected, |actual, expected| {
            let comparison = Comparison::new(actual, expected);
            if !comparison.matches() {
                debug!(
                    run_id = %run.id,
                    expected = %comparison.expected,
                    actual = %comparison.actual,
                    "Output mismatch"
                );
            }
            comparison.verdict()
        });

        self.last_outcome = Some(outcome);
        self.phase = RunPhase::Evaluated(verdict);
        Transition::applied(terminal_effects(verdict))
    }

    fn cancel(&mut self, run_id: Option<Uuid>) -> Transition {
        match &self.phase {
            RunPhase::Running(run) if run_id.map_or(true, |id| id == run.id) => {
                debug!(run_id = %run.id, "Run cancelled");
                self.reset_run_state();
                Transition::applied(Vec::new())
            }
            _ => Transition::ignored(Ignored::NothingToCancel),
        }
    }
}

/// Classify a finished run. `judge` only runs when execution succeeded.
pub(crate) fn classify<F>(outcome: &ExecutionOutcome, expected: Option<&str>, judge: F) -> Verdict
where
    F: FnOnce(&str, &str) -> Verdict,
{
    if !outcome.success {
        return Verdict::ExecutionError;
    }

    match expected {
        Some(expected) => judge(&outcome.output, expected),
        None => {
            warn!("No expected output for run; marking as failed");
            Verdict::Fail
        }
    }
}

/// Presentation effects for entering a terminal state
pub fn terminal_effects(verdict: Verdict) -> Vec<Effect> {
    match verdict {
        Verdict::Pass => vec![
            Effect::Celebrate(Celebration::confetti()),
            Effect::NotifySuccess(PASS_MESSAGE.to_string()),
        ],
        Verdict::Fail => vec![Effect::NotifyFailure(TESTS_FAILED_MESSAGE.to_string())],
        Verdict::ExecutionError => {
            vec![Effect::NotifyFailure(EXECUTION_FAILED_MESSAGE.to_string())]
        }
        Verdict::Pending => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::catalog;
    use arena_common::catalog::StaticCatalog;
    use std::cell::Cell;

    fn session(catalog: &StaticCatalog) -> Session {
        Session::new(catalog, "two-sum", Language::JavaScript).unwrap()
    }

    fn start(session: &mut Session, catalog: &StaticCatalog) -> Run {
        session
            .apply(catalog, Command::Submit)
            .run()
            .cloned()
            .expect("submit should start a run")
    }

    #[test]
    fn test_new_session_is_idle() {
        let catalog = catalog();
        let s = session(&catalog);
        assert_eq!(s.phase(), &RunPhase::Idle);
        assert_eq!(s.verdict(), Verdict::Pending);
        assert!(!s.is_running());
        assert!(s.last_outcome().is_none());
        assert_eq!(s.code_buffer(), "// js two-sum");
    }

    #[test]
    fn test_submit_captures_exact_source() {
        let catalog = catalog();
        let mut s = session(&catalog);
        s.apply(&catalog, Command::EditCode("console.log([0, 1])".into()));

        let run = start(&mut s, &catalog);

        assert_eq!(run.problem_id, "two-sum");
        assert_eq!(run.language, Language::JavaScript);
        assert_eq!(run.source_code, "console.log([0, 1])");
        assert!(s.is_running());
        assert!(s.last_outcome().is_none());
        assert_eq!(s.verdict(), Verdict::Pending);
    }

    #[test]
    fn test_submit_while_running_is_ignored() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);
        let before = s.snapshot();

        let transition = s.apply(&catalog, Command::Submit);

        assert_eq!(transition.ignored, Some(Ignored::AlreadyRunning));
        assert!(transition.effects.is_empty());
        assert_eq!(s.snapshot(), before);
        assert_eq!(s.in_flight().map(|r| r.id), Some(run.id));
    }

    #[test]
    fn test_pass_emits_celebration_and_success() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);

        let transition = s.apply(
            &catalog,
            Command::Complete {
                run_id: run.id,
                outcome: ExecutionOutcome::succeeded("[ 0 , 1 ]\n"),
            },
        );

        assert_eq!(s.verdict(), Verdict::Pass);
        assert_eq!(s.phase(), &RunPhase::Evaluated(Verdict::Pass));
        assert_eq!(
            transition.effects,
            vec![
                Effect::Celebrate(Celebration::confetti()),
                Effect::NotifySuccess(PASS_MESSAGE.to_string()),
            ]
        );
        assert_eq!(s.last_outcome().map(|o| o.output.as_str()), Some("[ 0 , 1 ]\n"));
    }

    #[test]
    fn test_mismatch_emits_tests_failed() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);

        let transition = s.apply(
            &catalog,
            Command::Complete {
                run_id: run.id,
                outcome: ExecutionOutcome::succeeded("[1, 0]"),
            },
        );

        assert_eq!(s.verdict(), Verdict::Fail);
        assert_eq!(
            transition.effects,
            vec![Effect::NotifyFailure(TESTS_FAILED_MESSAGE.to_string())]
        );
    }

    #[test]
    fn test_execution_failure_skips_comparison() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);

        // output would match, but the failed flag wins
        let transition = s.apply(
            &catalog,
            Command::Complete {
                run_id: run.id,
                outcome: ExecutionOutcome::failed("[0,1]", "ReferenceError: x is not defined"),
            },
        );

        assert_eq!(s.verdict(), Verdict::ExecutionError);
        assert_eq!(
            transition.effects,
            vec![Effect::NotifyFailure(EXECUTION_FAILED_MESSAGE.to_string())]
        );
    }

    #[test]
    fn test_classify_never_judges_failed_execution() {
        let calls = Cell::new(0);
        let verdict = classify(&ExecutionOutcome::failed("", "boom"), Some("x"), |_, _| {
            calls.set(calls.get() + 1);
            Verdict::Pass
        });
        assert_eq!(verdict, Verdict::ExecutionError);
        assert_eq!(calls.get(), 0);

        let verdict = classify(&ExecutionOutcome::succeeded("x"), Some("x"), |_, _| {
            calls.set(calls.get() + 1);
            Verdict::Pass
        });
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_classify_without_expected_output_fails() {
        let verdict = classify(&ExecutionOutcome::succeeded("x"), None, |_, _| Verdict::Pass);
        assert_eq!(verdict, Verdict::Fail);
    }

    #[test]
    fn test_duplicate_completion_fires_effects_once() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);
        let complete = Command::Complete {
            run_id: run.id,
            outcome: ExecutionOutcome::succeeded("[0,1]"),
        };

        let first = s.apply(&catalog, complete.clone());
        let second = s.apply(&catalog, complete);

        assert_eq!(first.effects.len(), 2);
        assert_eq!(second.ignored, Some(Ignored::StaleOutcome));
        assert!(second.effects.is_empty());
        assert_eq!(s.verdict(), Verdict::Pass);
    }

    #[test]
    fn test_rerun_from_evaluated() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let first = start(&mut s, &catalog);
        s.apply(
            &catalog,
            Command::Complete {
                run_id: first.id,
                outcome: ExecutionOutcome::succeeded("wrong"),
            },
        );
        assert_eq!(s.verdict(), Verdict::Fail);

        let second = start(&mut s, &catalog);

        assert_ne!(first.id, second.id);
        assert!(s.is_running());
        assert!(s.last_outcome().is_none());
        assert_eq!(s.verdict(), Verdict::Pending);
    }

    #[test]
    fn test_language_switch_resets_verdict_and_code() {
        let catalog = catalog();
        let mut s = session(&catalog);
        s.apply(&catalog, Command::EditCode("my edits".into()));
        let run = start(&mut s, &catalog);
        s.apply(
            &catalog,
            Command::Complete {
                run_id: run.id,
                outcome: ExecutionOutcome::succeeded("[0,1]"),
            },
        );
        assert_eq!(s.verdict(), Verdict::Pass);

        let transition = s.apply(&catalog, Command::SelectLanguage(Language::Python));

        assert!(!transition.is_ignored());
        assert_eq!(s.verdict(), Verdict::Pending);
        assert!(s.last_outcome().is_none());
        assert!(!s.is_running());
        assert_eq!(s.language(), Language::Python);
        assert_eq!(s.code_buffer(), "# py two-sum");
    }

    #[test]
    fn test_problem_switch_resets_run_state() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);
        s.apply(
            &catalog,
            Command::Complete {
                run_id: run.id,
                outcome: ExecutionOutcome::failed("", "boom"),
            },
        );

        s.apply(&catalog, Command::SelectProblem("reverse".into()));

        assert_eq!(s.problem_id(), "reverse");
        assert_eq!(s.code_buffer(), "// js reverse");
        assert_eq!(s.verdict(), Verdict::Pending);
        assert!(s.last_outcome().is_none());
    }

    #[test]
    fn test_unknown_problem_switch_is_noop() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);
        s.apply(
            &catalog,
            Command::Complete {
                run_id: run.id,
                outcome: ExecutionOutcome::succeeded("[0,1]"),
            },
        );
        let before = s.snapshot();

        let transition = s.apply(&catalog, Command::SelectProblem("missing".into()));

        assert_eq!(transition.ignored, Some(Ignored::Switch(SwitchRejected::CatalogMiss)));
        assert_eq!(s.snapshot(), before);
        assert_eq!(s.verdict(), Verdict::Pass);
    }

    #[test]
    fn test_switch_while_running_supersedes_run() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);

        s.apply(&catalog, Command::SelectLanguage(Language::Python));
        assert!(!s.is_running());
        assert_eq!(s.verdict(), Verdict::Pending);

        let late = s.apply(
            &catalog,
            Command::Complete {
                run_id: run.id,
                outcome: ExecutionOutcome::succeeded("[0,1]"),
            },
        );

        assert_eq!(late.ignored, Some(Ignored::StaleOutcome));
        assert!(late.effects.is_empty());
        assert_eq!(s.verdict(), Verdict::Pending);
        assert!(s.last_outcome().is_none());
    }

    #[test]
    fn test_unsupported_language_switch_is_noop() {
        let catalog = catalog();
        let mut s = Session::new(&catalog, "py-only", Language::Python).unwrap();
        s.apply(&catalog, Command::EditCode("print(42)".into()));

        let transition = s.apply(&catalog, Command::SelectLanguage(Language::Java));

        assert_eq!(
            transition.ignored,
            Some(Ignored::Switch(SwitchRejected::UnsupportedLanguage))
        );
        assert_eq!(s.language(), Language::Python);
        assert_eq!(s.code_buffer(), "print(42)");
    }

    #[test]
    fn test_edit_during_run_does_not_touch_run() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);

        s.apply(&catalog, Command::EditCode("newer".into()));

        assert_eq!(s.code_buffer(), "newer");
        assert_eq!(s.in_flight().map(|r| r.source_code.as_str()), Some(run.source_code.as_str()));
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);

        let transition = s.apply(&catalog, Command::Cancel { run_id: Some(run.id) });

        assert!(!transition.is_ignored());
        assert_eq!(s.phase(), &RunPhase::Idle);

        let late = s.apply(
            &catalog,
            Command::Complete {
                run_id: run.id,
                outcome: ExecutionOutcome::succeeded("[0,1]"),
            },
        );
        assert_eq!(late.ignored, Some(Ignored::StaleOutcome));
    }

    #[test]
    fn test_cancel_other_run_is_ignored() {
        let catalog = catalog();
        let mut s = session(&catalog);
        start(&mut s, &catalog);

        let transition = s.apply(&catalog, Command::Cancel { run_id: Some(Uuid::new_v4()) });

        assert_eq!(transition.ignored, Some(Ignored::NothingToCancel));
        assert!(s.is_running());
    }

    #[test]
    fn test_cancel_when_idle_is_ignored() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let transition = s.apply(&catalog, Command::Cancel { run_id: None });
        assert_eq!(transition.ignored, Some(Ignored::NothingToCancel));
    }

    #[test]
    fn test_snapshot_serializes() {
        let catalog = catalog();
        let mut s = session(&catalog);
        let run = start(&mut s, &catalog);

        let json = serde_json::to_value(s.snapshot()).unwrap();

        assert_eq!(json["problem_id"], "two-sum");
        assert_eq!(json["language"], "javascript");
        assert_eq!(json["verdict"], "pending");
        assert_eq!(json["is_running"], true);
        assert_eq!(json["run_id"], run.id.to_string());
        assert!(json["last_outcome"].is_null());
    }
}
