// Context switching: keeps problem, language and code buffer consistent
use arena_common::catalog::ProblemCatalog;
use arena_common::types::{Language, Problem};
use serde::Serialize;
use tracing::debug;

use crate::error::SessionError;

/// Why a switch left the context untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchRejected {
    /// The requested problem is not in the catalog
    CatalogMiss,
    /// The current problem has no starter code for the requested language
    UnsupportedLanguage,
}

/// The problem/language pair being worked on and the editable code buffer.
///
/// The buffer holds the starter code for the pair right after any switch,
/// and the user's edits afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeContext {
    problem_id: String,
    language: Language,
    code_buffer: String,
}

impl CodeContext {
    pub fn new(
        catalog: &dyn ProblemCatalog,
        problem_id: &str,
        language: Language,
    ) -> Result<Self, SessionError> {
        let problem = catalog
            .get(problem_id)
            .ok_or_else(|| SessionError::UnknownProblem(problem_id.to_string()))?;

        let code_buffer = problem
            .starter_code_for(language)
            .ok_or_else(|| SessionError::UnsupportedLanguage {
                problem_id: problem_id.to_string(),
                language,
            })?
            .to_string();

        Ok(Self {
            problem_id: problem.id.clone(),
            language,
            code_buffer,
        })
    }

    pub fn problem_id(&self) -> &str {
        &self.problem_id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn code_buffer(&self) -> &str {
        &self.code_buffer
    }

    pub fn edit(&mut self, code: String) {
        self.code_buffer = code;
    }

    /// Select another problem, keeping the current language.
    ///
    /// An unknown id leaves the context unchanged. If the new problem has no
    /// starter code for the current language, its first language is taken.
    pub fn select_problem(
        &mut self,
        catalog: &dyn ProblemCatalog,
        problem_id: &str,
    ) -> Result<(), SwitchRejected> {
        let Some(problem) = catalog.get(problem_id) else {
            debug!(problem_id, "Problem switch ignored: not in catalog");
            return Err(SwitchRejected::CatalogMiss);
        };

        let language = if problem.supports(self.language) {
            self.language
        } else {
            let fallback = first_language(problem).ok_or(SwitchRejected::UnsupportedLanguage)?;
            debug!(
                problem_id,
                from = %self.language,
                to = %fallback,
                "Problem lacks current language, falling back"
            );
            fallback
        };

        self.load(problem, language)
    }

    /// Select another language for the current problem.
    ///
    /// Always reloads the starter code, discarding edits.
    pub fn select_language(
        &mut self,
        catalog: &dyn ProblemCatalog,
        language: Language,
    ) -> Result<(), SwitchRejected> {
        let Some(problem) = catalog.get(&self.problem_id) else {
            return Err(SwitchRejected::CatalogMiss);
        };

        if !problem.supports(language) {
            debug!(
                problem_id = %self.problem_id,
                language = %language,
                "Language switch ignored: no starter code"
            );
            return Err(SwitchRejected::UnsupportedLanguage);
        }

        self.load(problem, language)
    }

    fn load(&mut self, problem: &Problem, language: Language) -> Result<(), SwitchRejected> {
        let starter = problem
            .starter_code_for(language)
            .ok_or(SwitchRejected::UnsupportedLanguage)?;

        self.problem_id = problem.id.clone();
        self.language = language;
        self.code_buffer = starter.to_string();
        Ok(())
    }
}

fn first_language(problem: &Problem) -> Option<Language> {
    problem.starter_code.keys().next().copied()
}
