// Problem catalog: read-only lookup of problems by id
use crate::types::{Language, Problem};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const BUILTIN_PROBLEMS: &str = include_str!("../../../config/problems.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("problem catalog not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read problem catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse problem catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("problem catalog is empty")]
    Empty,

    #[error("duplicate problem id: {0}")]
    DuplicateId(String),

    #[error("problem '{0}' has no starter code")]
    NoStarterCode(String),

    #[error("problem '{id}' has starter code for {language} but no expected output")]
    MissingExpectedOutput { id: String, language: Language },
}

/// Read-only access to problems.
///
/// Listing order matters only to listing views; lookups never depend on it.
pub trait ProblemCatalog: Send + Sync {
    fn get(&self, id: &str) -> Option<&Problem>;

    fn all_problems(&self) -> Vec<&Problem>;
}

#[derive(Deserialize)]
struct ProblemsFile {
    problems: Vec<Problem>,
}

/// Catalog held entirely in memory, loaded once at startup.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    problems: Vec<Problem>,
    index: HashMap<String, usize>,
}

impl StaticCatalog {
    pub fn from_problems(problems: Vec<Problem>) -> Result<Self, CatalogError> {
        if problems.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut index = HashMap::with_capacity(problems.len());
        for (pos, problem) in problems.iter().enumerate() {
            validate_problem(problem)?;
            if index.insert(problem.id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateId(problem.id.clone()));
            }
        }

        Ok(Self { problems, index })
    }

    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let file: ProblemsFile = serde_json::from_str(content)?;
        Self::from_problems(file.problems)
    }

    /// Load the catalog from a `problems.json` file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_json_str(&content)?;
        debug!(path = %path.display(), problems = catalog.len(), "Loaded problem catalog");
        Ok(catalog)
    }

    /// The catalog compiled into the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_PROBLEMS)
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

impl ProblemCatalog for StaticCatalog {
    fn get(&self, id: &str) -> Option<&Problem> {
        self.index.get(id).map(|&pos| &self.problems[pos])
    }

    fn all_problems(&self) -> Vec<&Problem> {
        self.problems.iter().collect()
    }
}

fn validate_problem(problem: &Problem) -> Result<(), CatalogError> {
    if problem.starter_code.is_empty() {
        return Err(CatalogError::NoStarterCode(problem.id.clone()));
    }

    for language in problem.starter_code.keys() {
        if !problem.expected_output.contains_key(language) {
            return Err(CatalogError::MissingExpectedOutput {
                id: problem.id.clone(),
                language: *language,
            });
        }
    }

    Ok(())
}
