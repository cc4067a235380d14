// CLI commands for Arena
use anyhow::{bail, Context, Result};
use arena_common::catalog::{ProblemCatalog, StaticCatalog};
use arena_common::config::ArenaConfig;
use arena_common::languages::LanguageConfigManager;
use arena_common::types::{Language, Verdict};
use arena_judge::notify::{
    Celebration, CelebrationTrigger, CollectingSink, NotificationSink, Presenter,
};
use arena_judge::{client, evaluate, normalize_output, Command, RunController, RunReport, Session};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Prints notifications the way a terminal user expects to see them
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify_success(&self, message: &str) {
        println!("✓ {}", message);
    }

    fn notify_failure(&self, message: &str) {
        println!("✗ {}", message);
    }
}

impl CelebrationTrigger for ConsoleSink {
    fn celebrate(&self, celebration: &Celebration) {
        println!("{}", "🎉".repeat(celebration.bursts.len()));
    }
}

fn load_catalog(config: &ArenaConfig) -> Result<StaticCatalog> {
    let catalog = match &config.catalog_path {
        Some(path) => StaticCatalog::load(path)?,
        None => StaticCatalog::builtin()?,
    };
    Ok(catalog)
}

/// List the problems in the catalog
pub fn list_problems() -> Result<()> {
    let config = ArenaConfig::from_env()?;
    let catalog = load_catalog(&config)?;

    println!("{:<20} {:<28} {:<8} LANGUAGES", "ID", "TITLE", "LEVEL");
    for problem in catalog.all_problems() {
        let languages: Vec<&str> = problem.languages().iter().map(|l| l.as_str()).collect();
        println!(
            "{:<20} {:<28} {:<8} {}",
            problem.id,
            problem.title,
            format!("{:?}", problem.difficulty),
            languages.join(", ")
        );
    }

    Ok(())
}

/// Print a problem statement, its examples and starter code
pub fn show_problem(problem_id: &str, language: Option<Language>) -> Result<()> {
    let config = ArenaConfig::from_env()?;
    let catalog = load_catalog(&config)?;
    let Some(problem) = catalog.get(problem_id) else {
        bail!("Problem not found: {}", problem_id);
    };

    println!("{} ({:?})", problem.title, problem.difficulty);
    if !problem.category.is_empty() {
        println!("Category: {}", problem.category);
    }
    println!();
    println!("{}", problem.description);

    for (idx, example) in problem.examples.iter().enumerate() {
        println!();
        println!("Example {}:", idx + 1);
        println!("  Input:  {}", example.input);
        println!("  Output: {}", example.output);
        if let Some(explanation) = &example.explanation {
            println!("  Explanation: {}", explanation);
        }
    }

    if !problem.constraints.is_empty() {
        println!();
        println!("Constraints:");
        for constraint in &problem.constraints {
            println!("  - {}", constraint);
        }
    }

    let languages = match language {
        Some(language) if !problem.supports(language) => {
            bail!("Problem '{}' has no starter code for {}", problem_id, language)
        }
        Some(language) => vec![language],
        None => problem.languages(),
    };

    for language in languages {
        if let Some(code) = problem.starter_code_for(language) {
            println!();
            println!("--- {} ---", language);
            println!("{}", code);
        }
    }

    Ok(())
}

/// Run a solution through the configured executor and judge it.
/// Returns whether it passed.
pub async fn run_solution(
    problem_id: &str,
    language: Language,
    file: Option<&Path>,
    json: bool,
) -> Result<bool> {
    let config = ArenaConfig::from_env()?;
    let catalog: Arc<dyn ProblemCatalog> = Arc::new(load_catalog(&config)?);
    let languages = LanguageConfigManager::load(&config.languages_path)?;
    debug!(languages = ?languages.list_languages(), "Language configuration loaded");
    let client = client::from_config(&config, languages)?;
    let controller = RunController::new(catalog, client);

    let mut session = Session::new(controller.catalog(), problem_id, language)?;
    if let Some(path) = file {
        let code = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        session.apply(controller.catalog(), Command::EditCode(code));
    } else if !json {
        println!("No --file given, running the {} starter code", language);
    }

    let session = Mutex::new(session);
    if json {
        let sink = CollectingSink::new();
        let report = controller.submit(&session, &Presenter::new(&sink, &sink)).await;
        let session = session.into_inner();
        let body = serde_json::json!({
            "report": report,
            "snapshot": session.snapshot(),
            "notifications": sink.notifications(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(session.verdict() == Verdict::Pass);
    }

    let sink = ConsoleSink;
    let presenter = Presenter::new(&sink, &sink);

    println!("Running {} in {}...", problem_id, language);
    let report = controller.submit(&session, &presenter).await;

    let session = session.into_inner();
    if let Some(outcome) = session.last_outcome() {
        println!();
        println!("Output:");
        println!("{}", outcome.output.trim_end());
        if let Some(error) = &outcome.error {
            println!();
            println!("Error:");
            println!("{}", error.trim_end());
        }
    }

    match report {
        RunReport::Evaluated { verdict, elapsed_ms, .. } => {
            println!();
            println!("Verdict: {} ({}ms)", verdict, elapsed_ms);
            Ok(verdict == Verdict::Pass)
        }
        other => bail!("Run did not complete: {:?}", other),
    }
}

/// Judge one output file against another. Returns whether they match.
pub fn check_output(actual: &Path, expected: &Path) -> Result<bool> {
    let actual_text = fs::read_to_string(actual)
        .with_context(|| format!("Failed to read {}", actual.display()))?;
    let expected_text = fs::read_to_string(expected)
        .with_context(|| format!("Failed to read {}", expected.display()))?;

    let verdict = evaluate(&actual_text, &expected_text);
    println!("Verdict: {}", verdict);

    if verdict != Verdict::Pass {
        println!();
        println!("Expected (normalized):");
        println!("{}", normalize_output(&expected_text));
        println!();
        println!("Actual (normalized):");
        println!("{}", normalize_output(&actual_text));
    }

    Ok(verdict == Verdict::Pass)
}
