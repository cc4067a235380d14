mod handlers;
mod metrics;
mod routes;
mod state;

use anyhow::{Context, Result};
use arena_common::catalog::{ProblemCatalog, StaticCatalog};
use arena_common::config::ArenaConfig;
use arena_common::languages::LanguageConfigManager;
use arena_judge::{client, RunController, Session};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::state::AppState;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // ARENA_LOG_FORMAT=json for log shippers, human-readable otherwise
    let json = std::env::var("ARENA_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Arena API booting...");

    let config = ArenaConfig::from_env().context("Invalid configuration")?;

    let catalog: Arc<dyn ProblemCatalog> = match &config.catalog_path {
        Some(path) => Arc::new(StaticCatalog::load(path)?),
        None => Arc::new(StaticCatalog::builtin()?),
    };
    info!(problems = catalog.all_problems().len(), "Problem catalog loaded");

    // New sessions start here, so refuse to boot if it does not resolve
    Session::new(catalog.as_ref(), &config.default_problem, config.default_language)
        .context("Default problem/language is not in the catalog")?;

    let languages = LanguageConfigManager::load(&config.languages_path)?;
    info!(languages = ?languages.list_languages(), "Language configuration loaded");
    for problem in catalog.all_problems() {
        for language in problem.languages() {
            if !languages.is_configured(language) {
                warn!(
                    problem_id = %problem.id,
                    language = %language,
                    "No execution settings for language"
                );
            }
        }
    }

    let client = client::from_config(&config, languages)?;
    let controller = RunController::new(catalog, client);

    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(controller, config));
    state::spawn_idle_sweeper(state.clone());

    let app = Router::new()
        .merge(routes::routes())
        .with_state(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
