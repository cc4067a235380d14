// Shared server state: the run controller and every open session
use arena_common::catalog::ProblemCatalog;
use arena_common::config::ArenaConfig;
use arena_common::types::Language;
use arena_judge::{RunController, Session, SessionError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::metrics::ACTIVE_SESSIONS;

/// Upper bound on how often idle sessions are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One open session, the cancel token of its in-flight run and when a
/// client last touched it
pub struct SessionEntry {
    pub session: Mutex<Session>,
    armed: std::sync::Mutex<Option<(Uuid, CancellationToken)>>,
    last_seen: std::sync::Mutex<Instant>,
}

impl SessionEntry {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            armed: std::sync::Mutex::new(None),
            last_seen: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Fresh token for `run_id`. Each run gets its own, so an abort aimed
    /// at an earlier run never reaches a later one.
    pub fn arm(&self, run_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        *lock(&self.armed) = Some((run_id, token.clone()));
        token
    }

    /// Drop the token once its run is over
    pub fn disarm(&self, run_id: Uuid) {
        let mut armed = lock(&self.armed);
        if armed.as_ref().is_some_and(|(id, _)| *id == run_id) {
            *armed = None;
        }
    }

    /// Fire the token of `run_id`, or of whatever run is armed when `None`
    pub fn abort(&self, run_id: Option<Uuid>) {
        let mut armed = lock(&self.armed);
        let matches = armed
            .as_ref()
            .is_some_and(|(id, _)| run_id.map_or(true, |run_id| *id == run_id));
        if matches {
            if let Some((id, token)) = armed.take() {
                debug!(run_id = %id, "Aborting run");
                token.cancel();
            }
        }
    }

    pub fn touch(&self) {
        *lock(&self.last_seen) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        lock(&self.last_seen).elapsed()
    }

    /// True while a run is in flight or a handler holds the session
    fn is_busy(&self) -> bool {
        match self.session.try_lock() {
            Ok(session) => session.is_running(),
            Err(_) => true,
        }
    }
}

pub struct AppState {
    pub controller: RunController,
    pub config: ArenaConfig,
    sessions: RwLock<HashMap<Uuid, Arc<SessionEntry>>>,
}

impl AppState {
    pub fn new(controller: RunController, config: ArenaConfig) -> Self {
        Self {
            controller,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &dyn ProblemCatalog {
        self.controller.catalog()
    }

    /// Open a session, defaulting to the configured problem and language
    pub async fn create_session(
        &self,
        problem_id: Option<&str>,
        language: Option<Language>,
    ) -> Result<(Uuid, Arc<SessionEntry>), SessionError> {
        let problem_id = problem_id.unwrap_or(&self.config.default_problem);
        let language = language.unwrap_or(self.config.default_language);
        let session = Session::new(self.catalog(), problem_id, language)?;

        let id = Uuid::new_v4();
        let entry = Arc::new(SessionEntry::new(session));
        self.sessions.write().await.insert(id, entry.clone());
        ACTIVE_SESSIONS.inc();

        info!(session_id = %id, problem_id, language = %language, "Session opened");
        Ok((id, entry))
    }

    /// Look up a session and mark it as used
    pub async fn get_session(&self, id: &Uuid) -> Option<Arc<SessionEntry>> {
        let entry = self.sessions.read().await.get(id).cloned()?;
        entry.touch();
        Some(entry)
    }

    /// Close a session, abandoning any run it has in flight
    pub async fn remove_session(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(entry) => {
                entry.abort(None);
                ACTIVE_SESSIONS.dec();
                info!(session_id = %id, "Session closed");
                true
            }
            None => false,
        }
    }

    /// Drop sessions untouched for at least `max_idle`. Busy sessions are
    /// kept. Returns how many were evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, entry| {
            let keep = entry.is_busy() || entry.idle_for() < max_idle;
            if !keep {
                debug!(session_id = %id, "Evicting idle session");
            }
            keep
        });

        let evicted = before - sessions.len();
        ACTIVE_SESSIONS.sub(evicted as i64);
        evicted
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Periodically evict sessions idle longer than `ARENA_SESSION_IDLE_SECS`
pub fn spawn_idle_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let max_idle = Duration::from_secs(state.config.session_idle_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL.min(max_idle));
        loop {
            ticker.tick().await;
            let evicted = state.evict_idle(max_idle).await;
            if evicted > 0 {
                info!(evicted, "Evicted idle sessions");
            }
        }
    })
}
