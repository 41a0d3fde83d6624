use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue};
use dashmap::DashMap;
use factory_core::{CapabilityRegistry, Collaborators, Session};

pub const SESSION_COOKIE: &str = "factory_session";

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);
const DEFAULT_MAX_SESSIONS: usize = 1024;

/// A live session and the last time a request named it.
pub struct SessionSlot {
    pub session: Arc<Session>,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct AppState {
    /// Filled once by the module resolver before the server starts.
    pub registry: Arc<CapabilityRegistry>,
    pub collaborators: Arc<dyn Collaborators>,
    pub sessions: Arc<DashMap<String, SessionSlot>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

/// Session for one request plus the cookie to send back when it was just created.
pub struct SessionHandle {
    pub session: Arc<Session>,
    pub set_cookie: Option<HeaderValue>,
}

impl AppState {
    pub fn new(registry: CapabilityRegistry, collaborators: Arc<dyn Collaborators>) -> Self {
        Self {
            registry: Arc::new(registry),
            collaborators,
            sessions: Arc::new(DashMap::new()),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_session_limits(mut self, idle_timeout: Duration, max_sessions: usize) -> Self {
        self.idle_timeout = idle_timeout;
        self.max_sessions = max_sessions.max(1);
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// The session named by the cookie, if it is still live. Never creates one.
    pub fn existing_session(&self, headers: &HeaderMap) -> Option<Arc<Session>> {
        let id = session_id(headers)?;
        let mut slot = self.sessions.get_mut(&id)?;
        slot.last_seen = Instant::now();
        Some(Arc::clone(&slot.session))
    }

    /// Look up the session named by the cookie, or start a new one.
    pub fn session(&self, headers: &HeaderMap) -> SessionHandle {
        if let Some(session) = self.existing_session(headers) {
            return SessionHandle {
                session,
                set_cookie: None,
            };
        }
        self.make_room();
        let id = uuid::Uuid::new_v4().simple().to_string();
        let session = Arc::new(Session::new(self.collaborators.default_api_key()));
        self.sessions.insert(
            id.clone(),
            SessionSlot {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!("New dashboard session {} ({} active)", id, self.sessions.len());
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        SessionHandle {
            session,
            set_cookie: HeaderValue::from_str(&cookie).ok(),
        }
    }

    /// Drops sessions not seen since `now - idle_timeout`. Returns how many went.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, slot| now.saturating_duration_since(slot.last_seen) < self.idle_timeout);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!("Evicted {} idle sessions ({} active)", evicted, self.sessions.len());
        }
        evicted
    }

    /// Keeps the table below `max_sessions` before an insert.
    fn make_room(&self) {
        if self.sessions.len() < self.max_sessions {
            return;
        }
        self.evict_idle(Instant::now());
        while self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.value().last_seen)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(id) => {
                    self.sessions.remove(&id);
                }
                None => break,
            }
        }
    }
}

impl SessionHandle {
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &self.set_cookie {
            headers.insert(header::SET_COOKIE, cookie.clone());
        }
        headers
    }
}

/// Periodically evicts idle sessions for the life of the process.
pub fn spawn_session_sweeper(state: AppState) -> tokio::task::JoinHandle<()> {
    let period = (state.idle_timeout() / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            state.evict_idle(Instant::now());
        }
    })
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use factory_core::{
        Bound, EnvInfo, HubBindings, MemoryStore, OfflineWorkflowClient, Orchestrator,
        UnavailableMemory, UnavailableOrchestrator, WorkflowClient, WorkflowSettings,
    };

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; factory_session=abc123; lang=en"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc123"));
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    struct NoCollaborators;

    impl Collaborators for NoCollaborators {
        fn orchestrator(&self, _api_key: Option<&str>) -> Bound<dyn Orchestrator> {
            Bound::fallback(
                Arc::new(UnavailableOrchestrator::new("none")) as Arc<dyn Orchestrator>,
                "none",
            )
        }
        fn memory(&self) -> Bound<dyn MemoryStore> {
            Bound::fallback(Arc::new(UnavailableMemory) as Arc<dyn MemoryStore>, "none")
        }
        fn workflow_client(&self) -> Bound<dyn WorkflowClient> {
            Bound::fallback(
                Arc::new(OfflineWorkflowClient::new(&WorkflowSettings::default()))
                    as Arc<dyn WorkflowClient>,
                "none",
            )
        }
    }

    fn state(idle: Duration, max: usize) -> AppState {
        let registry = CapabilityRegistry::new(HubBindings::fallback(
            "ai_factory_tabs",
            EnvInfo::from_file(std::path::Path::new("/srv/factory/bin/app"), &[]),
        ));
        AppState::new(registry, Arc::new(NoCollaborators)).with_session_limits(idle, max)
    }

    fn cookie_for(handle: &SessionHandle) -> HeaderMap {
        let value = handle.set_cookie.as_ref().unwrap().to_str().unwrap();
        let pair = value.split(';').next().unwrap().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&pair).unwrap());
        headers
    }

    #[test]
    fn existing_session_never_creates_one() {
        let state = state(Duration::from_secs(60), 8);
        assert!(state.existing_session(&HeaderMap::new()).is_none());
        let mut bogus = HeaderMap::new();
        bogus.insert(header::COOKIE, HeaderValue::from_static("factory_session=unknown"));
        assert!(state.existing_session(&bogus).is_none());
        assert_eq!(state.sessions.len(), 0);
    }

    #[test]
    fn table_is_capped_and_drops_least_recently_seen() {
        let state = state(Duration::from_secs(3600), 3);
        let pause = || std::thread::sleep(Duration::from_millis(5));
        let first = state.session(&HeaderMap::new());
        let first_cookie = cookie_for(&first);
        pause();
        let second = state.session(&HeaderMap::new());
        pause();
        state.session(&HeaderMap::new());
        pause();
        // Touch the first so the second becomes the oldest.
        assert!(state.existing_session(&first_cookie).is_some());

        state.session(&HeaderMap::new());
        assert_eq!(state.sessions.len(), 3);
        assert!(state.existing_session(&first_cookie).is_some());
        assert!(state.existing_session(&cookie_for(&second)).is_none());
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let state = state(Duration::from_secs(60), 8);
        let kept = state.session(&HeaderMap::new());
        state.session(&HeaderMap::new());
        assert_eq!(state.evict_idle(Instant::now()), 0);
        assert_eq!(state.evict_idle(Instant::now() + Duration::from_secs(61)), 2);
        assert!(state.existing_session(&cookie_for(&kept)).is_none());
    }
}
