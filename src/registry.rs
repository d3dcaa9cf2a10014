//! Session registry for the HTTP server.
//!
//! Each session is an independent [`PipelineSession`] behind its own async
//! mutex, so operations on one session run one at a time while different
//! sessions proceed in parallel. The map itself is only locked briefly to
//! look up, insert or remove a handle; no lock on the map is held across an
//! `.await`.
//!
//! Sessions idle for longer than `sessions.idle_timeout_secs` are dropped by
//! a background sweep, together with their index and history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use text2sql_core::pipeline::PipelineSettings;
use text2sql_core::session::PipelineSession;
use text2sql_core::{Error, Result};

/// Shared handle to one session.
pub type SessionHandle = Arc<tokio::sync::Mutex<PipelineSession>>;

struct Slot {
    session: SessionHandle,
    last_active: Mutex<Instant>,
}

impl Slot {
    fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last = *self.last_active.lock().unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(last)
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Slot>>,
    settings: Arc<PipelineSettings>,
    history_limit: usize,
    idle_timeout: Option<Duration>,
}

impl SessionRegistry {
    /// `idle_timeout` of `None` keeps sessions until they are removed.
    pub fn new(
        settings: Arc<PipelineSettings>,
        history_limit: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            settings,
            history_limit,
            idle_timeout,
        }
    }

    /// Create a session with a fresh random id.
    pub fn create(&self) -> (String, SessionHandle) {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(tokio::sync::Mutex::new(PipelineSession::new(
            id.clone(),
            self.settings.clone(),
            self.history_limit,
        )));
        let slot = Slot {
            session: session.clone(),
            last_active: Mutex::new(Instant::now()),
        };
        self.write().insert(id.clone(), slot);
        debug!(session = %id, "Session created");
        (id, session)
    }

    /// Look up a session and mark it active.
    pub fn get(&self, id: &str) -> Result<SessionHandle> {
        let sessions = self.read();
        let slot = sessions
            .get(id)
            .ok_or_else(|| Error::InvalidSession(id.to_string()))?;
        slot.touch();
        Ok(slot.session.clone())
    }

    /// Reuse a known session, otherwise create a new one.
    pub fn get_or_create(&self, id: Option<&str>) -> (String, SessionHandle) {
        if let Some(id) = id {
            if let Ok(handle) = self.get(id) {
                return (id.to_string(), handle);
            }
        }
        self.create()
    }

    /// Drop a session. Returns `false` if the id was unknown.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.write().remove(id).is_some();
        if removed {
            debug!(session = %id, "Session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle past the timeout. Sessions with an operation in
    /// flight are skipped. Returns the number removed.
    pub fn sweep_idle(&self) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };
        let now = Instant::now();
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, slot| {
            slot.idle_for(now) < timeout || slot.session.try_lock().is_err()
        });
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "Expired idle sessions");
        }
        removed
    }

    /// Run [`sweep_idle`](Self::sweep_idle) every `interval` until the
    /// returned task is aborted.
    pub fn spawn_reaper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep_idle();
            }
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Slot>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
