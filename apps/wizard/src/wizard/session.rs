use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::gateway::ResumePersistenceGateway;
use crate::notify::NotificationBuffer;
use crate::wizard::controller::{SubmitOutcome, WizardController};
use crate::wizard::WizardError;

/// One wizard lifetime: the controller plus the notifications it has not
/// reported yet.
#[derive(Debug)]
pub struct WizardSession {
    pub controller: WizardController,
    pub notifications: NotificationBuffer,
}

impl WizardSession {
    pub fn new(controller: WizardController) -> Self {
        Self {
            controller,
            notifications: NotificationBuffer::new(),
        }
    }

    pub async fn load(
        &mut self,
        gateway: &dyn ResumePersistenceGateway,
    ) -> Result<(), WizardError> {
        self.controller.load(gateway, &self.notifications).await
    }

    pub async fn submit(
        &mut self,
        gateway: &dyn ResumePersistenceGateway,
    ) -> Result<SubmitOutcome, WizardError> {
        self.controller.submit(gateway, &self.notifications).await
    }
}

pub type SharedSession = Arc<Mutex<WizardSession>>;

/// Live wizard sessions, plus the set of résumés with a network call in
/// progress.
///
/// A session is held behind its own async mutex for the length of a request,
/// so a second request on a busy session can be refused with `try_lock`.
/// Sessions nobody has touched for a while are dropped by [`evict_idle`].
///
/// [`evict_idle`]: SessionStore::evict_idle
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Slot>>,
    in_flight: Arc<StdMutex<HashSet<String>>>,
}

#[derive(Debug)]
struct Slot {
    session: SharedSession,
    last_touched: Instant,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: WizardSession) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let shared = Arc::new(Mutex::new(session));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Slot {
                    session: shared.clone(),
                    last_touched: Instant::now(),
                },
            );
        debug!("Opened wizard session {id}");
        (id, shared)
    }

    /// Looks a session up and marks it as recently used.
    pub fn get(&self, id: &Uuid) -> Option<SharedSession> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let slot = sessions.get_mut(id)?;
        slot.last_touched = Instant::now();
        Some(slot.session.clone())
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            debug!("Closed wizard session {id}");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every session untouched for at least `max_idle`. Sessions busy
    /// with a request are kept. Returns how many were dropped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|id, slot| {
            let idle = slot.last_touched.elapsed() >= max_idle;
            let expired = idle && slot.session.try_lock().is_ok();
            if expired {
                debug!("Expired idle wizard session {id}");
            }
            !expired
        });
        before - sessions.len()
    }

    /// Claims `key` for one network call. Fails with `InFlight` while another
    /// claim on the same key is alive; the claim ends when the guard drops.
    pub fn begin(&self, key: impl Into<String>) -> Result<InFlightGuard, WizardError> {
        let key = key.into();
        let mut claimed = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !claimed.insert(key.clone()) {
            debug!("Rejected concurrent call for {key}");
            return Err(WizardError::InFlight);
        }
        Ok(InFlightGuard {
            key,
            claimed: self.in_flight.clone(),
        })
    }
}

/// Runs [`SessionStore::evict_idle`] every `every` until the task is aborted.
pub fn spawn_idle_sweeper(
    store: Arc<SessionStore>,
    max_idle: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let expired = store.evict_idle(max_idle);
            if expired > 0 {
                info!("Expired {expired} idle wizard session(s), {} left", store.len());
            }
        }
    })
}

/// In-flight key for an existing résumé.
pub fn resume_key(resume_id: &str) -> String {
    format!("resume:{resume_id}")
}

/// In-flight key for a session whose résumé has no id yet.
pub fn session_key(session_id: &Uuid) -> String {
    format!("session:{session_id}")
}

#[derive(Debug)]
pub struct InFlightGuard {
    key: String,
    claimed: Arc<StdMutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
