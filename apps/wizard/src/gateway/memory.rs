use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use crate::gateway::{GatewayError, ResumePersistenceGateway};
use crate::models::resume::ResumeDocument;

/// Process-local résumé store. Used when no remote API is configured and as
/// the test double for everything that talks to a gateway.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    resumes: Mutex<BTreeMap<String, ResumeDocument>>,
    next_id: AtomicU64,
    offline: AtomicBool,
    calls: AtomicU64,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `doc` under a fresh id without going through `create`.
    pub fn seed(&self, doc: ResumeDocument) -> String {
        let id = self.allocate_id();
        let mut stored = doc;
        stored.id = Some(id.clone());
        self.lock().insert(id.clone(), stored);
        id
    }

    /// While offline every call fails as a transport fault.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of gateway calls made so far, failed ones included.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, id: &str) -> Option<ResumeDocument> {
        self.lock().get(id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ResumeDocument>> {
        self.resumes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(&self) -> String {
        format!("r{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn enter(&self) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable(
                "in-memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn not_found(id: &str) -> GatewayError {
        GatewayError::NotFound(format!("Resume {id} not found"))
    }
}

#[async_trait]
impl ResumePersistenceGateway for InMemoryGateway {
    async fn fetch_by_id(&self, id: &str) -> Result<ResumeDocument, GatewayError> {
        self.enter()?;
        self.stored(id).ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, doc: &ResumeDocument) -> Result<String, GatewayError> {
        self.enter()?;
        if doc.personal_details.name.trim().is_empty() {
            return Err(GatewayError::Validation("Name is required".to_string()));
        }
        Ok(self.seed(doc.clone()))
    }

    async fn update(&self, id: &str, doc: &ResumeDocument) -> Result<(), GatewayError> {
        self.enter()?;
        let mut resumes = self.lock();
        let slot = resumes.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        *slot = ResumeDocument {
            id: Some(id.to_string()),
            ..doc.clone()
        };
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ResumeDocument>, GatewayError> {
        self.enter()?;
        Ok(self.lock().values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        self.enter()?;
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }

    async fn download_pdf(&self, id: &str) -> Result<Bytes, GatewayError> {
        self.enter()?;
        let doc = self.stored(id).ok_or_else(|| Self::not_found(id))?;
        // Placeholder document; real rendering lives behind the remote API.
        Ok(Bytes::from(format!(
            "%PDF-1.4\n% resume {} for {}\n%%EOF\n",
            id, doc.personal_details.name
        )))
    }
}
