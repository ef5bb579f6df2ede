use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::session::{Session, SessionDeps};

/// Owns the context-id to session mapping. Sessions are created lazily
/// on first use and live until explicitly removed; recording sub-state
/// cycles within them. Sessions for different contexts share nothing
/// mutable.
pub struct SessionManager {
    deps: Arc<SessionDeps>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(deps: Arc<SessionDeps>) -> Self {
        Self {
            deps,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_or_create(&self, context_id: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.read().await.get(context_id) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().await;
        // A racing creator may have beaten us to the write lock.
        if let Some(session) = sessions.get(context_id) {
            return Arc::clone(session);
        }

        info!(context = context_id, "creating session");
        let session = Session::new(context_id.to_string(), Arc::clone(&self.deps));
        sessions.insert(context_id.to_string(), Arc::clone(&session));
        session
    }

    pub async fn get(&self, context_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(context_id).cloned()
    }

    pub async fn remove(&self, context_id: &str) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(context_id)
    }
}
