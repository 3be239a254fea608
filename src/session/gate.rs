//! Session gate in front of every ingress request.

use std::sync::Arc;

use crate::session::SessionStore;

/// Accepts or rejects a request based on its session credential.
#[derive(Clone)]
pub struct SessionGate {
    store: Arc<dyn SessionStore>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// True iff the store reports `credential` as currently valid.
    pub fn authorize(&self, credential: Option<&str>) -> bool {
        match credential {
            Some(session) if !session.is_empty() => self.store.validate_session(session),
            _ => false,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}
