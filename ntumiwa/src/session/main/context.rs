use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, MutexGuard};

use crate::session::types::Session;

/// The session attached to one in-flight request.
///
/// Clones share the same session and the same cookie-written flag, so the layer that
/// created the context and the handler see each other's changes.
#[derive(Debug, Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    session: Mutex<Session>,
    cookie_written: AtomicBool,
    /// Id the session was loaded under; `None` for a freshly minted session
    loaded_id: Option<String>,
}

impl SessionContext {
    pub(crate) fn new(session: Session, minted: bool) -> Self {
        let loaded_id = (!minted).then(|| session.id.clone());
        Self {
            inner: Arc::new(ContextInner {
                session: Mutex::new(session),
                cookie_written: AtomicBool::new(false),
                loaded_id,
            }),
        }
    }

    /// Locks the session for reading or mutation.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.session.lock().await
    }

    /// True when no valid session cookie came with the request and a new session was created.
    pub fn is_minted(&self) -> bool {
        self.inner.loaded_id.is_none()
    }

    pub(crate) fn loaded_id(&self) -> Option<&str> {
        self.inner.loaded_id.as_deref()
    }

    pub fn cookie_written(&self) -> bool {
        self.inner.cookie_written.load(Ordering::Acquire)
    }

    /// Claims the single cookie write for this request. Only the first caller gets `true`.
    pub(crate) fn claim_cookie_write(&self) -> bool {
        !self.inner.cookie_written.swap(true, Ordering::AcqRel)
    }
}
