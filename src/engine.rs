use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use tower_sessions_core::session_store;

/// Storage capability set for session payloads.
///
/// Payloads are opaque strings keyed by the session id the host pipeline hands out. An empty
/// string returned from [`read`](SessionEngine::read) means "no data", whether the record is
/// missing or was stored empty.
///
/// Implementations own their persistence and locking. Errors are reported as
/// [`session_store::Error`] and are passed through by decorators unchanged.
#[async_trait]
pub trait SessionEngine: Debug + Send + Sync + 'static {
    async fn open(&self, save_path: &str, name: &str) -> session_store::Result<bool>;

    async fn close(&self) -> session_store::Result<bool>;

    async fn read(&self, session_id: &str) -> session_store::Result<String>;

    async fn write(&self, session_id: &str, data: &str) -> session_store::Result<bool>;

    async fn destroy(&self, session_id: &str) -> session_store::Result<bool>;

    /// Purges records older than `max_lifetime` seconds, returning how many were removed.
    async fn gc(&self, max_lifetime: i64) -> session_store::Result<u64>;
}

/// The session engine installed for the current request.
///
/// [`EncryptedSessionManagerLayer`](crate::EncryptedSessionManagerLayer) inserts one into the
/// request extensions; handlers read and write session payloads through it.
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<dyn SessionEngine>);

impl SessionHandle {
    pub fn new<E: SessionEngine>(engine: E) -> Self {
        Self(Arc::new(engine))
    }
}

impl From<Arc<dyn SessionEngine>> for SessionHandle {
    fn from(engine: Arc<dyn SessionEngine>) -> Self {
        Self(engine)
    }
}

#[async_trait]
impl SessionEngine for SessionHandle {
    async fn open(&self, save_path: &str, name: &str) -> session_store::Result<bool> {
        self.0.open(save_path, name).await
    }

    async fn close(&self) -> session_store::Result<bool> {
        self.0.close().await
    }

    async fn read(&self, session_id: &str) -> session_store::Result<String> {
        self.0.read(session_id).await
    }

    async fn write(&self, session_id: &str, data: &str) -> session_store::Result<bool> {
        self.0.write(session_id, data).await
    }

    async fn destroy(&self, session_id: &str) -> session_store::Result<bool> {
        self.0.destroy(session_id).await
    }

    async fn gc(&self, max_lifetime: i64) -> session_store::Result<u64> {
        self.0.gc(max_lifetime).await
    }
}

#[cfg(feature = "axum-core")]
impl<S> axum_core::extract::FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = (http::StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<SessionHandle>().cloned().ok_or((
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "Can't extract session handle. Is `EncryptedSessionManagerLayer` enabled?",
        ))
    }
}
