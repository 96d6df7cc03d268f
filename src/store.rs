use std::sync::Arc;

use async_trait::async_trait;
use tower_sessions_core::session_store;

use crate::{
    cipher::{Aes256GcmCipher, SessionCipher},
    engine::SessionEngine,
    error::{Error, Result},
    key::SessionKey,
};

/// Decorates a [`SessionEngine`] so payloads are encrypted on write and decrypted on read.
///
/// Every other operation is forwarded to the wrapped engine with its arguments untouched, and
/// the engine's results and errors come back unchanged. A stored payload that does not decrypt
/// under this store's key and salt reads as empty, the same as a missing session.
#[derive(Debug)]
pub struct EncryptedSessionStore<E: ?Sized, X = Aes256GcmCipher> {
    key: SessionKey,
    salt: Option<String>,
    inner: Arc<E>,
    cipher: X,
}

impl<E: SessionEngine + ?Sized> EncryptedSessionStore<E> {
    /// Wraps `inner` using the default AES-256-GCM cipher.
    ///
    /// Fails with [`Error::InvalidConfiguration`] if `key` is empty.
    pub fn new<K: Into<String>>(key: K, salt: Option<String>, inner: Arc<E>) -> Result<Self> {
        Self::with_cipher(key, salt, inner, Aes256GcmCipher::default())
    }

    pub fn builder() -> EncryptedSessionStoreBuilder<E> {
        EncryptedSessionStoreBuilder::new()
    }
}

impl<E: SessionEngine + ?Sized, X: SessionCipher> EncryptedSessionStore<E, X> {
    pub fn with_cipher<K: Into<String>>(
        key: K,
        salt: Option<String>,
        inner: Arc<E>,
        cipher: X,
    ) -> Result<Self> {
        Ok(Self::from_key(SessionKey::new(key)?, salt, inner, cipher))
    }

    /// Wraps `inner` under a key that has already been validated, such as one returned by
    /// [`resolve_key`](crate::resolve_key). Cannot fail.
    pub fn from_key(key: SessionKey, salt: Option<String>, inner: Arc<E>, cipher: X) -> Self {
        Self {
            key,
            salt,
            inner,
            cipher,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn salt(&self) -> Option<&str> {
        self.salt.as_deref()
    }

    pub fn inner(&self) -> &Arc<E> {
        &self.inner
    }
}

#[async_trait]
impl<E, X> SessionEngine for EncryptedSessionStore<E, X>
where
    E: SessionEngine + ?Sized,
    X: SessionCipher,
{
    async fn open(&self, save_path: &str, name: &str) -> session_store::Result<bool> {
        self.inner.open(save_path, name).await
    }

    async fn close(&self) -> session_store::Result<bool> {
        self.inner.close().await
    }

    async fn read(&self, session_id: &str) -> session_store::Result<String> {
        let data = self.inner.read(session_id).await?;
        if data.is_empty() {
            return Ok(data);
        }

        match self.cipher.decrypt(&data, &self.key, self.salt()) {
            Ok(plaintext) => Ok(plaintext),
            Err(err) => {
                tracing::debug!(err = %err, "stored session payload did not decrypt");
                Ok(String::new())
            }
        }
    }

    async fn write(&self, session_id: &str, data: &str) -> session_store::Result<bool> {
        if data.is_empty() {
            return self.inner.write(session_id, data).await;
        }

        let sealed = self
            .cipher
            .encrypt(data, &self.key, self.salt())
            .map_err(|err| session_store::Error::Encode(err.to_string()))?;

        self.inner.write(session_id, &sealed).await
    }

    async fn destroy(&self, session_id: &str) -> session_store::Result<bool> {
        self.inner.destroy(session_id).await
    }

    async fn gc(&self, max_lifetime: i64) -> session_store::Result<u64> {
        self.inner.gc(max_lifetime).await
    }
}

/// Step-by-step construction of an [`EncryptedSessionStore`].
///
/// [`build`](Self::build) refuses to produce a store without a non-empty key and an engine.
#[derive(Debug)]
pub struct EncryptedSessionStoreBuilder<E: ?Sized, X = Aes256GcmCipher> {
    key: Option<String>,
    salt: Option<String>,
    engine: Option<Arc<E>>,
    cipher: X,
}

impl<E: SessionEngine + ?Sized> EncryptedSessionStoreBuilder<E> {
    pub fn new() -> Self {
        Self {
            key: None,
            salt: None,
            engine: None,
            cipher: Aes256GcmCipher::default(),
        }
    }
}

impl<E: SessionEngine + ?Sized> Default for EncryptedSessionStoreBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: SessionEngine + ?Sized, X: SessionCipher> EncryptedSessionStoreBuilder<E, X> {
    #[must_use]
    pub fn key<K: Into<String>>(mut self, key: K) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn salt<S: Into<String>>(mut self, salt: S) -> Self {
        self.salt = Some(salt.into());
        self
    }

    #[must_use]
    pub fn engine(mut self, engine: Arc<E>) -> Self {
        self.engine = Some(engine);
        self
    }

    #[must_use]
    pub fn cipher<X2: SessionCipher>(self, cipher: X2) -> EncryptedSessionStoreBuilder<E, X2> {
        EncryptedSessionStoreBuilder {
            key: self.key,
            salt: self.salt,
            engine: self.engine,
            cipher,
        }
    }

    pub fn build(self) -> Result<EncryptedSessionStore<E, X>> {
        let key = self
            .key
            .ok_or_else(|| Error::InvalidConfiguration("session key is required".into()))?;
        let engine = self
            .engine
            .ok_or_else(|| Error::InvalidConfiguration("session engine is required".into()))?;

        EncryptedSessionStore::with_cipher(key, self.salt, engine, self.cipher)
    }
}
