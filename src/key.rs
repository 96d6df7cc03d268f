use std::fmt;

use rand::{RngCore as _, rngs::OsRng};
use sha2::{Digest as _, Sha256};

use crate::error::{Error, Result};

const POOL_BYTES: usize = 2048;

/// Per-user symmetric key, carried by the client in a cookie.
///
/// A `SessionKey` is never empty. Generated keys are the hex encoding of a SHA-256 digest, so
/// they are always 64 characters long.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl SessionKey {
    /// Wraps an existing key value.
    ///
    /// Fails with [`Error::InvalidConfiguration`] when `value` is empty.
    pub fn new<K: Into<String>>(value: K) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::InvalidConfiguration(
                "session key must not be empty".into(),
            ));
        }
        Ok(Self(value))
    }

    /// Generates a fresh key.
    ///
    /// Two pools are drawn, one from the operating system and one from the thread-local
    /// generator, and their concatenation is hashed. If the operating system source is not
    /// available the error is returned rather than falling back to the weaker pool alone.
    pub fn generate() -> Result<Self> {
        let mut pool = vec![0u8; POOL_BYTES * 2];
        let (secure, supplementary) = pool.split_at_mut(POOL_BYTES);
        OsRng.try_fill_bytes(secure)?;
        rand::thread_rng().fill_bytes(supplementary);

        let digest = Sha256::digest(&pool);
        Ok(Self(hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

impl TryFrom<String> for SessionKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SessionKey {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

/// Returns the key for the current request.
///
/// A present, non-empty cookie value is trusted as-is; anything else yields a newly generated key.
pub fn resolve_key(existing: Option<&str>) -> Result<SessionKey> {
    match existing.filter(|value| !value.is_empty()) {
        Some(value) => Ok(SessionKey(value.to_owned())),
        None => {
            let key = SessionKey::generate()?;
            tracing::debug!("generated new session key");
            Ok(key)
        }
    }
}
