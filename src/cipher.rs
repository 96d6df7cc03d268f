//! Symmetric cipher used to seal session payloads.
//!
//! The store only hands a [`SessionCipher`] the session key and the optional server salt; turning
//! those into actual key material is the cipher's job.

use std::{
    fmt::Debug,
    sync::{Arc, LazyLock},
};

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

use crate::key::SessionKey;

const VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HKDF_INFO: &[u8] = b"tower-sessions-encrypted-store aes-256-gcm v1";

static DEPLOYMENT_SECRET: LazyLock<Arc<str>> = LazyLock::new(|| {
    std::env::var("SESSION_ENCRYPTION_SECRET")
        .ok()
        .filter(|secret| !secret.is_empty())
        .unwrap_or_else(|| "default_session_secret_change_in_production".to_string())
        .into()
});

/// The process-wide secret used when no salt is configured.
///
/// Read once from `SESSION_ENCRYPTION_SECRET`.
pub fn deployment_secret() -> Arc<str> {
    DEPLOYMENT_SECRET.clone()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Ciphertext is not valid base64: {0}")]
    Encoding(String),

    #[error("Ciphertext is truncated ({0} bytes)")]
    Truncated(usize),

    #[error("Unsupported ciphertext version: {0}")]
    UnsupportedVersion(u8),

    #[error("Ciphertext failed authentication")]
    Authentication,

    #[error("Plaintext is not valid utf-8")]
    Utf8,
}

pub trait SessionCipher: Debug + Clone + Send + Sync + 'static {
    fn encrypt(
        &self,
        plaintext: &str,
        key: &SessionKey,
        salt: Option<&str>,
    ) -> Result<String, CipherError>;

    fn decrypt(
        &self,
        ciphertext: &str,
        key: &SessionKey,
        salt: Option<&str>,
    ) -> Result<String, CipherError>;
}

/// AES-256-GCM with a key derived by HKDF-SHA256 from the session key and salt.
///
/// Output is URL-safe base64 (no padding) of `version || nonce || ciphertext || tag`. Every call
/// to [`encrypt`](SessionCipher::encrypt) uses a fresh random nonce.
#[derive(Clone)]
pub struct Aes256GcmCipher {
    default_salt: Arc<str>,
}

impl Aes256GcmCipher {
    /// Creates a cipher that falls back to `default_salt` when no salt is supplied.
    pub fn new<S: Into<Arc<str>>>(default_salt: S) -> Self {
        Self {
            default_salt: default_salt.into(),
        }
    }

    fn cipher(&self, key: &SessionKey, salt: Option<&str>) -> Result<Aes256Gcm, CipherError> {
        let salt = salt.unwrap_or(&*self.default_salt);
        let hk = Hkdf::<Sha256>::new(Some(salt.as_bytes()), key.as_str().as_bytes());
        let mut okm = [0u8; 32];
        hk.expand(HKDF_INFO, &mut okm)
            .map_err(|err| CipherError::KeyDerivation(err.to_string()))?;

        Aes256Gcm::new_from_slice(&okm).map_err(|err| CipherError::KeyDerivation(err.to_string()))
    }
}

impl Default for Aes256GcmCipher {
    fn default() -> Self {
        Self::new(deployment_secret())
    }
}

impl Debug for Aes256GcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256GcmCipher").finish_non_exhaustive()
    }
}

impl SessionCipher for Aes256GcmCipher {
    fn encrypt(
        &self,
        plaintext: &str,
        key: &SessionKey,
        salt: Option<&str>,
    ) -> Result<String, CipherError> {
        let cipher = self.cipher(key, salt)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut bytes = Vec::with_capacity(1 + NONCE_LEN + sealed.len());
        bytes.push(VERSION);
        bytes.extend_from_slice(&nonce);
        bytes.extend_from_slice(&sealed);

        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decrypt(
        &self,
        ciphertext: &str,
        key: &SessionKey,
        salt: Option<&str>,
    ) -> Result<String, CipherError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(ciphertext.as_bytes())
            .map_err(|err| CipherError::Encoding(err.to_string()))?;

        if bytes.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(CipherError::Truncated(bytes.len()));
        }

        let (version, rest) = bytes.split_at(1);
        if version[0] != VERSION {
            return Err(CipherError::UnsupportedVersion(version[0]));
        }

        let (nonce, sealed) = rest.split_at(NONCE_LEN);
        let plaintext = self
            .cipher(key, salt)?
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Utf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: &str) -> SessionKey {
        SessionKey::new(value).expect("key is valid")
    }

    #[test]
    fn roundtrip_with_and_without_salt() {
        let cipher = Aes256GcmCipher::new("default");
        let k = key("k1");

        for salt in [None, Some("SALT")] {
            let sealed = cipher
                .encrypt("{\"user_id\":42}", &k, salt)
                .expect("encrypt succeeds");
            assert_ne!(sealed, "{\"user_id\":42}");
            let opened = cipher.decrypt(&sealed, &k, salt).expect("decrypt succeeds");
            assert_eq!(opened, "{\"user_id\":42}");
        }
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let cipher = Aes256GcmCipher::new("default");
        let k = key("k1");
        let a = cipher.encrypt("same", &k, None).expect("encrypt succeeds");
        let b = cipher.encrypt("same", &k, None).expect("encrypt succeeds");
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_or_salt_fails_authentication() {
        let cipher = Aes256GcmCipher::new("default");
        let sealed = cipher
            .encrypt("payload", &key("k1"), Some("SALT"))
            .expect("encrypt succeeds");

        assert_eq!(
            cipher.decrypt(&sealed, &key("k2"), Some("SALT")),
            Err(CipherError::Authentication)
        );
        assert_eq!(
            cipher.decrypt(&sealed, &key("k1"), Some("OTHER")),
            Err(CipherError::Authentication)
        );
    }

    #[test]
    fn missing_salt_uses_default_salt() {
        let sealed = Aes256GcmCipher::new("default")
            .encrypt("payload", &key("k1"), None)
            .expect("encrypt succeeds");

        let explicit = Aes256GcmCipher::new("unused")
            .decrypt(&sealed, &key("k1"), Some("default"))
            .expect("decrypt succeeds");
        assert_eq!(explicit, "payload");

        assert_eq!(
            Aes256GcmCipher::new("another").decrypt(&sealed, &key("k1"), None),
            Err(CipherError::Authentication)
        );
    }

    #[test]
    fn malformed_input_is_rejected() {
        let cipher = Aes256GcmCipher::new("default");
        let k = key("k1");

        assert!(matches!(
            cipher.decrypt("not base64!", &k, None),
            Err(CipherError::Encoding(_))
        ));
        assert_eq!(
            cipher.decrypt(&URL_SAFE_NO_PAD.encode([1u8; 8]), &k, None),
            Err(CipherError::Truncated(8))
        );

        let sealed = cipher
            .encrypt("payload", &k, None)
            .expect("encrypt succeeds");
        let mut bytes = URL_SAFE_NO_PAD.decode(sealed).expect("valid base64");
        bytes[0] = 9;
        assert_eq!(
            cipher.decrypt(&URL_SAFE_NO_PAD.encode(&bytes), &k, None),
            Err(CipherError::UnsupportedVersion(9))
        );
    }
}
