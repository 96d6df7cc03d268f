//! Transparent encryption of session payloads for any session storage engine.
//!
//! Each user gets a random key, delivered in a cookie and sent back on every request. The
//! [`EncryptedSessionManagerLayer`] turns that key, plus an optional server-side salt, into an
//! [`EncryptedSessionStore`] wrapping your [`SessionEngine`], so the engine only ever sees
//! ciphertext. The key is never stored on the server.
//!
//! A payload that fails to decrypt (a foreign, stale or corrupted key cookie) reads as an empty
//! session instead of an error, so the user simply starts over.
//!
//! # Security
//! The key cookie is plain text by default. The `signed` and `private` features add
//! `tower-cookies` signing or encryption of that cookie; without them anyone holding the cookie
//! can decrypt the matching session record.

mod cipher;
mod config;
mod controller;
mod engine;
mod error;
mod key;
pub mod layer;
pub mod record;
mod store;

pub use tower_cookies::cookie::SameSite;
pub use tower_sessions_core::{Session, session_store};

#[cfg(any(feature = "signed", feature = "private"))]
pub use tower_cookies::Key;

pub use crate::cipher::{Aes256GcmCipher, CipherError, SessionCipher, deployment_secret};
pub use crate::config::{DEFAULT_COOKIE_NAME, DEFAULT_KEY_LIFETIME, EncryptedSessionConfig};
pub use crate::controller::{CookieController, PlaintextCookie};
pub use crate::engine::{SessionEngine, SessionHandle};
pub use crate::error::{Error, Result};
pub use crate::key::{SessionKey, resolve_key};
pub use crate::layer::EncryptedSessionManagerLayer;
pub use crate::record::RecordStore;
pub use crate::store::{EncryptedSessionStore, EncryptedSessionStoreBuilder};

#[cfg(feature = "signed")]
pub use crate::controller::SignedCookie;

#[cfg(feature = "private")]
pub use crate::controller::PrivateCookie;
