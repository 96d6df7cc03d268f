//! How the session key cookie travels between the client and the layer.
//!
//! The layer only ever asks a controller two things: the incoming key cookie, if there is a
//! usable one, and to queue the outgoing key cookie. Anything the controller cannot vouch for is
//! reported as absent. [`resolve_key`](crate::resolve_key) then mints a fresh key, and because
//! every stored payload is sealed under the key that wrote it, the visitor's old records read as
//! empty. A forged or altered key cookie therefore costs the client its session and never
//! exposes someone else's.

use std::fmt::Debug;

use tower_cookies::{Cookie, Cookies};

/// Transport for the session key cookie.
pub trait CookieController: Debug + Clone + Send + Sync + 'static {
    /// The key cookie named `name`, or `None` when it is missing or fails verification.
    fn get(&self, cookies: &Cookies, name: &str) -> Option<Cookie<'static>>;

    /// Queues `cookie` on the response.
    fn add(&self, cookies: &Cookies, cookie: Cookie<'static>);
}

/// Key cookie sent as plain text.
///
/// Any non-empty value is used as the key. A client that edits it simply presents a key under
/// which none of the stored payloads decrypt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCookie;

impl CookieController for PlaintextCookie {
    fn get(&self, cookies: &Cookies, name: &str) -> Option<Cookie<'static>> {
        cookies.get(name).map(Cookie::into_owned)
    }

    fn add(&self, cookies: &Cookies, cookie: Cookie<'static>) {
        cookies.add(cookie);
    }
}

/// Key cookie carrying an HMAC from `tower-cookies`.
///
/// The key stays readable by the client. A cookie whose signature does not verify under `key`
/// is dropped by the signed jar, so `get` sees nothing and a new key is issued.
#[cfg(feature = "signed")]
#[derive(Debug, Clone)]
pub struct SignedCookie {
    key: crate::Key,
}

#[cfg(feature = "signed")]
impl SignedCookie {
    pub fn new(key: crate::Key) -> Self {
        Self { key }
    }
}

#[cfg(feature = "signed")]
impl CookieController for SignedCookie {
    fn get(&self, cookies: &Cookies, name: &str) -> Option<Cookie<'static>> {
        cookies.signed(&self.key).get(name).map(Cookie::into_owned)
    }

    fn add(&self, cookies: &Cookies, cookie: Cookie<'static>) {
        cookies.signed(&self.key).add(cookie);
    }
}

/// Key cookie sealed with AES-GCM by `tower-cookies`.
///
/// The client never sees the session key. A value that fails to open under `key` is treated as
/// missing, the same as a bad signature.
#[cfg(feature = "private")]
#[derive(Debug, Clone)]
pub struct PrivateCookie {
    key: crate::Key,
}

#[cfg(feature = "private")]
impl PrivateCookie {
    pub fn new(key: crate::Key) -> Self {
        Self { key }
    }
}

#[cfg(feature = "private")]
impl CookieController for PrivateCookie {
    fn get(&self, cookies: &Cookies, name: &str) -> Option<Cookie<'static>> {
        cookies.private(&self.key).get(name).map(Cookie::into_owned)
    }

    fn add(&self, cookies: &Cookies, cookie: Cookie<'static>) {
        cookies.private(&self.key).add(cookie);
    }
}
