use std::borrow::Cow;

use time::Duration;
use tower_cookies::Cookie;

use crate::SameSite;

pub const DEFAULT_COOKIE_NAME: &str = "session_key";

/// Lifetime of the key cookie when neither an explicit expiry nor a session timeout is set.
pub const DEFAULT_KEY_LIFETIME: Duration = Duration::days(365);

#[derive(Debug, Clone)]
pub struct EncryptedSessionConfig {
    pub(crate) name: Cow<'static, str>,
    pub(crate) salt: Option<String>,
    pub(crate) http_only: bool,
    pub(crate) same_site: SameSite,
    pub(crate) secure: bool,
    pub(crate) path: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) expire: Option<Duration>,
    pub(crate) session_timeout: Option<Duration>,
}

impl Default for EncryptedSessionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            salt: None,
            http_only: true,
            same_site: SameSite::Lax,
            secure: false,
            path: "/".into(),
            domain: None,
            expire: None,
            session_timeout: None,
        }
    }
}

impl EncryptedSessionConfig {
    /// Defaults overridden by the process environment.
    ///
    /// Recognized variables: `SESSION_KEY_COOKIE_NAME`, `SESSION_ENCRYPTION_SALT`,
    /// `SESSION_KEY_SECURE` (`true`/`false`) and `SESSION_TIMEOUT_SECS`. Unset, empty or
    /// unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let mut config = Self::default();

        if let Some(name) = lookup("SESSION_KEY_COOKIE_NAME") {
            config = config.with_name(name);
        }
        if let Some(salt) = lookup("SESSION_ENCRYPTION_SALT") {
            config = config.with_salt(salt);
        }
        if let Some(secure) = lookup("SESSION_KEY_SECURE").and_then(|v| v.parse::<bool>().ok()) {
            config = config.with_secure(secure);
        }
        if let Some(secs) = lookup("SESSION_TIMEOUT_SECS").and_then(|v| v.parse::<i64>().ok()) {
            config = config.with_session_timeout(Duration::seconds(secs));
        }

        config
    }

    #[must_use]
    pub fn with_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Server-side secret mixed into the cipher key. Never sent to the client.
    #[must_use]
    pub fn with_salt<S: Into<String>>(mut self, salt: S) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Fall back to the cipher's deployment-wide default secret.
    #[must_use]
    pub fn without_salt(mut self) -> Self {
        self.salt = None;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    /// Max-age of the key cookie. Takes precedence over the session timeout.
    #[must_use]
    pub fn with_expire(mut self, expire: Duration) -> Self {
        self.expire = Some(expire);
        self
    }

    #[must_use]
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    pub fn salt(&self) -> Option<&str> {
        self.salt.as_deref()
    }

    pub(crate) fn key_lifetime(&self) -> Duration {
        self.expire
            .or(self.session_timeout)
            .unwrap_or(DEFAULT_KEY_LIFETIME)
    }

    pub(crate) fn build_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), value))
            .http_only(self.http_only)
            .same_site(self.same_site)
            .secure(self.secure)
            .path(self.path.clone())
            .max_age(std::cmp::max(self.key_lifetime(), Duration::ZERO));

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }
}
