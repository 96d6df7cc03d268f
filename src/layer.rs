use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{Request, Response};
use tower_cookies::CookieManager;
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    cipher::{Aes256GcmCipher, SessionCipher},
    config::EncryptedSessionConfig,
    controller::{CookieController, PlaintextCookie},
    engine::{SessionEngine, SessionHandle},
    key,
    store::EncryptedSessionStore,
};

/// Installs an [`EncryptedSessionStore`] over a shared engine for every request.
///
/// The per-user key comes from the key cookie when the client sends one and is generated
/// otherwise. The store is exposed to inner services as a [`SessionHandle`] request extension,
/// and the key cookie is written on every response so the next request can decrypt the session.
pub struct EncryptedSessionManagerLayer<E: ?Sized, C = PlaintextCookie, X = Aes256GcmCipher> {
    engine: Arc<E>,
    config: EncryptedSessionConfig,
    controller: C,
    cipher: X,
}

impl<E: SessionEngine + ?Sized> EncryptedSessionManagerLayer<E> {
    #[must_use]
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            config: EncryptedSessionConfig::default(),
            controller: PlaintextCookie,
            cipher: Aes256GcmCipher::default(),
        }
    }
}

#[cfg(feature = "signed")]
impl<E: SessionEngine + ?Sized> EncryptedSessionManagerLayer<E, crate::SignedCookie> {
    /// Sign the key cookie with `key`.
    #[must_use]
    pub fn signed(engine: Arc<E>, key: crate::Key) -> Self {
        EncryptedSessionManagerLayer::new(engine).with_controller(crate::SignedCookie::new(key))
    }
}

#[cfg(feature = "private")]
impl<E: SessionEngine + ?Sized> EncryptedSessionManagerLayer<E, crate::PrivateCookie> {
    /// Encrypt the key cookie itself with `key`.
    #[must_use]
    pub fn private(engine: Arc<E>, key: crate::Key) -> Self {
        EncryptedSessionManagerLayer::new(engine).with_controller(crate::PrivateCookie::new(key))
    }
}

impl<E, C, X> EncryptedSessionManagerLayer<E, C, X>
where
    E: SessionEngine + ?Sized,
    C: CookieController,
    X: SessionCipher,
{
    #[must_use]
    pub fn with_config(mut self, config: EncryptedSessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_controller<C2: CookieController>(
        self,
        controller: C2,
    ) -> EncryptedSessionManagerLayer<E, C2, X> {
        EncryptedSessionManagerLayer {
            engine: self.engine,
            config: self.config,
            controller,
            cipher: self.cipher,
        }
    }

    #[must_use]
    pub fn with_cipher<X2: SessionCipher>(
        self,
        cipher: X2,
    ) -> EncryptedSessionManagerLayer<E, C, X2> {
        EncryptedSessionManagerLayer {
            engine: self.engine,
            config: self.config,
            controller: self.controller,
            cipher,
        }
    }
}

impl<E: ?Sized, C: Clone, X: Clone> Clone for EncryptedSessionManagerLayer<E, C, X> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: self.config.clone(),
            controller: self.controller.clone(),
            cipher: self.cipher.clone(),
        }
    }
}

impl<E: fmt::Debug + ?Sized, C: fmt::Debug, X: fmt::Debug> fmt::Debug
    for EncryptedSessionManagerLayer<E, C, X>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedSessionManagerLayer")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("controller", &self.controller)
            .field("cipher", &self.cipher)
            .finish()
    }
}

pub struct EncryptedSessionManager<S, E: ?Sized, C, X> {
    inner: S,
    engine: Arc<E>,
    config: EncryptedSessionConfig,
    controller: C,
    cipher: X,
}

impl<S: Clone, E: ?Sized, C: Clone, X: Clone> Clone for EncryptedSessionManager<S, E, C, X> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            engine: self.engine.clone(),
            config: self.config.clone(),
            controller: self.controller.clone(),
            cipher: self.cipher.clone(),
        }
    }
}

impl<S: fmt::Debug, E: fmt::Debug + ?Sized, C: fmt::Debug, X: fmt::Debug> fmt::Debug
    for EncryptedSessionManager<S, E, C, X>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedSessionManager")
            .field("inner", &self.inner)
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("controller", &self.controller)
            .field("cipher", &self.cipher)
            .finish()
    }
}

impl<S, E, C, X> Layer<S> for EncryptedSessionManagerLayer<E, C, X>
where
    E: SessionEngine + ?Sized,
    C: CookieController,
    X: SessionCipher,
{
    type Service = CookieManager<EncryptedSessionManager<S, E, C, X>>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieManager::new(EncryptedSessionManager {
            inner,
            engine: self.engine.clone(),
            config: self.config.clone(),
            controller: self.controller.clone(),
            cipher: self.cipher.clone(),
        })
    }
}

fn internal_server_error<B: Default>() -> Response<B> {
    let mut res = Response::default();
    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
    res
}

impl<ReqBody, ResBody, S, E, C, X> Service<Request<ReqBody>> for EncryptedSessionManager<S, E, C, X>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    E: SessionEngine + ?Sized,
    C: CookieController,
    X: SessionCipher,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let engine = self.engine.clone();
        let config = self.config.clone();
        let controller = self.controller.clone();
        let cipher = self.cipher.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let Some(cookies) = req.extensions().get::<tower_cookies::Cookies>().cloned() else {
                tracing::error!("cookie manager is missing from request extensions");
                return Ok(internal_server_error());
            };

            let incoming = controller.get(&cookies, &config.name);
            let key = match key::resolve_key(incoming.as_ref().map(|cookie| cookie.value())) {
                Ok(key) => key,
                Err(err) => {
                    tracing::error!(err = %err, "session key provisioning failed");
                    return Ok(internal_server_error());
                }
            };

            let store = EncryptedSessionStore::from_key(key, config.salt.clone(), engine, cipher);
            let key_value = store.key().as_str().to_owned();
            req.extensions_mut().insert(SessionHandle::new(store));

            let res = inner.call(req).await?;

            controller.add(&cookies, config.build_cookie(key_value));

            Ok(res)
        })
    }
}
