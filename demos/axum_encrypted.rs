use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{Router, routing::get};
use time::Duration;
use tower_cookies::{Cookie, Cookies};
use tower_sessions_core::session::Id;
use tower_sessions_encrypted_store::{
    EncryptedSessionConfig, EncryptedSessionManagerLayer, RecordStore, SameSite, Session,
    SessionEngine, SessionHandle, session_store,
};

// A real deployment would plug in a database or cache backed engine here.
#[derive(Debug, Default)]
struct MemoryEngine {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryEngine {
    fn records(&self) -> session_store::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.records
            .lock()
            .map_err(|_| session_store::Error::Backend("memory engine lock is poisoned".into()))
    }
}

#[async_trait]
impl SessionEngine for MemoryEngine {
    async fn open(&self, _save_path: &str, _name: &str) -> session_store::Result<bool> {
        Ok(true)
    }

    async fn close(&self) -> session_store::Result<bool> {
        Ok(true)
    }

    async fn read(&self, session_id: &str) -> session_store::Result<String> {
        Ok(self.records()?.get(session_id).cloned().unwrap_or_default())
    }

    async fn write(&self, session_id: &str, data: &str) -> session_store::Result<bool> {
        self.records()?
            .insert(session_id.to_string(), data.to_string());
        Ok(true)
    }

    async fn destroy(&self, session_id: &str) -> session_store::Result<bool> {
        Ok(self.records()?.remove(session_id).is_some())
    }

    async fn gc(&self, _max_lifetime: i64) -> session_store::Result<u64> {
        Ok(0)
    }
}

// Each visitor gets their own record: the id lives in a cookie next to the key cookie.
const SESSION_ID_COOKIE: &str = "sid";

async fn index(handle: SessionHandle, cookies: Cookies) -> String {
    let id = cookies
        .get(SESSION_ID_COOKIE)
        .and_then(|cookie| cookie.value().parse::<Id>().ok());
    let session = Session::new(id, Arc::new(RecordStore::new(handle)), None);

    let n: usize = session
        .get("n")
        .await
        .expect("session get succeeds")
        .unwrap_or_default();
    session
        .insert("n", n + 1)
        .await
        .expect("session insert succeeds");
    session.save().await.expect("session save succeeds");

    if let Some(id) = session.id() {
        let mut cookie = Cookie::new(SESSION_ID_COOKIE, id.to_string());
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookies.add(cookie);
    }

    format!("n={n}")
}

#[tokio::main]
async fn main() {
    let engine = Arc::new(MemoryEngine::default());
    let session_config = EncryptedSessionConfig::from_env()
        // Default: "session_key"
        .with_name("session_key")
        // Default: none (the cipher's deployment secret)
        .with_salt("change-me")
        // Default: true
        .with_http_only(true)
        // Default: SameSite::Lax
        .with_same_site(SameSite::Lax)
        // Default: false
        .with_secure(false)
        // Default: "/"
        .with_path("/")
        // Default: None
        .without_domain()
        // Default: session timeout, else one year
        .with_expire(Duration::days(30));
    let session_layer = EncryptedSessionManagerLayer::new(engine).with_config(session_config);

    let app = Router::new().route("/", get(index)).layer(session_layer);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    println!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
