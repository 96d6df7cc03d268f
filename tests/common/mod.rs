#![allow(dead_code)]

// Shared helpers for integration tests.
//
// `MemoryEngine` stands in for a real storage backend; `RecordingEngine` returns canned values
// and logs every call so forwarding can be asserted exactly.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::body::Body;
use http::{HeaderMap, header};
use http_body_util::BodyExt as _;
use tower_cookies::Cookie;
use tower_sessions_encrypted_store::{SessionEngine, session_store};

pub async fn body_string(body: Body) -> String {
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn get_key_cookie_from_headers(headers: &HeaderMap) -> Cookie<'static> {
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header");
    let set_cookie = set_cookie
        .to_str()
        .expect("set-cookie header is valid utf-8");
    Cookie::parse_encoded(set_cookie)
        .expect("set-cookie parses successfully")
        .into_owned()
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    cookie.encoded().to_string()
}

#[derive(Debug, Default)]
pub struct MemoryEngine {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryEngine {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn raw(&self, session_id: &str) -> Option<String> {
        self.records
            .lock()
            .expect("lock is healthy")
            .get(session_id)
            .cloned()
    }

    pub fn put_raw(&self, session_id: &str, data: &str) {
        self.records
            .lock()
            .expect("lock is healthy")
            .insert(session_id.to_string(), data.to_string());
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
        Ok(self.raw(session_id).unwrap_or_default())
    }

    async fn write(&self, session_id: &str, data: &str) -> session_store::Result<bool> {
        self.put_raw(session_id, data);
        Ok(true)
    }

    async fn destroy(&self, session_id: &str) -> session_store::Result<bool> {
        Ok(self
            .records
            .lock()
            .expect("lock is healthy")
            .remove(session_id)
            .is_some())
    }

    async fn gc(&self, _max_lifetime: i64) -> session_store::Result<u64> {
        Ok(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(String, String),
    Close,
    Read(String),
    Write(String, String),
    Destroy(String),
    Gc(i64),
}

#[derive(Debug)]
pub struct RecordingEngine {
    pub calls: Mutex<Vec<Call>>,
    pub read_result: String,
    pub flag_result: bool,
    pub gc_result: u64,
    pub fail: bool,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            read_result: String::new(),
            flag_result: true,
            gc_result: 0,
            fail: false,
        }
    }
}

impl RecordingEngine {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock is healthy").clone()
    }

    pub fn last_write(&self) -> Option<(String, String)> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::Write(id, data) => Some((id, data)),
            _ => None,
        })
    }

    fn record(&self, call: Call) -> session_store::Result<()> {
        self.calls.lock().expect("lock is healthy").push(call);
        if self.fail {
            return Err(session_store::Error::Backend("engine unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionEngine for RecordingEngine {
    async fn open(&self, save_path: &str, name: &str) -> session_store::Result<bool> {
        self.record(Call::Open(save_path.to_string(), name.to_string()))?;
        Ok(self.flag_result)
    }

    async fn close(&self) -> session_store::Result<bool> {
        self.record(Call::Close)?;
        Ok(self.flag_result)
    }

    async fn read(&self, session_id: &str) -> session_store::Result<String> {
        self.record(Call::Read(session_id.to_string()))?;
        Ok(self.read_result.clone())
    }

    async fn write(&self, session_id: &str, data: &str) -> session_store::Result<bool> {
        self.record(Call::Write(session_id.to_string(), data.to_string()))?;
        Ok(self.flag_result)
    }

    async fn destroy(&self, session_id: &str) -> session_store::Result<bool> {
        self.record(Call::Destroy(session_id.to_string()))?;
        Ok(self.flag_result)
    }

    async fn gc(&self, max_lifetime: i64) -> session_store::Result<u64> {
        self.record(Call::Gc(max_lifetime))?;
        Ok(self.gc_result)
    }
}
