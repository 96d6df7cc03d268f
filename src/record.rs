//! Runs `tower_sessions_core::Session` on top of a [`SessionEngine`].
//!
//! Records are serialized to a small versioned JSON envelope and handed to the engine as the
//! session payload. Paired with an [`EncryptedSessionStore`](crate::EncryptedSessionStore), the
//! envelope is what gets encrypted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_sessions_core::{
    SessionStore,
    session::{Id, Record},
    session_store,
};

use crate::engine::SessionEngine;

const VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u8,
    record: Record,
}

/// Encode a session [`Record`] into an engine payload.
pub fn encode_record(record: &Record) -> session_store::Result<String> {
    let envelope = Envelope {
        v: VERSION,
        record: record.clone(),
    };

    serde_json::to_string(&envelope)
        .map_err(|err| session_store::Error::Encode(err.to_string()))
}

/// Decode an engine payload into a session [`Record`].
pub fn decode_record(value: &str) -> session_store::Result<Record> {
    let envelope: Envelope = serde_json::from_str(value)
        .map_err(|err| session_store::Error::Decode(err.to_string()))?;

    if envelope.v != VERSION {
        return Err(session_store::Error::Decode(format!(
            "Unsupported session record version: {}",
            envelope.v
        )));
    }

    Ok(envelope.record)
}

/// [`SessionStore`] backed by any [`SessionEngine`], typically the request's
/// [`SessionHandle`](crate::SessionHandle).
#[derive(Debug, Clone)]
pub struct RecordStore<E> {
    engine: E,
}

impl<E: SessionEngine> RecordStore<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[async_trait]
impl<E: SessionEngine> SessionStore for RecordStore<E> {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while !self.engine.read(&record.id.to_string()).await?.is_empty() {
            record.id = Id::default();
        }
        self.save(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let payload = encode_record(record)?;
        if self.engine.write(&record.id.to_string(), &payload).await? {
            Ok(())
        } else {
            Err(session_store::Error::Backend(
                "session engine rejected write".into(),
            ))
        }
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let payload = self.engine.read(&session_id.to_string()).await?;
        if payload.is_empty() {
            return Ok(None);
        }

        let record = decode_record(&payload)?;
        Ok(Some(record).filter(|record| record.expiry_date > OffsetDateTime::now_utc()))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.engine.destroy(&session_id.to_string()).await?;
        Ok(())
    }
}
