// Property tests: any non-empty payload written through the store reads back unchanged under
// the same key and salt, and never under a different key.
mod common;

use proptest::prelude::*;
use tower_sessions_encrypted_store::{EncryptedSessionStore, SessionEngine};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime builds")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn payload_roundtrips(
        payload in ".{1,512}",
        key in "[a-f0-9]{1,64}",
        salt in proptest::option::of(".{0,32}"),
    ) {
        let engine = common::MemoryEngine::shared();
        let store = EncryptedSessionStore::new(key, salt, engine.clone()).expect("store builds");

        let read = runtime().block_on(async {
            store.write("sid", &payload).await.expect("write succeeds");
            store.read("sid").await.expect("read succeeds")
        });

        prop_assert_ne!(engine.raw("sid").expect("record stored"), payload.clone());
        prop_assert_eq!(read, payload);
    }

    #[test]
    fn other_key_reads_empty(payload in ".{1,256}") {
        let engine = common::MemoryEngine::shared();
        let writer = EncryptedSessionStore::new("writer", None, engine.clone()).expect("builds");
        let reader = EncryptedSessionStore::new("reader", None, engine).expect("builds");

        let read = runtime().block_on(async {
            writer.write("sid", &payload).await.expect("write succeeds");
            reader.read("sid").await.expect("read succeeds")
        });

        prop_assert_eq!(read, "");
    }
}
