//! In-process [`RecordStore`] used by rotation and handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use common::{Envelope, RecordKind, StoredRecord};
use serde_json::Map;

use super::{RecordStore, StoreError, UpdateOutcome};

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<RecordKind, Vec<StoredRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an encrypted record.
    pub fn insert_encrypted(&self, kind: RecordKind, id: &str, owner_id: &str, envelope: Envelope) {
        self.insert(
            kind,
            StoredRecord {
                id: id.into(),
                owner_id: owner_id.into(),
                encrypted: true,
                envelope: Some(envelope),
                fields: Map::new(),
            },
        );
    }

    /// Insert a plaintext record with the given fields.
    pub fn insert_plain(
        &self,
        kind: RecordKind,
        id: &str,
        owner_id: &str,
        fields: serde_json::Value,
    ) {
        let fields = match fields {
            serde_json::Value::Object(map) => map,
            _ => Map::new(),
        };
        self.insert(
            kind,
            StoredRecord {
                id: id.into(),
                owner_id: owner_id.into(),
                encrypted: false,
                envelope: None,
                fields,
            },
        );
    }

    pub fn insert(&self, kind: RecordKind, record: StoredRecord) {
        self.records.lock().unwrap().entry(kind).or_default().push(record);
    }

    pub fn get(&self, kind: RecordKind, id: &str) -> Option<StoredRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&kind)?
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn envelope(&self, kind: RecordKind, id: &str) -> Envelope {
        self.get(kind, id)
            .and_then(|r| r.envelope)
            .expect("record with envelope")
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list(
        &self,
        kind: RecordKind,
        owner_id: &str,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&kind)
            .map(|rs| rs.iter().filter(|r| r.owner_id == owner_id).cloned().collect())
            .unwrap_or_default())
    }

    async fn update_envelope(
        &self,
        kind: RecordKind,
        record_id: &str,
        owner_id: &str,
        envelope: &Envelope,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut records = self.records.lock().unwrap();
        let found = records
            .get_mut(&kind)
            .and_then(|rs| rs.iter_mut().find(|r| r.id == record_id && r.owner_id == owner_id));
        match found {
            Some(record) => {
                record.envelope = Some(envelope.clone());
                Ok(UpdateOutcome::Updated)
            }
            None => Ok(UpdateOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn list_is_scoped_by_owner() {
        let store = InMemoryRecordStore::new();
        store.insert_plain(RecordKind::Todos, "t1", "alice", json!({"title": "a"}));
        store.insert_plain(RecordKind::Todos, "t2", "bob", json!({"title": "b"}));
        let alice = store.list(RecordKind::Todos, "alice").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, "t1");
        assert!(store.list(RecordKind::Loans, "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_never_crosses_owners() {
        let store = InMemoryRecordStore::new();
        store.insert_encrypted(RecordKind::Clients, "c1", "alice", Envelope::default());
        let env = Envelope {
            ciphertext: "new".into(),
            ..Envelope::default()
        };
        let res = store
            .update_envelope(RecordKind::Clients, "c1", "mallory", &env)
            .await
            .unwrap();
        assert_eq!(res, UpdateOutcome::NotFound);
        assert_eq!(store.envelope(RecordKind::Clients, "c1").ciphertext, "");

        let res = store
            .update_envelope(RecordKind::Clients, "c1", "alice", &env)
            .await
            .unwrap();
        assert_eq!(res, UpdateOutcome::Updated);
        assert_eq!(store.envelope(RecordKind::Clients, "c1").ciphertext, "new");
    }
}
