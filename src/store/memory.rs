use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{DocumentStore, VersionedDoc};

/// In-memory document store with per-key optimistic concurrency.
///
/// Versions start at 1 and bump on every write; the whole commit runs under
/// one lock, so a batch of writes is observed all-or-nothing.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, VersionedDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedDoc>, StoreError> {
        Ok(self.docs.lock().get(key).cloned())
    }

    async fn commit(
        &self,
        reads: &[(String, Option<u64>)],
        writes: Vec<(String, Value)>,
    ) -> Result<(), StoreError> {
        let mut docs = self.docs.lock();

        for (key, observed) in reads {
            let current = docs.get(key).map(|d| d.version);
            if current != *observed {
                return Err(StoreError::Conflict { key: key.clone() });
            }
        }

        for (key, data) in writes {
            let version = docs.get(&key).map(|d| d.version + 1).unwrap_or(1);
            docs.insert(key, VersionedDoc { version, data });
        }

        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, VersionedDoc)>, StoreError> {
        let docs = self.docs.lock();
        let mut entries: Vec<(String, VersionedDoc)> = docs
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn commit_bumps_versions_and_get_sees_them() {
        let store = MemoryStore::new();

        store
            .commit(&[("a".into(), None)], vec![("a".into(), json!({"x": 1}))])
            .await
            .unwrap();

        let doc = store.get("a").await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.data, json!({"x": 1}));

        store
            .commit(&[("a".into(), Some(1))], vec![("a".into(), json!({"x": 2}))])
            .await
            .unwrap();
        assert_eq!(store.get("a").await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn stale_read_conflicts_and_writes_nothing() {
        let store = MemoryStore::new();
        store
            .commit(&[], vec![("a".into(), json!(1)), ("b".into(), json!(1))])
            .await
            .unwrap();

        // Observed version 1 for "a", then someone else commits on top.
        store
            .commit(&[("a".into(), Some(1))], vec![("a".into(), json!(2))])
            .await
            .unwrap();

        let err = store
            .commit(
                &[("a".into(), Some(1))],
                vec![("a".into(), json!(3)), ("b".into(), json!(3))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { key } if key == "a"));

        // The batch must not have been applied partially.
        assert_eq!(store.get("a").await.unwrap().unwrap().data, json!(2));
        assert_eq!(store.get("b").await.unwrap().unwrap().data, json!(1));
    }

    #[tokio::test]
    async fn observed_absent_conflicts_once_created() {
        let store = MemoryStore::new();
        store
            .commit(&[("a".into(), None)], vec![("a".into(), json!(1))])
            .await
            .unwrap();

        let err = store
            .commit(&[("a".into(), None)], vec![("a".into(), json!(9))])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn scan_filters_by_prefix_in_key_order() {
        let store = MemoryStore::new();
        store
            .commit(
                &[],
                vec![
                    ("c:2".into(), json!(2)),
                    ("c:1".into(), json!(1)),
                    ("other".into(), json!(0)),
                ],
            )
            .await
            .unwrap();

        let entries = store.scan("c:").await.unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["c:1", "c:2"]);
    }
}
