use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::env::RetrySettings;
use crate::error::{RaidError, RaidResult, StoreError};
use crate::store::DocumentStore;

/// One optimistic read-compute-write cycle.
///
/// Records the version of every key it reads (including reads that find
/// nothing) and stages writes locally; nothing touches the store until the
/// runner commits. Staged writes are visible to later reads in the same
/// transaction.
pub struct Transaction {
    store: Arc<dyn DocumentStore>,
    reads: Vec<(String, Option<u64>)>,
    writes: Vec<(String, serde_json::Value)>,
}

impl Transaction {
    fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&mut self, key: &str) -> RaidResult<Option<T>> {
        if let Some((_, staged)) = self.writes.iter().rev().find(|(k, _)| k == key) {
            return Ok(Some(serde_json::from_value(staged.clone())?));
        }

        let doc = self.store.get(key).await?;
        if !self.reads.iter().any(|(k, _)| k == key) {
            self.reads
                .push((key.to_string(), doc.as_ref().map(|d| d.version)));
        }

        match doc {
            Some(d) => Ok(Some(serde_json::from_value(d.data)?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> RaidResult<()> {
        let data = serde_json::to_value(value)?;
        if let Some(entry) = self.writes.iter_mut().find(|(k, _)| k == key) {
            entry.1 = data;
        } else {
            self.writes.push((key.to_string(), data));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.store.commit(&self.reads, self.writes).await
    }
}

/// Run `op` as an atomic unit, retrying the whole read-compute-write cycle
/// on write conflicts with exponential backoff, up to `retry.max_attempts`.
///
/// Business errors returned by `op` abort immediately: nothing was committed
/// and nothing is retried. Only retry exhaustion surfaces as `Contention`.
pub async fn run_transaction<T, F>(
    store: Arc<dyn DocumentStore>,
    retry: &RetrySettings,
    op: F,
) -> RaidResult<T>
where
    F: for<'a> Fn(&'a mut Transaction) -> BoxFuture<'a, RaidResult<T>>,
{
    let mut delay = Duration::from_millis(retry.initial_backoff_ms);

    for attempt in 1..=retry.max_attempts {
        let mut txn = Transaction::new(store.clone());
        let value = op(&mut txn).await?;

        match txn.commit().await {
            Ok(()) => return Ok(value),
            Err(StoreError::Conflict { key }) => {
                debug!(attempt, key = %key, "transaction conflict, retrying");
                if attempt < retry.max_attempts {
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_millis(retry.max_backoff_ms));
                }
            }
            Err(e) => return Err(RaidError::Store(e)),
        }
    }

    Err(RaidError::Contention)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, VersionedDoc};
    use async_trait::async_trait;
    use serde_json::Value;

    fn retry() -> RetrySettings {
        RetrySettings {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
        }
    }

    #[tokio::test]
    async fn read_modify_write_commits() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

        let out = run_transaction(store.clone(), &retry(), |txn: &mut Transaction| {
            Box::pin(async move {
                let current: Option<u64> = txn.get("counter").await?;
                let next = current.unwrap_or(0) + 1;
                txn.set("counter", &next)?;
                Ok(next)
            })
        })
        .await
        .unwrap();

        assert_eq!(out, 1);
        let doc = store.get("counter").await.unwrap().unwrap();
        assert_eq!(doc.data, serde_json::json!(1));
    }

    #[tokio::test]
    async fn staged_writes_are_visible_to_later_reads() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

        let out = run_transaction(store, &retry(), |txn: &mut Transaction| {
            Box::pin(async move {
                txn.set("k", &41u64)?;
                let staged: Option<u64> = txn.get("k").await?;
                Ok(staged.unwrap())
            })
        })
        .await
        .unwrap();

        assert_eq!(out, 41);
    }

    #[tokio::test]
    async fn business_error_aborts_without_writes() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

        let result: RaidResult<()> = run_transaction(store.clone(), &retry(), |txn: &mut Transaction| {
            Box::pin(async move {
                txn.set("k", &1u64)?;
                Err(RaidError::DailyCapReached)
            })
        })
        .await;

        assert!(matches!(result, Err(RaidError::DailyCapReached)));
        assert!(store.get("k").await.unwrap().is_none());
    }

    /// Store whose commits always conflict, to drive the retry loop dry.
    struct AlwaysConflict;

    #[async_trait]
    impl DocumentStore for AlwaysConflict {
        async fn get(&self, _key: &str) -> Result<Option<VersionedDoc>, StoreError> {
            Ok(None)
        }
        async fn commit(
            &self,
            _reads: &[(String, Option<u64>)],
            _writes: Vec<(String, Value)>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Conflict { key: "k".into() })
        }
        async fn scan(&self, _prefix: &str) -> Result<Vec<(String, VersionedDoc)>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn retry_exhaustion_surfaces_contention() {
        let store: Arc<dyn DocumentStore> = Arc::new(AlwaysConflict);

        let result = run_transaction(store, &retry(), |txn: &mut Transaction| {
            Box::pin(async move {
                txn.set("k", &1u64)?;
                Ok(())
            })
        })
        .await;

        assert!(matches!(result, Err(RaidError::Contention)));
    }
}
