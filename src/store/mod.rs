use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub mod memory;
pub mod txn;

pub use memory::MemoryStore;
pub use txn::{run_transaction, Transaction};

/// A document snapshot together with the version the store handed it out at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDoc {
    pub version: u64,
    pub data: Value,
}

/// Consistency contract of the shared state store.
///
/// Any backend with per-key optimistic concurrency (an in-memory map, a
/// relational table with a version column, a distributed KV with CAS) can
/// implement this without the attack path changing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<VersionedDoc>, StoreError>;

    /// Atomically apply `writes` iff every key in `reads` is still at the
    /// observed version (`None` = observed absent). On any mismatch nothing
    /// is written and `StoreError::Conflict` names the offending key.
    async fn commit(
        &self,
        reads: &[(String, Option<u64>)],
        writes: Vec<(String, Value)>,
    ) -> Result<(), StoreError>;

    /// Non-transactional prefix enumeration, used by the ranking query and
    /// the defeat fan-out. Returned in key order.
    async fn scan(&self, prefix: &str) -> Result<Vec<(String, VersionedDoc)>, StoreError>;
}
