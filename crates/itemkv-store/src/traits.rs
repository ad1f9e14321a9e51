use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::batch::Batch;
use crate::error::StoreResult;

/// Key-value and set store.
///
/// All implementations must satisfy these invariants:
/// - A key holds either a value or a set. Using it as the other kind fails
///   with [`StoreError::WrongType`](crate::StoreError::WrongType).
/// - Reading a missing key is not an error: values come back as `None`, sets
///   come back empty.
/// - [`exec`](KvStore::exec) applies a whole batch or nothing.
/// - Errors are propagated, never retried or swallowed.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored at `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Read several values in one round-trip.
    ///
    /// The result has one slot per requested key, in request order. Default
    /// implementation calls `get()` for each key.
    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// All members of the set at `set`.
    async fn members(&self, set: &str) -> StoreResult<BTreeSet<String>>;

    /// Members present in every one of `sets`.
    ///
    /// An empty list of sets yields an empty result.
    async fn intersect(&self, sets: &[String]) -> StoreResult<BTreeSet<String>>;

    /// Apply every operation in `batch` as one all-or-nothing unit.
    async fn exec(&self, batch: Batch) -> StoreResult<()>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Store a single value.
    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut batch = Batch::new();
        batch.set(key, value);
        self.exec(batch).await
    }

    /// Remove a single key.
    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut batch = Batch::new();
        batch.delete(key);
        self.exec(batch).await
    }

    /// Add one member to a set.
    async fn add_member(&self, set: &str, member: &str) -> StoreResult<()> {
        let mut batch = Batch::new();
        batch.add_member(set, member);
        self.exec(batch).await
    }

    /// Remove one member from a set.
    async fn remove_member(&self, set: &str, member: &str) -> StoreResult<()> {
        let mut batch = Batch::new();
        batch.remove_member(set, member);
        self.exec(batch).await
    }
}
