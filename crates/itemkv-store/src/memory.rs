use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::batch::{Batch, Op};
use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Entry {
    Value(Vec<u8>),
    Set(BTreeSet<String>),
}

/// In-memory key-value and set store.
///
/// One `HashMap` keyspace behind a `RwLock`. A batch is staged against
/// copies of the keys it touches and written back under the same write lock
/// only when every op succeeded, so a failing batch leaves nothing behind.
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read_map(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_map(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.read_map().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if no key is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of every key in the store.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.read_map()?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Remove every key.
    pub fn clear(&self) -> StoreResult<()> {
        self.write_map()?.clear();
        Ok(())
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

fn set_of<'a>(map: &'a HashMap<String, Entry>, key: &str) -> StoreResult<Option<&'a BTreeSet<String>>> {
    match map.get(key) {
        None => Ok(None),
        Some(Entry::Set(members)) => Ok(Some(members)),
        Some(Entry::Value(_)) => Err(StoreError::WrongType {
            key: key.to_string(),
        }),
    }
}

fn apply(slot: &mut Option<Entry>, op: &Op) -> StoreResult<()> {
    match op {
        Op::Set { value, .. } => *slot = Some(Entry::Value(value.clone())),
        Op::Delete { .. } => *slot = None,
        Op::AddMember { set, member } => match slot {
            None => *slot = Some(Entry::Set(BTreeSet::from([member.clone()]))),
            Some(Entry::Set(members)) => {
                members.insert(member.clone());
            }
            Some(Entry::Value(_)) => return Err(StoreError::WrongType { key: set.clone() }),
        },
        Op::RemoveMember { set, member } => match slot {
            None => {}
            Some(Entry::Set(members)) => {
                members.remove(member);
                if members.is_empty() {
                    *slot = None;
                }
            }
            Some(Entry::Value(_)) => return Err(StoreError::WrongType { key: set.clone() }),
        },
    }
    Ok(())
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let map = self.read_map()?;
        match map.get(key) {
            None => Ok(None),
            Some(Entry::Value(v)) => Ok(Some(v.clone())),
            Some(Entry::Set(_)) => Err(StoreError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        let map = self.read_map()?;
        keys.iter()
            .map(|key| match map.get(key) {
                None => Ok(None),
                Some(Entry::Value(v)) => Ok(Some(v.clone())),
                Some(Entry::Set(_)) => Err(StoreError::WrongType { key: key.clone() }),
            })
            .collect()
    }

    async fn members(&self, set: &str) -> StoreResult<BTreeSet<String>> {
        let map = self.read_map()?;
        Ok(set_of(&map, set)?.cloned().unwrap_or_default())
    }

    async fn intersect(&self, sets: &[String]) -> StoreResult<BTreeSet<String>> {
        let map = self.read_map()?;
        let mut resolved = Vec::with_capacity(sets.len());
        for name in sets {
            match set_of(&map, name)? {
                Some(members) => resolved.push(members),
                None => return Ok(BTreeSet::new()),
            }
        }
        resolved.sort_by_key(|members| members.len());
        let Some((smallest, rest)) = resolved.split_first() else {
            return Ok(BTreeSet::new());
        };
        Ok(smallest
            .iter()
            .filter(|m| rest.iter().all(|other| other.contains(*m)))
            .cloned()
            .collect())
    }

    async fn exec(&self, batch: Batch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut map = self.write_map()?;
        let mut staged: HashMap<String, Option<Entry>> = HashMap::new();
        for op in batch.ops() {
            let key = op.key();
            let slot = staged
                .entry(key.to_string())
                .or_insert_with(|| map.get(key).cloned());
            apply(slot, op)?;
        }
        for (key, slot) in staged {
            match slot {
                Some(entry) => {
                    map.insert(key, entry);
                }
                None => {
                    map.remove(&key);
                }
            }
        }
        tracing::trace!(ops = batch.len(), "batch applied");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_get_delete_value() {
        let store = InMemoryKvStore::new();
        store.set("k", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"hello".to_vec()));

        store.set("k", b"again".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"again".to_vec()));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = InMemoryKvStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        store.delete("nope").await.unwrap();
    }

    #[tokio::test]
    async fn get_many_keeps_request_order() {
        let store = InMemoryKvStore::new();
        store.set("a", b"1".to_vec()).await.unwrap();
        store.set("c", b"3".to_vec()).await.unwrap();
        let keys = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        let values = store.get_many(&keys).await.unwrap();
        assert_eq!(values, vec![Some(b"3".to_vec()), None, Some(b"1".to_vec())]);
    }

    // -----------------------------------------------------------------------
    // Sets
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn add_and_remove_members() {
        let store = InMemoryKvStore::new();
        store.add_member("s", "a").await.unwrap();
        store.add_member("s", "b").await.unwrap();
        store.add_member("s", "a").await.unwrap();
        assert_eq!(store.members("s").await.unwrap(), set(&["a", "b"]));

        store.remove_member("s", "a").await.unwrap();
        assert_eq!(store.members("s").await.unwrap(), set(&["b"]));
    }

    #[tokio::test]
    async fn empty_set_disappears() {
        let store = InMemoryKvStore::new();
        store.add_member("s", "only").await.unwrap();
        store.remove_member("s", "only").await.unwrap();
        assert!(store.members("s").await.unwrap().is_empty());
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_from_missing_set_is_noop() {
        let store = InMemoryKvStore::new();
        store.remove_member("ghost", "x").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn intersect_sets() {
        let store = InMemoryKvStore::new();
        for m in ["1", "2", "3"] {
            store.add_member("a", m).await.unwrap();
        }
        for m in ["2", "3", "4"] {
            store.add_member("b", m).await.unwrap();
        }
        store.add_member("c", "3").await.unwrap();

        let two = store.intersect(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(two, set(&["2", "3"]));

        let three = store
            .intersect(&["a".into(), "b".into(), "c".into()])
            .await
            .unwrap();
        assert_eq!(three, set(&["3"]));
    }

    #[tokio::test]
    async fn intersect_with_missing_set_is_empty() {
        let store = InMemoryKvStore::new();
        store.add_member("a", "1").await.unwrap();
        let result = store.intersect(&["a".into(), "missing".into()]).await.unwrap();
        assert!(result.is_empty());
        assert!(store.intersect(&[]).await.unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Wrong type
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn wrong_type_errors() {
        let store = InMemoryKvStore::new();
        store.set("v", b"x".to_vec()).await.unwrap();
        store.add_member("s", "m").await.unwrap();

        assert!(matches!(store.members("v").await, Err(StoreError::WrongType { .. })));
        assert!(matches!(store.get("s").await, Err(StoreError::WrongType { .. })));
        assert!(matches!(
            store.add_member("v", "m").await,
            Err(StoreError::WrongType { .. })
        ));
        assert!(matches!(
            store.intersect(&["s".into(), "v".into()]).await,
            Err(StoreError::WrongType { .. })
        ));
    }

    #[tokio::test]
    async fn set_overwrites_a_set() {
        let store = InMemoryKvStore::new();
        store.add_member("k", "m").await.unwrap();
        store.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn batch_applies_in_order() {
        let store = InMemoryKvStore::new();
        let mut batch = Batch::new();
        batch
            .set("k", b"1".to_vec())
            .add_member("s", "a")
            .add_member("s", "b")
            .remove_member("s", "a")
            .set("k", b"2".to_vec());
        store.exec(batch).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.members("s").await.unwrap(), set(&["b"]));
    }

    #[tokio::test]
    async fn failed_batch_leaves_store_untouched() {
        let store = InMemoryKvStore::new();
        store.set("v", b"keep".to_vec()).await.unwrap();
        store.add_member("s", "old").await.unwrap();

        let mut batch = Batch::new();
        batch
            .set("new", b"x".to_vec())
            .remove_member("s", "old")
            .add_member("v", "boom");
        let err = store.exec(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::WrongType { ref key } if key == "v"));

        assert_eq!(store.get("new").await.unwrap(), None);
        assert_eq!(store.members("s").await.unwrap(), set(&["old"]));
        assert_eq!(store.get("v").await.unwrap(), Some(b"keep".to_vec()));
        assert_eq!(store.keys().unwrap(), vec!["s".to_string(), "v".to_string()]);
    }

    #[tokio::test]
    async fn empty_batch_is_ok() {
        let store = InMemoryKvStore::new();
        store.exec(Batch::new()).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_batches_all_land() {
        let store = Arc::new(InMemoryKvStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut batch = Batch::new();
                batch
                    .set(format!("item:{i}"), i.to_string().into_bytes())
                    .add_member("all", i.to_string());
                store.exec(batch).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.members("all").await.unwrap().len(), 16);
        assert_eq!(store.len(), 17);
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn clear_and_debug() {
        let store = InMemoryKvStore::default();
        store.set("a", b"1".to_vec()).await.unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryKvStore"));
        assert!(debug.contains("key_count"));

        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
