//! The item repository and its batch planners.
//!
//! [`plan_save`] and [`plan_delete`] are pure: given the previous and next
//! state of one item they return the exact batch that moves the store from
//! one to the other. [`ItemRepository`] does the reads around them and
//! submits the batch.

use std::sync::Arc;

use chrono::Utc;
use itemkv_store::{Batch, KvStore};
use itemkv_types::{Item, ItemDraft, ItemId};

use crate::error::{RepoError, RepoResult};
use crate::filter::ListFilter;
use crate::keys::KeySpace;

/// Build the batch that stores `item`, given what was stored before.
///
/// The batch writes the record, keeps the id in the all-items set, drops it
/// from the old type index when the type changed and from every tag index the
/// item no longer carries, and adds it to the current type and tag indexes.
/// Tags kept across the update are never removed.
pub fn plan_save(keys: &KeySpace, previous: Option<&Item>, item: &Item, record: Vec<u8>) -> Batch {
    let id = item.id.as_str();
    let mut batch = Batch::new();
    batch
        .set(keys.record(&item.id), record)
        .add_member(keys.all_items(), id);

    if let Some(prev) = previous {
        if prev.kind != item.kind {
            batch.remove_member(keys.by_type(&prev.kind), id);
        }
        for stale in prev.tags.difference(&item.tags) {
            batch.remove_member(keys.by_tag(stale), id);
        }
    }

    batch.add_member(keys.by_type(&item.kind), id);
    for tag in &item.tags {
        batch.add_member(keys.by_tag(tag), id);
    }
    batch
}

/// Build the batch that removes `item` and every index membership it has.
pub fn plan_delete(keys: &KeySpace, item: &Item) -> Batch {
    let id = item.id.as_str();
    let mut batch = Batch::new();
    batch
        .delete(keys.record(&item.id))
        .remove_member(keys.all_items(), id)
        .remove_member(keys.by_type(&item.kind), id);
    for tag in &item.tags {
        batch.remove_member(keys.by_tag(tag), id);
    }
    batch
}

fn decode(key: &str, bytes: &[u8]) -> RepoResult<Item> {
    serde_json::from_slice(bytes).map_err(|e| RepoError::CorruptRecord {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Item persistence with secondary-index maintenance.
///
/// Cheap to clone; clones share the same store handle.
#[derive(Clone)]
pub struct ItemRepository {
    store: Arc<dyn KvStore>,
    keys: KeySpace,
}

impl std::fmt::Debug for ItemRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemRepository")
            .field("keys", &self.keys)
            .finish()
    }
}

impl ItemRepository {
    pub fn new(store: Arc<dyn KvStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Round-trip to the store.
    pub async fn ping(&self) -> RepoResult<()> {
        Ok(self.store.ping().await?)
    }

    async fn find(&self, id: &ItemId) -> RepoResult<Option<Item>> {
        let key = self.keys.record(id);
        match self.store.get(&key).await? {
            Some(bytes) => decode(&key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the current record.
    pub async fn get(&self, id: &ItemId) -> RepoResult<Item> {
        self.find(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(id.clone()))
    }

    /// Store `item` and reconcile its index memberships.
    ///
    /// Reads the previously stored version first; the cost of index
    /// reconciliation is one extra read per write.
    pub async fn save(&self, item: &Item) -> RepoResult<()> {
        let previous = self.find(&item.id).await?;
        let record = serde_json::to_vec(item).map_err(|e| RepoError::Serialization(e.to_string()))?;
        let batch = plan_save(&self.keys, previous.as_ref(), item, record);
        tracing::debug!(
            id = %item.id,
            kind = %item.kind,
            replaced = previous.is_some(),
            ops = batch.len(),
            "saving item"
        );
        self.store.exec(batch).await?;
        Ok(())
    }

    /// Remove an item and every index entry pointing at it.
    ///
    /// Deleting an unknown id is [`RepoError::NotFound`], not a no-op.
    pub async fn delete(&self, id: &ItemId) -> RepoResult<Item> {
        let item = self.get(id).await?;
        let batch = plan_delete(&self.keys, &item);
        tracing::debug!(id = %id, ops = batch.len(), "deleting item");
        self.store.exec(batch).await?;
        Ok(item)
    }

    /// Items matching every filter, oldest first.
    ///
    /// Ids whose record vanished between the index read and the fetch (a
    /// concurrent delete) are skipped.
    pub async fn list(&self, filter: &ListFilter) -> RepoResult<Vec<Item>> {
        let index_keys = filter.index_keys(&self.keys);
        let ids = match index_keys.as_slice() {
            [] => self.store.members(&self.keys.all_items()).await?,
            [single] => self.store.members(single).await?,
            _ => self.store.intersect(&index_keys).await?,
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let record_keys: Vec<String> = ids
            .into_iter()
            .map(|id| self.keys.record(&ItemId::from(id)))
            .collect();
        let values = self.store.get_many(&record_keys).await?;

        let mut items = Vec::with_capacity(values.len());
        for (key, value) in record_keys.iter().zip(values) {
            match value {
                Some(bytes) => items.push(decode(key, &bytes)?),
                None => tracing::debug!(key = %key, "indexed record vanished, skipping"),
            }
        }
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    /// Validate a draft and store it as a new item.
    pub async fn create(&self, draft: ItemDraft) -> RepoResult<Item> {
        let draft = draft.validate()?;
        let item = Item::create(ItemId::generate(), draft, Utc::now());
        self.save(&item).await?;
        Ok(item)
    }

    /// Validate a draft and replace the type, tags and data of an existing
    /// item. Validation happens before the lookup.
    pub async fn update(&self, id: &ItemId, draft: ItemDraft) -> RepoResult<Item> {
        let draft = draft.validate()?;
        let mut item = self.get(id).await?;
        item.replace(draft, Utc::now());
        self.save(&item).await?;
        Ok(item)
    }
}
