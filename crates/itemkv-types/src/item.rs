use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::id::ItemId;
use crate::payload::Payload;

/// A generic persisted record.
///
/// `kind` is serialized as `type`. Tags form a set: they serialize as a
/// sorted array without duplicates. `data` is opaque to everything below the
/// HTTP layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub data: Payload,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Item {
    /// Build a brand-new item from a validated draft.
    pub fn create(id: ItemId, draft: ValidDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: draft.kind,
            tags: draft.tags,
            data: draft.data,
            created_at: now,
            last_modified: now,
        }
    }

    /// Replace type, tags and data, keeping the identifier and creation time.
    pub fn replace(&mut self, draft: ValidDraft, now: DateTime<Utc>) {
        self.kind = draft.kind;
        self.tags = draft.tags;
        self.data = draft.data;
        self.last_modified = now;
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Request body for creating or replacing an item.
///
/// Unknown fields are rejected. Missing `type` and `data` are accepted by the
/// decoder and rejected by [`ItemDraft::validate`], so both report the same
/// error. `"data": null` is not missing: it stores the JSON value `null`.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemDraft {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    pub data: Option<Payload>,
}

/// `None` only when the field is absent. An explicit `null` is a payload.
fn present<'de, D>(deserializer: D) -> Result<Option<Payload>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Payload::deserialize(deserializer).map(Some)
}

impl ItemDraft {
    /// Decode a request body holding exactly one JSON object.
    pub fn from_json_slice(body: &[u8]) -> TypeResult<Self> {
        serde_json::from_slice(body).map_err(|e| TypeError::InvalidJson(e.to_string()))
    }

    /// Check required fields and normalize tags into a set.
    pub fn validate(self) -> TypeResult<ValidDraft> {
        if self.kind.trim().is_empty() {
            return Err(TypeError::EmptyType);
        }
        let data = self.data.ok_or(TypeError::MissingData)?;
        let mut tags = BTreeSet::new();
        for tag in self.tags.unwrap_or_default() {
            if tag.trim().is_empty() {
                return Err(TypeError::EmptyTag);
            }
            tags.insert(tag);
        }
        Ok(ValidDraft {
            kind: self.kind,
            tags,
            data,
        })
    }
}

/// An [`ItemDraft`] whose type is non-empty, whose data is present, and whose
/// tags are deduplicated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidDraft {
    pub kind: String,
    pub tags: BTreeSet<String>,
    pub data: Payload,
}
