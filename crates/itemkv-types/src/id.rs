use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a stored item.
///
/// Freshly generated identifiers are UUID v7 strings, so they sort by creation
/// time. Identifiers arriving from clients are treated as opaque strings: an
/// identifier this service never issued is simply not found.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generate a new time-ordered identifier (UUID v7).
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (first 8 characters).
    pub fn short_id(&self) -> &str {
        let end = self.0.char_indices().nth(8).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.short_id())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = ItemId::generate();
        let b = ItemId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_parse_as_uuid() {
        let id = ItemId::generate();
        let parsed = uuid::Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn short_id_handles_short_strings() {
        assert_eq!(ItemId::from("abc").short_id(), "abc");
        assert_eq!(ItemId::from("0123456789").short_id(), "01234567");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ItemId::from("item-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"item-1\"");
        let back: ItemId = serde_json::from_str("\"item-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_and_debug() {
        let id = ItemId::from("0123456789abcdef");
        assert_eq!(id.to_string(), "0123456789abcdef");
        assert_eq!(format!("{id:?}"), "ItemId(01234567)");
    }
}
