//! Store key layout.
//!
//! ```text
//! [prefix:]item:{id}          record (JSON value)
//! [prefix:]items              set of all item ids
//! [prefix:]items:type:{type}  set of ids with that type
//! [prefix:]items:tag:{tag}    set of ids carrying that tag
//! ```
//!
//! Type and tag indexes live under different segments, so a type and a tag
//! with the same text never share a key.

use itemkv_types::ItemId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    /// A key space under `prefix`. Surrounding `:` are ignored, and an empty
    /// prefix means bare keys.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: prefix.as_ref().trim_matches(':').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, rest: std::fmt::Arguments<'_>) -> String {
        if self.prefix.is_empty() {
            rest.to_string()
        } else {
            format!("{}:{}", self.prefix, rest)
        }
    }

    pub fn record(&self, id: &ItemId) -> String {
        self.key(format_args!("item:{id}"))
    }

    pub fn all_items(&self) -> String {
        self.key(format_args!("items"))
    }

    pub fn by_type(&self, kind: &str) -> String {
        self.key(format_args!("items:type:{kind}"))
    }

    pub fn by_tag(&self, tag: &str) -> String {
        self.key(format_args!("items:tag:{tag}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_layout() {
        let keys = KeySpace::default();
        let id = ItemId::from("abc");
        assert_eq!(keys.record(&id), "item:abc");
        assert_eq!(keys.all_items(), "items");
        assert_eq!(keys.by_type("task"), "items:type:task");
        assert_eq!(keys.by_tag("red"), "items:tag:red");
    }

    #[test]
    fn prefixed_layout() {
        let keys = KeySpace::new("prod:");
        assert_eq!(keys.prefix(), "prod");
        assert_eq!(keys.record(&ItemId::from("1")), "prod:item:1");
        assert_eq!(keys.all_items(), "prod:items");
        assert_eq!(keys.by_type("t"), "prod:items:type:t");
        assert_eq!(keys.by_tag("g"), "prod:items:tag:g");
    }

    #[test]
    fn type_and_tag_keys_never_collide() {
        let keys = KeySpace::default();
        assert_ne!(keys.by_type("x"), keys.by_tag("x"));
        assert_ne!(keys.by_type("tag:x"), keys.by_tag("x"));
        assert_ne!(keys.by_tag("type:x"), keys.by_type("x"));
    }
}
