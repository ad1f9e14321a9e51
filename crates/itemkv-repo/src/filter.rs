use std::collections::BTreeSet;

use crate::keys::KeySpace;

/// Equality filters for [`ItemRepository::list`](crate::ItemRepository::list).
///
/// All filters must match (AND). Blank values are dropped, so `?type=`
/// behaves like no type filter at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
    kind: Option<String>,
    tags: BTreeSet<String>,
}

impl ListFilter {
    /// Match every item.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.kind = (!kind.is_empty()).then_some(kind);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !tag.is_empty() {
            self.tags.insert(tag);
        }
        self
    }

    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tags.into_iter().fold(self, |f, tag| f.with_tag(tag))
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.tags.is_empty()
    }

    /// The index sets an item must belong to. Empty when unfiltered.
    pub fn index_keys(&self, keys: &KeySpace) -> Vec<String> {
        self.kind
            .iter()
            .map(|kind| keys.by_type(kind))
            .chain(self.tags.iter().map(|tag| keys.by_tag(tag)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered() {
        let f = ListFilter::all();
        assert!(f.is_empty());
        assert!(f.index_keys(&KeySpace::default()).is_empty());
    }

    #[test]
    fn blank_values_are_ignored() {
        let f = ListFilter::all().with_type("").with_tag("");
        assert!(f.is_empty());
    }

    #[test]
    fn duplicate_tags_collapse() {
        let f = ListFilter::all().with_tags(["red", "red", "blue"]);
        assert_eq!(f.tags().len(), 2);
    }

    #[test]
    fn index_keys_type_first() {
        let f = ListFilter::all().with_tag("red").with_type("a");
        assert_eq!(f.kind(), Some("a"));
        assert_eq!(
            f.index_keys(&KeySpace::default()),
            vec!["items:type:a".to_string(), "items:tag:red".to_string()]
        );
    }
}
