/// A single write scheduled into a [`Batch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// Store `value` at `key`, replacing whatever value was there.
    Set { key: String, value: Vec<u8> },
    /// Remove `key`, whatever it holds. Missing keys are ignored.
    Delete { key: String },
    /// Add `member` to the set at `set`, creating the set if needed.
    AddMember { set: String, member: String },
    /// Remove `member` from the set at `set`. Missing sets are ignored.
    RemoveMember { set: String, member: String },
}

impl Op {
    /// The key this operation touches.
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Delete { key } => key,
            Self::AddMember { set, .. } | Self::RemoveMember { set, .. } => set,
        }
    }
}

/// An ordered list of writes executed as one unit by [`KvStore::exec`].
///
/// Operations apply in the order they were scheduled, so a later op sees the
/// effect of an earlier one on the same key.
///
/// [`KvStore::exec`]: crate::KvStore::exec
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<Op>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(Op::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(Op::Delete { key: key.into() });
        self
    }

    pub fn add_member(&mut self, set: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.ops.push(Op::AddMember {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    pub fn remove_member(
        &mut self,
        set: impl Into<String>,
        member: impl Into<String>,
    ) -> &mut Self {
        self.ops.push(Op::RemoveMember {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl IntoIterator for Batch {
    type Item = Op;
    type IntoIter = std::vec::IntoIter<Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_order() {
        let mut batch = Batch::new();
        batch
            .set("k", b"v".to_vec())
            .add_member("s", "m")
            .remove_member("s", "old")
            .delete("gone");

        assert_eq!(batch.len(), 4);
        let keys: Vec<&str> = batch.ops().iter().map(Op::key).collect();
        assert_eq!(keys, ["k", "s", "s", "gone"]);
        assert!(matches!(batch.ops()[3], Op::Delete { .. }));
    }

    #[test]
    fn empty_batch() {
        let batch = Batch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.into_iter().count(), 0);
    }
}
