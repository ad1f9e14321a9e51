//! Item repository for itemkv.
//!
//! Persists items in a [`KvStore`](itemkv_store::KvStore) and keeps three
//! families of secondary indexes consistent with them:
//!
//! - the all-items set,
//! - one set per type value,
//! - one set per tag value.
//!
//! Every write first reads the previous version of the record, computes the
//! index delta against it, and submits the record write plus all index
//! changes as a single atomic batch. After a save an identifier belongs to
//! exactly the index of its current type and the indexes of its current tags.
//!
//! # Modules
//!
//! - [`error`]: [`RepoError`] and the not-found signal
//! - [`keys`]: [`KeySpace`], the namespaced key layout
//! - [`filter`]: [`ListFilter`] for type/tag equality queries
//! - [`repository`]: [`ItemRepository`] and the batch planners
//!
//! # Concurrency
//!
//! There is no locking across calls. Two concurrent saves of the same item
//! race: the last batch to execute wins, and index cleanup computed from a
//! stale previous version may be superseded.

pub mod error;
pub mod filter;
pub mod keys;
pub mod repository;

pub use error::{RepoError, RepoResult};
pub use filter::ListFilter;
pub use keys::KeySpace;
pub use repository::{plan_delete, plan_save, ItemRepository};
