//! Key-value and set storage for itemkv.
//!
//! The store is a capability, not a database of its own: plain values
//! addressed by key, named sets of string members, set intersection, and
//! batches that apply many writes as one all-or-nothing unit. Anything that
//! offers those primitives (an in-process map, a Redis-style server) can sit
//! behind the [`KvStore`] trait.
//!
//! # Backends
//!
//! - [`InMemoryKvStore`] -- single keyspace behind a `RwLock`, for tests,
//!   embedding and the default server
//! - [`RedisKvStore`] -- Redis strings and sets, batches as `MULTI`/`EXEC`
//!
//! # Design Rules
//!
//! 1. One keyspace: a key holds either a value or a set, never both.
//! 2. A set that loses its last member ceases to exist.
//! 3. A [`Batch`] is applied completely or not at all; readers never see a
//!    partially applied batch.
//! 4. Batches are atomic but not isolated from reads issued before them.
//! 5. The store never interprets values -- they are opaque bytes.

pub mod batch;
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod traits;

pub use batch::{Batch, Op};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryKvStore;
pub use redis_store::RedisKvStore;
pub use traits::KvStore;
