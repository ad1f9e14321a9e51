use std::collections::BTreeSet;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, Pipeline, RedisError};

use crate::batch::{Batch, Op};
use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

/// Redis-backed key-value and set store.
///
/// Values are Redis strings and index sets are Redis sets. A batch runs as
/// one `MULTI`/`EXEC` transaction. Redis does not roll back a command that
/// fails inside `EXEC`, so the all-or-nothing guarantee rests on every
/// itemkv key keeping a single kind: values under item keys, sets under
/// index keys.
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    /// Connect to `url` (`redis://host:port/db`). The connection manager
    /// reconnects on its own after the first successful connect.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(|e| store_error(url, e))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| store_error(url, e))?;
        tracing::debug!("connected to redis");
        Ok(Self { conn })
    }
}

/// Translate a batch into one atomic pipeline, replies discarded.
fn batch_pipeline(batch: &Batch) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic();
    for op in batch.ops() {
        match op {
            Op::Set { key, value } => pipe.cmd("SET").arg(key).arg(value.as_slice()).ignore(),
            Op::Delete { key } => pipe.cmd("DEL").arg(key).ignore(),
            Op::AddMember { set, member } => pipe.cmd("SADD").arg(set).arg(member).ignore(),
            Op::RemoveMember { set, member } => pipe.cmd("SREM").arg(set).arg(member).ignore(),
        };
    }
    pipe
}

fn store_error(key: &str, err: RedisError) -> StoreError {
    if err.code() == Some("WRONGTYPE") {
        return StoreError::WrongType { key: key.to_string() };
    }
    if err.kind() == ErrorKind::IoError {
        return StoreError::Io(std::io::Error::other(err.to_string()));
    }
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error(key, e))?;
        Ok(value)
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error(&keys.join(","), e))?;
        Ok(values)
    }

    async fn members(&self, set: &str) -> StoreResult<BTreeSet<String>> {
        let mut conn = self.conn.clone();
        let members: BTreeSet<String> = redis::cmd("SMEMBERS")
            .arg(set)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error(set, e))?;
        Ok(members)
    }

    async fn intersect(&self, sets: &[String]) -> StoreResult<BTreeSet<String>> {
        if sets.is_empty() {
            return Ok(BTreeSet::new());
        }
        let mut conn = self.conn.clone();
        let members: BTreeSet<String> = redis::cmd("SINTER")
            .arg(sets)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error(&sets.join(","), e))?;
        Ok(members)
    }

    async fn exec(&self, batch: Batch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let first_key = batch.ops()[0].key().to_string();
        let pipe = batch_pipeline(&batch);
        let mut conn = self.conn.clone();
        let () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error(&first_key, e))?;
        tracing::trace!(ops = batch.len(), "batch applied");
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("PING", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("{needle} missing from {haystack:?}"))
    }

    #[test]
    fn batch_becomes_one_transaction() {
        let mut batch = Batch::new();
        batch
            .set("item:1", b"{}".to_vec())
            .add_member("tag:red", "1")
            .remove_member("tag:blue", "1")
            .delete("item:0");

        let packed = batch_pipeline(&batch).get_packed_pipeline();
        let text = String::from_utf8_lossy(&packed);

        let order = ["MULTI", "SET", "item:1", "SADD", "tag:red", "SREM", "tag:blue", "DEL", "item:0", "EXEC"];
        let positions: Vec<usize> = order.iter().map(|cmd| position(&text, cmd)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text:?}");
    }

    #[test]
    fn values_are_sent_as_bytes() {
        let mut batch = Batch::new();
        batch.set("k", vec![0u8, 159, 146, 150]);
        let packed = batch_pipeline(&batch).get_packed_pipeline();
        assert!(packed.windows(4).any(|w| w == [0u8, 159, 146, 150]));
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = store_error("k", RedisError::from(refused));
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        assert!(RedisKvStore::connect("not-a-url").await.is_err());
    }

    /// Runs against a live server when `ITEMKV_TEST_REDIS_URL` is set.
    #[tokio::test]
    async fn live_round_trip() {
        let Ok(url) = std::env::var("ITEMKV_TEST_REDIS_URL") else {
            return;
        };
        let store = RedisKvStore::connect(&url).await.unwrap();
        store.ping().await.unwrap();

        let ns = format!("itemkv-test-{}", std::process::id());
        let value_key = format!("{ns}:v");
        let (a, b) = (format!("{ns}:a"), format!("{ns}:b"));

        let mut batch = Batch::new();
        batch
            .set(value_key.as_str(), b"hello".to_vec())
            .add_member(a.as_str(), "1")
            .add_member(a.as_str(), "2")
            .add_member(b.as_str(), "2");
        store.exec(batch).await.unwrap();

        assert_eq!(store.get(&value_key).await.unwrap(), Some(b"hello".to_vec()));
        let both = store.intersect(&[a.clone(), b.clone()]).await.unwrap();
        assert_eq!(both.into_iter().collect::<Vec<_>>(), ["2"]);
        let many = store
            .get_many(&[value_key.clone(), format!("{ns}:missing")])
            .await
            .unwrap();
        assert_eq!(many, vec![Some(b"hello".to_vec()), None]);
        assert!(matches!(store.members(&value_key).await, Err(StoreError::WrongType { .. })));

        let mut cleanup = Batch::new();
        cleanup.delete(value_key.as_str()).delete(a.as_str()).delete(b.as_str());
        store.exec(cleanup).await.unwrap();
        assert!(store.members(&a).await.unwrap().is_empty());
    }
}
