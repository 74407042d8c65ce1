use async_trait::async_trait;
use rag_domain::error::{Error, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;

/// The fallback key-value store abstraction. One trait so the rate
/// limiter, memory coordinator, and session store all depend on an
/// interface rather than on `redis` directly — the in-memory
/// implementation below stands in for it in tests.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;

    /// Sliding-window rate limiting primitives, mirroring the Redis sorted-set
    /// command sequence this workspace's algorithm is built on.
    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<()>;
    async fn zcard(&self, key: &str) -> Result<u64>;
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;
    async fn zrange_withscores(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Write-queue primitives for the memory coordinator's fallback path.
    async fn lpush(&self, key: &str, value: &str) -> Result<()>;
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;
    async fn lrem(&self, key: &str, value: &str) -> Result<()>;

    /// Non-blocking pattern scan (`SCAN` on Redis, not `KEYS`, to avoid
    /// blocking the server on a large keyspace). `pattern` supports a
    /// single trailing `*` wildcard, matching the `tenant:{tid}:user:{uid}:memory:*`
    /// shape every caller in this workspace uses it for.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Redis-backed implementation. Holds a `ConnectionManager`, which
/// reconnects transparently, so a transient Redis outage surfaces as a
/// per-call error rather than a permanently broken client.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| Error::ServiceUnavailable {
            message: format!("invalid redis url: {e}"),
            details: serde_json::Value::Null,
        })?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::ServiceUnavailable {
                message: format!("redis connection failed: {e}"),
                details: serde_json::Value::Null,
            })?;
        Ok(Self { conn })
    }

    fn unavailable(e: redis::RedisError) -> Error {
        Error::ServiceUnavailable {
            message: format!("redis: {e}"),
            details: serde_json::Value::Null,
        }
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(Self::unavailable)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value, ttl.as_secs())
                .await
                .map_err(Self::unavailable),
            None => conn.set::<_, _, ()>(key, value).await.map_err(Self::unavailable),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(Self::unavailable)
    }

    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.zrembyscore::<_, _, _, ()>(key, min, max)
            .await
            .map_err(Self::unavailable)
    }

    async fn zcard(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        conn.zcard(key).await.map_err(Self::unavailable)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(key, member, score)
            .await
            .map_err(Self::unavailable)
    }

    async fn zrange_withscores(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>> {
        let mut conn = self.conn.clone();
        conn.zrange_withscores(key, start, stop)
            .await
            .map_err(Self::unavailable)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.expire::<_, ()>(key, ttl.as_secs() as i64)
            .await
            .map_err(Self::unavailable)
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(key, value).await.map_err(Self::unavailable)
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange(key, start, stop).await.map_err(Self::unavailable)
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.lrem::<_, _, ()>(key, 0, value).await.map_err(Self::unavailable)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        use futures_util::StreamExt;
        let mut conn = self.conn.clone();
        let mut iter: redis::AsyncIter<'_, String> = conn
            .scan_match(pattern)
            .await
            .map_err(Self::unavailable)?;
        let mut keys = Vec::new();
        while let Some(key) = iter.next().await {
            keys.push(key);
        }
        Ok(keys)
    }
}

/// In-memory stand-in used by tests across the workspace, so every crate
/// exercising `KvStore` semantics does not need a live Redis.
#[derive(Default)]
pub struct InMemoryKvStore {
    strings: parking_lot::Mutex<HashMap<String, String>>,
    sorted_sets: parking_lot::Mutex<HashMap<String, Vec<(String, f64)>>>,
    lists: parking_lot::Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.strings.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> Result<()> {
        self.strings.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.strings.lock().remove(key);
        Ok(())
    }

    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<()> {
        if let Some(set) = self.sorted_sets.lock().get_mut(key) {
            set.retain(|(_, score)| *score < min || *score > max);
        }
        Ok(())
    }

    async fn zcard(&self, key: &str) -> Result<u64> {
        Ok(self
            .sorted_sets
            .lock()
            .get(key)
            .map(|s| s.len() as u64)
            .unwrap_or(0))
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut sets = self.sorted_sets.lock();
        let set = sets.entry(key.to_string()).or_default();
        set.retain(|(m, _)| m != member);
        set.push((member.to_string(), score));
        set.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        Ok(())
    }

    async fn zrange_withscores(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>> {
        let sets = self.sorted_sets.lock();
        let Some(set) = sets.get(key) else {
            return Ok(Vec::new());
        };
        let len = set.len() as isize;
        let norm = |i: isize| -> isize {
            if i < 0 {
                (len + i).max(0)
            } else {
                i.min(len)
            }
        };
        let (s, e) = (norm(start), norm(stop));
        if s > e || s >= len {
            return Ok(Vec::new());
        }
        Ok(set[s as usize..=(e as usize).min(set.len().saturating_sub(1))].to_vec())
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        self.lists.lock().entry(key.to_string()).or_default().insert(0, value.to_string());
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let lists = self.lists.lock();
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        let len = list.len() as isize;
        let norm = |i: isize| -> isize {
            if i < 0 {
                (len + i).max(0)
            } else {
                i.min(len)
            }
        };
        let (s, e) = (norm(start), norm(stop));
        if s > e || s >= len {
            return Ok(Vec::new());
        }
        Ok(list[s as usize..=(e as usize).min(list.len().saturating_sub(1))].to_vec())
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<()> {
        if let Some(list) = self.lists.lock().get_mut(key) {
            list.retain(|v| v != value);
        }
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .strings
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = InMemoryKvStore::new();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn zadd_zcard_zremrangebyscore_sequence() {
        let store = InMemoryKvStore::new();
        store.zadd("z", "a", 1.0).await.unwrap();
        store.zadd("z", "b", 2.0).await.unwrap();
        store.zadd("z", "c", 3.0).await.unwrap();
        assert_eq!(store.zcard("z").await.unwrap(), 3);
        store.zremrangebyscore("z", 0.0, 1.5).await.unwrap();
        assert_eq!(store.zcard("z").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn scan_matches_the_prefix_before_the_wildcard() {
        let store = InMemoryKvStore::new();
        store.set("tenant:t1:user:u1:memory:a", "1", None).await.unwrap();
        store.set("tenant:t1:user:u1:memory:b", "2", None).await.unwrap();
        store.set("tenant:t1:user:u2:memory:c", "3", None).await.unwrap();
        let mut matched = store.scan("tenant:t1:user:u1:memory:*").await.unwrap();
        matched.sort();
        assert_eq!(
            matched,
            vec![
                "tenant:t1:user:u1:memory:a".to_string(),
                "tenant:t1:user:u1:memory:b".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn lpush_lrange_lrem_roundtrip() {
        let store = InMemoryKvStore::new();
        store.lpush("q", "first").await.unwrap();
        store.lpush("q", "second").await.unwrap();
        let all = store.lrange("q", 0, -1).await.unwrap();
        assert_eq!(all, vec!["second".to_string(), "first".to_string()]);
        store.lrem("q", "first").await.unwrap();
        assert_eq!(store.lrange("q", 0, -1).await.unwrap(), vec!["second".to_string()]);
    }
}
