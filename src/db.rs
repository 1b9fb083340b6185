use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::object::Object;

/// One logical database: a keyspace plus expire metadata. Every entry in
/// `expires` references a key present in `dict`.
///
/// Deadlines are absolute Unix milliseconds, compared against the cached
/// clock the server cron maintains.
#[derive(Debug, Default)]
pub struct Db {
    id: usize,
    dict: HashMap<Bytes, Arc<Object>>,
    expires: HashMap<Bytes, u64>,
}

impl Db {
    pub fn new(id: usize) -> Db {
        Db {
            id,
            dict: HashMap::new(),
            expires: HashMap::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Fetch a key, lazily evicting it when its deadline has passed.
    pub fn lookup(&mut self, key: &Bytes, now_ms: u64) -> Option<Arc<Object>> {
        self.expire_check(key, now_ms);
        self.dict.get(key).cloned()
    }

    /// Insert a key that is not expected to exist yet.
    pub fn add(&mut self, key: Bytes, object: Arc<Object>) {
        self.dict.insert(key, object);
    }

    /// Replace the value of a key, keeping any expire metadata. Callers
    /// that must reset the TTL (the SET family) pair this with
    /// [`Db::remove_expire`].
    pub fn overwrite(&mut self, key: Bytes, object: Arc<Object>) {
        self.dict.insert(key, object);
    }

    /// Remove a key from both maps. Returns whether it existed.
    pub fn delete(&mut self, key: &Bytes) -> bool {
        self.expires.remove(key);
        self.dict.remove(key).is_some()
    }

    pub fn exists(&mut self, key: &Bytes, now_ms: u64) -> bool {
        self.expire_check(key, now_ms);
        self.dict.contains_key(key)
    }

    /// Attach a deadline to an existing key. A deadline on a missing key
    /// would break the expires-subset-of-dict invariant, so it is refused.
    pub fn set_expire(&mut self, key: &Bytes, deadline_ms: u64) -> bool {
        if !self.dict.contains_key(key) {
            return false;
        }
        self.expires.insert(key.clone(), deadline_ms);
        true
    }

    pub fn remove_expire(&mut self, key: &Bytes) -> bool {
        self.expires.remove(key).is_some()
    }

    /// Milliseconds until the key expires. `None` when the key has no
    /// deadline.
    pub fn ttl_ms(&self, key: &Bytes, now_ms: u64) -> Option<u64> {
        self.expires
            .get(key)
            .map(|deadline| deadline.saturating_sub(now_ms))
    }

    /// Lazy eviction: delete the key if its deadline has passed. Returns
    /// true when a delete happened.
    pub fn expire_check(&mut self, key: &Bytes, now_ms: u64) -> bool {
        let expired = self
            .expires
            .get(key)
            .is_some_and(|&deadline| deadline <= now_ms);
        if expired {
            self.expires.remove(key);
            self.dict.remove(key);
        }
        expired
    }

    /// Keys currently live, skipping entries whose deadline has passed but
    /// that no lookup has evicted yet.
    pub fn keys(&self, now_ms: u64) -> Vec<Bytes> {
        self.dict
            .keys()
            .filter(|key| match self.expires.get(*key) {
                Some(&deadline) => deadline > now_ms,
                None => true,
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Drop every key and deadline (FLUSHDB).
    pub fn clear(&mut self) {
        self.dict.clear();
        self.expires.clear();
    }
}
