//! TTL-aware address cache.
//!
//! Entries are keyed by `hostname_family` and expire at insertion time plus
//! the smallest record TTL. Expiry is enforced lazily on read; there is no
//! background sweep.

use super::{AddressRecord, Family};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Builds the cache key for a hostname and family.
pub fn cache_key(hostname: &str, family: Family) -> String {
    format!("{}_{}", hostname, family.as_u8())
}

/// An immutable record list plus its round-robin position.
///
/// The position lives with the list, so every lookup that is served the
/// same cached entry advances the same rotation. A replaced or expired
/// entry starts over.
#[derive(Debug)]
pub struct RecordSet {
    records: Vec<AddressRecord>,
    /// `None` until the first selection.
    cursor: Mutex<Option<usize>>,
}

impl RecordSet {
    pub fn new(records: Vec<AddressRecord>) -> Arc<Self> {
        Arc::new(Self {
            records,
            cursor: Mutex::new(None),
        })
    }

    pub fn records(&self) -> &[AddressRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Smallest TTL over the records, `None` if empty.
    pub fn min_ttl(&self) -> Option<u32> {
        self.records.iter().map(|r| r.ttl).min()
    }

    /// Round-robin selection: visits 0, 1, .., n-1, 0, 1, .. on repeated calls.
    ///
    /// Cursor updates are serialized per set, so concurrent callers still
    /// observe strict rotation.
    pub fn next_round_robin(&self) -> Option<&AddressRecord> {
        if self.records.is_empty() {
            return None;
        }

        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let last = self.records.len() - 1;
        let index = match *cursor {
            None => 0,
            Some(_) if last == 0 => 0,
            Some(i) if i >= last => 0,
            Some(i) => i + 1,
        };
        *cursor = Some(index);
        self.records.get(index)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    records: Arc<RecordSet>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_stale(&self, now: Instant) -> bool {
        now >= self.expires_at || self.records.is_empty()
    }
}

/// Thread-safe address cache.
#[derive(Clone, Default)]
pub struct AddressCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl AddressCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live entry, evicting it if it has expired or is empty.
    pub fn get(&self, key: &str) -> Option<Arc<RecordSet>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_stale(now) {
                return Some(Arc::clone(&entry.records));
            }
        }
        // The read guard is released above; a concurrent refresh may have
        // replaced the entry meanwhile, so only evict what is still stale.
        self.entries.remove_if(key, |_, entry| entry.is_stale(now));
        None
    }

    /// Store `records` under `key`, replacing any previous entry.
    ///
    /// Returns the stored set, or `None` for an empty list, which is never cached.
    pub fn set(&self, key: &str, records: Vec<AddressRecord>) -> Option<Arc<RecordSet>> {
        let records = RecordSet::new(records);
        let ttl = records.min_ttl()?;
        let entry = CacheEntry {
            records: Arc::clone(&records),
            expires_at: Instant::now() + Duration::from_secs(u64::from(ttl)),
        };
        self.entries.insert(key.to_string(), entry);
        Some(records)
    }

    /// Remove one entry.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for AddressCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn record(last: u8, ttl: u32) -> AddressRecord {
        AddressRecord::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)), ttl)
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("example.com", Family::V4), "example.com_4");
        assert_eq!(cache_key("example.com", Family::V6), "example.com_6");
    }

    #[test]
    fn test_round_robin_order() {
        let set = RecordSet::new(vec![record(1, 60), record(2, 60), record(3, 60)]);
        let picked: Vec<u8> = (0..7)
            .map(|_| match set.next_round_robin().unwrap().address {
                IpAddr::V4(v4) => v4.octets()[3],
                IpAddr::V6(_) => unreachable!(),
            })
            .collect();
        assert_eq!(picked, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn test_round_robin_single_and_empty() {
        let single = RecordSet::new(vec![record(9, 60)]);
        for _ in 0..3 {
            assert_eq!(single.next_round_robin(), Some(&record(9, 60)));
        }

        let empty = RecordSet::new(Vec::new());
        assert!(empty.next_round_robin().is_none());
    }

    #[tokio::test]
    async fn test_set_and_get_shares_rotation() {
        let cache = AddressCache::new();
        let stored = cache
            .set("a.test_4", vec![record(1, 60), record(2, 60)])
            .unwrap();

        let fetched = cache.get("a.test_4").unwrap();
        assert!(Arc::ptr_eq(&stored, &fetched));

        assert_eq!(stored.next_round_robin(), Some(&record(1, 60)));
        assert_eq!(fetched.next_round_robin(), Some(&record(2, 60)));
    }

    #[test]
    fn test_empty_records_not_stored() {
        let cache = AddressCache::new();
        assert!(cache.set("empty.test_4", Vec::new()).is_none());
        assert!(cache.is_empty());
        assert!(cache.get("empty.test_4").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_uses_min_ttl() {
        let cache = AddressCache::new();
        cache.set("ttl.test_4", vec![record(1, 30), record(2, 1)]);

        assert!(cache.get("ttl.test_4").is_some());
        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(cache.get("ttl.test_4").is_some());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get("ttl.test_4").is_none());
        // Evicted on read
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_expires_immediately() {
        let cache = AddressCache::new();
        cache.set("zero.test_4", vec![record(1, 0)]);
        assert!(cache.get("zero.test_4").is_none());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let cache = AddressCache::new();
        cache.set("a.test_4", vec![record(1, 60)]);
        cache.set("b.test_4", vec![record(2, 60)]);

        assert!(cache.remove("a.test_4"));
        assert!(!cache.remove("a.test_4"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
