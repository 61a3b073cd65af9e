use crate::clock::Clock;
use crate::error::{DashError, DashResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub const DASHBOARD_KEY: &str = "dashboard";
pub const SEARCH_EPOCH_KEY: &str = "search-epoch";

/// Lifetime of the epoch marker. Dashboard and search TTLs are clamped
/// below it so entries from an older epoch never outlive the marker.
pub const SEARCH_EPOCH_TTL_SECS: u64 = 6 * 60 * 60;

/// Key for the cached dashboard payload of a given epoch.
pub fn dashboard_key(epoch: i64) -> String {
    format!("{}:{}", DASHBOARD_KEY, epoch)
}

/// Key for a cached search result. `term` is expected to be normalized
/// (trimmed, upper-cased) already.
pub fn search_key(epoch: i64, term: &str) -> String {
    format!("search:{}:{}", epoch, term)
}

/// String key/value store with per-entry expiry hints.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> DashResult<Option<String>>;
    fn put(&self, key: &str, value: String, ttl_secs: u64) -> DashResult<()>;
    fn remove(&self, key: &str) -> DashResult<()>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at_ms: i64,
}

/// Process-local backend. Entries are replaced whole, never edited in place,
/// and every `put` drops whatever has already expired.
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, StoredValue>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryCacheBackend {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn get(&self, key: &str) -> DashResult<Option<String>> {
        let now = self.clock.now_millis();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(key)
            .filter(|stored| stored.expires_at_ms > now)
            .map(|stored| stored.value.clone()))
    }

    fn put(&self, key: &str, value: String, ttl_secs: u64) -> DashResult<()> {
        let now = self.clock.now_millis();
        let ttl_ms = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let stored = StoredValue {
            value,
            expires_at_ms: now.saturating_add(ttl_ms),
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // orphaned epoch keys are never read again, so expiry is the only way out
        entries.retain(|_, stored| stored.expires_at_ms > now);
        entries.insert(key.to_string(), stored);
        Ok(())
    }

    fn remove(&self, key: &str) -> DashResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// What actually lands in the backend: the payload plus enough bookkeeping
/// to judge its age without trusting backend expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: String,
    pub created_at_ms: i64,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        let ttl_ms = i64::try_from(self.ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.created_at_ms) >= ttl_ms
    }
}

/// Memoizes dashboard and search payloads in front of a [`CacheBackend`].
///
/// Failures of any kind (backend errors, corrupt envelopes, payloads that no
/// longer deserialize) read as a miss and are only logged.
#[derive(Clone)]
pub struct DashboardCache {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
}

impl DashboardCache {
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>) -> Self {
        DashboardCache { backend, clock }
    }

    fn read_entry(&self, key: &str) -> DashResult<Option<CacheEntry>> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };
        let entry: CacheEntry =
            serde_json::from_str(&raw).map_err(|e| DashError::CacheRead(e.to_string()))?;
        if entry.key != key {
            return Err(DashError::CacheRead(format!(
                "entry for '{}' stored under '{}'",
                entry.key, key
            )));
        }
        Ok(Some(entry))
    }

    /// Stored payload for `key`, if present and younger than its TTL.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        match self.read_entry(key) {
            Ok(Some(entry)) if !entry.is_expired(self.clock.now_millis()) => {
                debug!("cache hit: {}", key);
                Some(entry.payload)
            }
            Ok(_) => {
                debug!("cache miss: {}", key);
                None
            }
            Err(e) => {
                warn!("treating cache entry '{}' as a miss: {}", key, e);
                None
            }
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = self.get_raw(key)?;
        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("cached payload for '{}' is unreadable: {}", key, e);
                None
            }
        }
    }

    /// Stores `payload` under `key` with a fresh creation time, replacing any
    /// previous entry.
    pub fn put_raw(&self, key: &str, payload: String, ttl_secs: u64) {
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            created_at_ms: self.clock.now_millis(),
            ttl_secs,
        };
        let result = serde_json::to_string(&entry)
            .map_err(|e| DashError::CacheRead(e.to_string()))
            .and_then(|raw| self.backend.put(key, raw, ttl_secs));
        if let Err(e) = result {
            warn!("could not cache '{}': {}", key, e);
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        match serde_json::to_string(value) {
            Ok(payload) => self.put_raw(key, payload, ttl_secs),
            Err(e) => warn!("could not serialize payload for '{}': {}", key, e),
        }
    }

    /// Removes `key`. Absent keys and backend failures are not errors.
    pub fn invalidate(&self, key: &str) {
        match self.backend.remove(key) {
            Ok(()) => debug!("invalidated cache entry: {}", key),
            Err(e) => warn!("could not invalidate '{}': {}", key, e),
        }
    }

    /// Current epoch; 0 until the first mutation.
    pub fn search_epoch(&self) -> i64 {
        self.get_raw(SEARCH_EPOCH_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }

    /// Orphans the cached dashboard and every cached search by moving the
    /// epoch forward. A reader that computed against the old sheet can only
    /// store its result under the old epoch, where nobody looks any more.
    pub fn invalidate_source(&self) {
        let current = self.search_epoch();
        self.invalidate(&dashboard_key(current));
        let next = self.clock.now_millis().max(current + 1);
        self.put_raw(SEARCH_EPOCH_KEY, next.to_string(), SEARCH_EPOCH_TTL_SECS);
    }
}
