//! In-memory TTL store for fetched responses.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// How long an entry lives when the caller gives no TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
  value: Value,
  expires_at: Instant,
  /// Bumped on every `set`, so an eviction task only removes the entry it was scheduled for.
  generation: u64,
}

impl CacheEntry {
  fn is_expired(&self, now: Instant) -> bool {
    now > self.expires_at
  }
}

#[derive(Default)]
struct CacheState {
  entries: HashMap<String, CacheEntry>,
  timers: HashMap<String, AbortHandle>,
  generation: u64,
}

impl CacheState {
  fn remove(&mut self, key: &str) -> bool {
    if let Some(timer) = self.timers.remove(key) {
      timer.abort();
    }
    self.entries.remove(key).is_some()
  }
}

/// Response cache keyed by request fingerprint.
///
/// Every entry carries its own expiry. Expired entries are removed
/// proactively by a tokio task scheduled at `set` time, and lazily by `get`
/// in case that task has not run yet. Clones share the same storage, so one
/// instance is built at startup and handed to whoever needs it.
///
/// All operations take a single lock for their whole check-then-act, so
/// they never interleave with each other.
#[derive(Clone)]
pub struct ApiCache {
  state: Arc<Mutex<CacheState>>,
  default_ttl: Duration,
}

impl ApiCache {
  /// Create an empty cache with the default five minute TTL.
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(CacheState::default())),
      default_ttl: DEFAULT_TTL,
    }
  }

  /// Set the TTL used when `set` is called without one.
  pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
    self.default_ttl = ttl;
    self
  }

  pub fn default_ttl(&self) -> Duration {
    self.default_ttl
  }

  /// Get a live value.
  ///
  /// An expired entry is evicted on the spot and reported as absent.
  pub fn get(&self, key: &str) -> Option<Value> {
    let mut state = self.state.lock();
    let expired = state.entries.get(key)?.is_expired(Instant::now());
    if expired {
      state.remove(key);
      debug!(key = %key, "Evicted expired cache entry on read");
      return None;
    }
    state.entries.get(key).map(|entry| entry.value.clone())
  }

  /// Store `value` under `key`, replacing any previous entry and its eviction.
  pub fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
    let ttl = ttl.unwrap_or(self.default_ttl);
    let expires_at = Instant::now() + ttl;

    let mut state = self.state.lock();
    if let Some(previous) = state.timers.remove(key) {
      previous.abort();
    }

    state.generation += 1;
    let generation = state.generation;
    state.entries.insert(
      key.to_string(),
      CacheEntry {
        value,
        expires_at,
        generation,
      },
    );

    if let Some(timer) = self.schedule_eviction(key, generation, expires_at) {
      state.timers.insert(key.to_string(), timer);
    }
  }

  /// Remove `key` and cancel its eviction. Absent keys are ignored.
  pub fn delete(&self, key: &str) {
    self.state.lock().remove(key);
  }

  /// Remove every entry and cancel every pending eviction. Returns how many
  /// entries were dropped.
  pub fn clear(&self) -> usize {
    let mut state = self.state.lock();
    for (_, timer) in state.timers.drain() {
      timer.abort();
    }
    let removed = state.entries.len();
    state.entries.clear();
    removed
  }

  /// True if `key` holds an unexpired entry. Never evicts.
  pub fn has(&self, key: &str) -> bool {
    let now = Instant::now();
    self
      .state
      .lock()
      .entries
      .get(key)
      .is_some_and(|entry| !entry.is_expired(now))
  }

  /// Number of stored entries.
  ///
  /// This counts entries that have expired but not been evicted yet, so it
  /// is an upper bound on the live entries.
  pub fn size(&self) -> usize {
    self.state.lock().entries.len()
  }

  /// Unexpired keys, sorted.
  pub fn keys(&self) -> Vec<String> {
    let now = Instant::now();
    let state = self.state.lock();
    let mut keys: Vec<String> = state
      .entries
      .iter()
      .filter(|(_, entry)| !entry.is_expired(now))
      .map(|(key, _)| key.clone())
      .collect();
    keys.sort();
    keys
  }

  /// Delete every stored key that contains `pattern`. Returns how many went.
  pub fn delete_matching(&self, pattern: &str) -> usize {
    let mut state = self.state.lock();
    let doomed: Vec<String> = state
      .entries
      .keys()
      .filter(|key| key.contains(pattern))
      .cloned()
      .collect();
    for key in &doomed {
      state.remove(key);
    }
    doomed.len()
  }

  /// Spawn the task that evicts `key` at `deadline`.
  ///
  /// Outside a tokio runtime nothing is spawned and expiry is lazy only.
  fn schedule_eviction(&self, key: &str, generation: u64, deadline: Instant) -> Option<AbortHandle> {
    let runtime = Handle::try_current().ok()?;
    let state: Weak<Mutex<CacheState>> = Arc::downgrade(&self.state);
    let key = key.to_string();

    let task = runtime.spawn(async move {
      tokio::time::sleep_until(deadline).await;
      let Some(state) = state.upgrade() else {
        return;
      };
      let mut state = state.lock();
      let current = state
        .entries
        .get(&key)
        .is_some_and(|entry| entry.generation == generation);
      if current {
        state.entries.remove(&key);
        state.timers.remove(&key);
        debug!(key = %key, "Evicted expired cache entry");
      }
    });

    Some(task.abort_handle())
  }
}

impl Default for ApiCache {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for ApiCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ApiCache")
      .field("size", &self.size())
      .field("default_ttl", &self.default_ttl)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::generate_key;
  use serde_json::json;

  #[tokio::test(start_paused = true)]
  async fn test_set_then_get() {
    let cache = ApiCache::new();
    cache.set("k", json!({"a": 1}), None);

    assert_eq!(cache.get("k"), Some(json!({"a": 1})));
    assert!(cache.has("k"));
    assert_eq!(cache.size(), 1);
  }

  #[test]
  fn test_get_missing_is_none() {
    let cache = ApiCache::new();
    assert_eq!(cache.get("nope"), None);
    assert!(!cache.has("nope"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_entry_expires_after_ttl() {
    let cache = ApiCache::new();
    let key = generate_key("/students", &json!({"teacherId": "T1", "page": 2})).unwrap();
    cache.set(&key, json!(["ada", "grace"]), Some(Duration::from_millis(1000)));

    tokio::time::sleep(Duration::from_millis(500)).await;
    let same = generate_key("/students", &json!({"page": 2, "teacherId": "T1"})).unwrap();
    assert_eq!(cache.get(&same), Some(json!(["ada", "grace"])));

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(cache.get(&key), None);
    assert!(!cache.has(&key));
  }

  #[tokio::test(start_paused = true)]
  async fn test_timer_evicts_without_a_read() {
    let cache = ApiCache::new();
    cache.set("k", json!(1), Some(Duration::from_secs(1)));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(cache.size(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_reset_cancels_previous_eviction() {
    let cache = ApiCache::new();
    cache.set("k", json!("first"), Some(Duration::from_millis(1000)));

    tokio::time::sleep(Duration::from_millis(500)).await;
    cache.set("k", json!("second"), Some(Duration::from_millis(1000)));

    // Past the first TTL, before the second one.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(cache.size(), 1);
    assert_eq!(cache.get("k"), Some(json!("second")));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(cache.size(), 0);
  }

  #[test]
  fn test_lazy_expiry_without_runtime() {
    let cache = ApiCache::new();
    cache.set("k", json!(1), Some(Duration::ZERO));
    std::thread::sleep(std::time::Duration::from_millis(5));

    assert!(!cache.has("k"));
    // `has` only peeks
    assert_eq!(cache.size(), 1);
    assert_eq!(cache.get("k"), None);
    assert_eq!(cache.size(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_delete_and_clear() {
    let cache = ApiCache::new();
    cache.set("a", json!(1), None);
    cache.set("b", json!(2), None);
    cache.set("c", json!(3), None);

    cache.delete("a");
    cache.delete("a");
    assert_eq!(cache.size(), 2);
    assert_eq!(cache.get("a"), None);

    assert_eq!(cache.clear(), 2);
    assert_eq!(cache.size(), 0);
    assert!(cache.state.lock().timers.is_empty());
    assert_eq!(cache.clear(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_default_ttl_override() {
    let cache = ApiCache::new().with_default_ttl(Duration::from_secs(10));
    cache.set("k", json!(true), None);

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert!(cache.has("k"));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!cache.has("k"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_keys_skip_expired_entries() {
    let cache = ApiCache::new();
    cache.set("b", json!(1), None);
    cache.set("a", json!(1), None);
    cache.set("short", json!(1), Some(Duration::ZERO));
    tokio::time::advance(Duration::from_millis(1)).await;

    assert_eq!(cache.keys(), vec!["a".to_string(), "b".to_string()]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_delete_matching_is_substring_only() {
    let cache = ApiCache::new();
    cache.set("/users:{}", json!(1), None);
    cache.set("/courses:{\"owner\":\"users-team\"}", json!(2), None);
    cache.set("/exams:{}", json!(3), None);

    assert_eq!(cache.delete_matching("users"), 2);
    assert_eq!(cache.keys(), vec!["/exams:{}".to_string()]);
    assert_eq!(cache.delete_matching("u*"), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_clones_share_storage() {
    let cache = ApiCache::new();
    let other = cache.clone();
    other.set("k", json!(1), None);
    assert!(cache.has("k"));
  }
}
