//! Invalidation and introspection helpers.

use serde::Serialize;
use tracing::info;

use super::store::ApiCache;

/// Pattern that clears the whole cache.
pub const INVALIDATE_ALL: &str = "*";

/// Snapshot of what the cache currently holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
  /// Stored entries, including expired ones not yet evicted
  pub size: usize,
  /// Unexpired keys, sorted
  pub keys: Vec<String>,
  /// Hits and misses are not counted, so this is always 0
  pub hit_rate: f64,
}

/// Drop cached responses.
///
/// `"*"` clears everything. Any other pattern removes every key that
/// contains it as a plain substring (no globbing). Returns the number of
/// entries removed.
pub fn invalidate_cache(cache: &ApiCache, pattern: &str) -> usize {
  let removed = if pattern == INVALIDATE_ALL {
    cache.clear()
  } else {
    cache.delete_matching(pattern)
  };
  info!(pattern, removed, "Invalidated cache entries");
  removed
}

pub fn get_cache_stats(cache: &ApiCache) -> CacheStats {
  CacheStats {
    size: cache.size(),
    keys: cache.keys(),
    hit_rate: 0.0,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn seeded() -> ApiCache {
    let cache = ApiCache::new();
    cache.set("/users:{}", json!(1), None);
    cache.set("/users/7:{}", json!(2), None);
    cache.set("/courses:{}", json!(3), None);
    cache
  }

  #[tokio::test(start_paused = true)]
  async fn test_wildcard_clears_everything() {
    let cache = seeded();
    assert_eq!(invalidate_cache(&cache, "*"), 3);
    assert_eq!(cache.size(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_pattern_removes_only_matching_keys() {
    let cache = seeded();
    assert_eq!(invalidate_cache(&cache, "users"), 2);
    assert_eq!(cache.size(), 1);
    assert!(cache.has("/courses:{}"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_pattern_with_no_match_is_noop() {
    let cache = seeded();
    assert_eq!(invalidate_cache(&cache, "grades"), 0);
    assert_eq!(cache.size(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stats_report_keys_and_no_hit_rate() {
    let cache = seeded();
    let stats = get_cache_stats(&cache);

    assert_eq!(stats.size, 3);
    assert_eq!(stats.keys, vec!["/courses:{}", "/users/7:{}", "/users:{}"]);
    assert_eq!(stats.hit_rate, 0.0);
  }
}
