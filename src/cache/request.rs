//! Cache-first wrapper around a single API call.

use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::key::generate_key;
use super::store::ApiCache;

/// Per-call caching options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
  /// When false the store is neither read nor written.
  pub use_cache: bool,
  /// Overrides the cache's default TTL for the stored result.
  pub ttl: Option<Duration>,
  /// Skip the cache read but still store the fresh result.
  pub force_refresh: bool,
  /// Use this key instead of the endpoint/params fingerprint.
  pub cache_key: Option<String>,
}

impl Default for RequestOptions {
  fn default() -> Self {
    Self {
      use_cache: true,
      ttl: None,
      force_refresh: false,
      cache_key: None,
    }
  }
}

impl RequestOptions {
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  pub fn force_refresh(mut self) -> Self {
    self.force_refresh = true;
    self
  }

  pub fn no_cache(mut self) -> Self {
    self.use_cache = false;
    self
  }

  pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
    self.cache_key = Some(key.into());
    self
  }
}

/// Run `api_call` through the cache.
///
/// 1. With caching on and no forced refresh, a live entry for the key is
///    returned without calling `api_call`
/// 2. Otherwise `api_call` runs and, with caching on, its result is stored
/// 3. Errors from `api_call` are returned untouched and never stored
///
/// Params that cannot be fingerprinted (and have no explicit `cache_key`)
/// bypass the cache entirely, with a warning.
///
/// Identical requests that miss concurrently will each call `api_call`;
/// there is no coalescing of in-flight requests.
pub async fn cached_api_request<T, E, P, F, Fut>(
  cache: &ApiCache,
  api_call: F,
  endpoint: &str,
  params: &P,
  options: &RequestOptions,
) -> Result<T, E>
where
  T: Serialize + DeserializeOwned,
  P: Serialize + ?Sized,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  if !options.use_cache {
    return api_call().await;
  }

  let key = match &options.cache_key {
    Some(key) => key.clone(),
    None => match generate_key(endpoint, params) {
      Ok(key) => key,
      Err(e) => {
        warn!(endpoint, error = %e, "Request params could not be fingerprinted, skipping cache");
        return api_call().await;
      }
    },
  };

  if !options.force_refresh {
    if let Some(cached) = cache.get(&key) {
      match serde_json::from_value::<T>(cached) {
        Ok(data) => {
          debug!(key = %key, "Cache hit");
          return Ok(data);
        }
        Err(e) => debug!(key = %key, error = %e, "Cached payload has a different shape, refetching"),
      }
    } else {
      debug!(key = %key, "Cache miss");
    }
  }

  let data = api_call().await?;

  match serde_json::to_value(&data) {
    Ok(value) => cache.set(&key, value, options.ttl),
    Err(e) => warn!(key = %key, error = %e, "Response could not be cached"),
  }

  Ok(data)
}
