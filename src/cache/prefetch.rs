//! Best-effort cache warming.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use futures::future::join_all;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::request::{cached_api_request, RequestOptions};
use super::store::ApiCache;

/// A boxed future that resolves once the prefetch has been stored (or failed)
type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

type PrefetchRunner<E> = Box<dyn FnOnce(ApiCache) -> BoxFuture<Result<(), E>> + Send>;

/// One request to warm: the call plus the endpoint, params and options it
/// would be cached under.
pub struct PrefetchConfig<E> {
  endpoint: String,
  run: PrefetchRunner<E>,
}

impl<E: Send + 'static> PrefetchConfig<E> {
  pub fn new<P, F, Fut, T>(endpoint: impl Into<String>, params: &P, options: RequestOptions, api_call: F) -> Self
  where
    P: Serialize + ?Sized,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize + DeserializeOwned + Send + 'static,
  {
    let endpoint = endpoint.into();
    // Without a key the result could never be stored, so there is nothing to warm.
    let params = match serde_json::to_value(params) {
      Ok(params) => Some(params),
      Err(_) if options.cache_key.is_some() => Some(Value::Null),
      Err(e) => {
        warn!(endpoint = %endpoint, error = %e, "Prefetch params could not be fingerprinted, skipping");
        None
      }
    };
    let cache_endpoint = endpoint.clone();

    let run: PrefetchRunner<E> = Box::new(move |cache: ApiCache| {
      Box::pin(async move {
        let Some(params) = params else {
          return Ok(());
        };
        cached_api_request(&cache, api_call, &cache_endpoint, &params, &options)
          .await
          .map(|_: T| ())
      })
    });

    Self { endpoint, run }
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }
}

/// Issue every prefetch concurrently and wait for all of them to settle.
///
/// Prefetching is best effort and swallows failures intentionally: they are
/// logged at warn level and never reach the caller. The entry is simply
/// missing, and the next real request for it fetches as usual.
pub async fn prefetch_data<E: Display>(cache: &ApiCache, configs: Vec<PrefetchConfig<E>>) {
  let count = configs.len();
  let tasks = configs.into_iter().map(|config| {
    let cache = cache.clone();
    async move {
      let PrefetchConfig { endpoint, run } = config;
      if let Err(e) = run(cache).await {
        warn!(endpoint = %endpoint, error = %e, "Prefetch failed");
      }
    }
  });

  join_all(tasks).await;
  debug!(count, "Prefetch finished");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::generate_key;
  use serde_json::json;
  use std::collections::BTreeMap;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[tokio::test(start_paused = true)]
  async fn test_failures_are_swallowed() {
    let cache = ApiCache::new();
    let configs = vec![
      PrefetchConfig::new("/courses", &json!({}), RequestOptions::default(), || async {
        Ok::<_, String>(vec!["algebra".to_string()])
      }),
      PrefetchConfig::new("/grades", &json!({"student": "s1"}), RequestOptions::default(), || async {
        Err::<Vec<String>, _>("boom".to_string())
      }),
    ];

    prefetch_data(&cache, configs).await;

    assert!(cache.has(&generate_key("/courses", &json!({})).unwrap()));
    assert!(!cache.has(&generate_key("/grades", &json!({"student": "s1"})).unwrap()));
    assert_eq!(cache.size(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_prefetched_value_serves_later_request() {
    let cache = ApiCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    prefetch_data(
      &cache,
      vec![PrefetchConfig::new("/exams", &json!({"course": 4}), RequestOptions::default(), move || async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(json!([{"id": 1}]))
      })],
    )
    .await;

    let exams: Result<Value, String> = cached_api_request(
      &cache,
      || async { Ok(json!([])) },
      "/exams",
      &json!({"course": 4}),
      &RequestOptions::default(),
    )
    .await;

    assert_eq!(exams, Ok(json!([{"id": 1}])));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_waits_for_every_prefetch() {
    let cache = ApiCache::new();
    let configs: Vec<PrefetchConfig<String>> = (0..3u64)
      .map(|i| {
        PrefetchConfig::new(format!("/slow/{}", i), &json!({}), RequestOptions::default(), move || async move {
          tokio::time::sleep(std::time::Duration::from_millis(100 * (i + 1))).await;
          Ok::<_, String>(i)
        })
      })
      .collect();

    prefetch_data(&cache, configs).await;
    assert_eq!(cache.size(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_unkeyable_params_are_not_prefetched() {
    let cache = ApiCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let params: BTreeMap<(u32, u32), &str> = BTreeMap::from([((1, 2), "x")]);

    prefetch_data(
      &cache,
      vec![PrefetchConfig::new("/grades", &params, RequestOptions::default(), move || async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<u32, String>(1)
      })],
    )
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.size(), 0);
  }
}
