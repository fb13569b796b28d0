//! Windowed execution of many requests.

use std::future::Future;

use futures::future::join_all;

/// Window size used when the caller has no preference.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 5;

/// Outcome of one request in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T, E> {
  Fulfilled(T),
  Rejected(E),
}

impl<T, E> Settled<T, E> {
  pub fn is_fulfilled(&self) -> bool {
    matches!(self, Settled::Fulfilled(_))
  }

  pub fn is_rejected(&self) -> bool {
    matches!(self, Settled::Rejected(_))
  }

  pub fn value(&self) -> Option<&T> {
    match self {
      Settled::Fulfilled(value) => Some(value),
      Settled::Rejected(_) => None,
    }
  }

  pub fn reason(&self) -> Option<&E> {
    match self {
      Settled::Fulfilled(_) => None,
      Settled::Rejected(reason) => Some(reason),
    }
  }

  pub fn into_result(self) -> Result<T, E> {
    match self {
      Settled::Fulfilled(value) => Ok(value),
      Settled::Rejected(reason) => Err(reason),
    }
  }
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
  fn from(result: Result<T, E>) -> Self {
    match result {
      Ok(value) => Settled::Fulfilled(value),
      Err(reason) => Settled::Rejected(reason),
    }
  }
}

/// Await `requests` in windows of at most `max_concurrency`.
///
/// A window starts only once the previous one has fully settled. One
/// request failing never affects the others; every input gets a
/// [`Settled`] in the same position. A window of 0 is treated as 1.
pub async fn batch_api_requests<I, Fut, T, E>(requests: I, max_concurrency: usize) -> Vec<Settled<T, E>>
where
  I: IntoIterator<Item = Fut>,
  Fut: Future<Output = Result<T, E>>,
{
  let window_size = max_concurrency.max(1);
  let mut pending = requests.into_iter().peekable();
  let mut results = Vec::new();

  while pending.peek().is_some() {
    let window: Vec<Fut> = pending.by_ref().take(window_size).collect();
    results.extend(join_all(window).await.into_iter().map(Settled::from));
  }

  results
}
