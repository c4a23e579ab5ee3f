//! Snapshot and option types shared by queries and their subscribers.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for the exponential retry back-off.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// How a cache entry is kept fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Refetch every `interval` while anyone is subscribed, whatever the
  /// previous outcome. A failed tick is retried by the next tick.
  Continuous { interval: Duration },
  /// Fetch once; on failure retry up to `retry_count` times with
  /// exponential back-off starting at `retry_delay`, then stop for good.
  Once {
    retry_count: u32,
    retry_delay: Duration,
  },
}

/// Per-key query configuration. Only the first subscriber's options count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
  pub mode: FetchMode,
}

impl QueryOptions {
  pub fn continuous(interval: Duration) -> Self {
    Self {
      mode: FetchMode::Continuous { interval },
    }
  }

  pub fn once(retry_count: u32) -> Self {
    Self {
      mode: FetchMode::Once {
        retry_count,
        retry_delay: Duration::from_secs(1),
      },
    }
  }

  /// Set the base retry delay (only meaningful for fetch-once queries).
  pub fn with_retry_delay(mut self, delay: Duration) -> Self {
    if let FetchMode::Once { retry_delay, .. } = &mut self.mode {
      *retry_delay = delay;
    }
    self
  }

  pub fn is_continuous(&self) -> bool {
    matches!(self.mode, FetchMode::Continuous { .. })
  }
}

/// Back-off before retry number `attempt` (0-based): `base * 2^attempt`,
/// capped at 30 seconds.
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
  base
    .checked_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
    .unwrap_or(MAX_RETRY_DELAY)
    .min(MAX_RETRY_DELAY)
}

/// The state of one cache entry as seen by its subscribers.
#[derive(Debug)]
pub struct QuerySnapshot<T> {
  /// Last successful payload; survives later failures
  pub data: Option<Arc<T>>,
  /// True until the first response (success or final failure) arrives
  pub is_loading: bool,
  /// True while a request for this key is in flight
  pub is_fetching: bool,
  /// Message of the latest failure, cleared by the next success
  pub error: Option<String>,
  /// Completion time of the latest successful fetch
  pub last_fetched_at: Option<DateTime<Utc>>,
  /// Network calls issued for this key so far
  pub fetch_count: u32,
  /// Failed attempts since the last success
  pub failure_count: u32,
  /// A fetch-once query that has finished and will not poll again
  pub terminal: bool,
}

impl<T> QuerySnapshot<T> {
  pub fn loading() -> Self {
    Self {
      data: None,
      is_loading: true,
      is_fetching: false,
      error: None,
      last_fetched_at: None,
      fetch_count: 0,
      failure_count: 0,
      terminal: false,
    }
  }

  /// A settled snapshot holding `data`, as after one successful fetch.
  #[cfg(test)]
  pub fn from_data(data: T) -> Self {
    Self {
      data: Some(Arc::new(data)),
      is_loading: false,
      last_fetched_at: Some(Utc::now()),
      fetch_count: 1,
      ..Self::loading()
    }
  }

  /// A settled snapshot that failed before any data arrived.
  #[cfg(test)]
  pub fn from_error(message: impl Into<String>) -> Self {
    Self {
      is_loading: false,
      error: Some(message.into()),
      fetch_count: 1,
      failure_count: 1,
      ..Self::loading()
    }
  }

  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// Collapse the snapshot into the render decision every view follows.
  pub fn state(&self) -> QueryState<'_, T> {
    if self.is_loading {
      QueryState::Loading
    } else if let Some(error) = &self.error {
      QueryState::Error(error)
    } else if let Some(data) = &self.data {
      QueryState::Success(data)
    } else {
      // Every applied response leaves data or an error behind
      QueryState::Loading
    }
  }
}

impl<T> Clone for QuerySnapshot<T> {
  fn clone(&self) -> Self {
    Self {
      data: self.data.clone(),
      is_loading: self.is_loading,
      is_fetching: self.is_fetching,
      error: self.error.clone(),
      last_fetched_at: self.last_fetched_at,
      fetch_count: self.fetch_count,
      failure_count: self.failure_count,
      terminal: self.terminal,
    }
  }
}

/// Render decision for a snapshot: loading wins over error, error wins over
/// (possibly stale) data.
#[derive(Debug)]
pub enum QueryState<'a, T> {
  /// No response applied yet, including a fetch dropped on unsubscribe
  Loading,
  Success(&'a T),
  Error(&'a str),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_retry_delay_doubles_and_caps() {
    let base = Duration::from_secs(1);
    assert_eq!(retry_delay(base, 0), Duration::from_secs(1));
    assert_eq!(retry_delay(base, 1), Duration::from_secs(2));
    assert_eq!(retry_delay(base, 2), Duration::from_secs(4));
    assert_eq!(retry_delay(base, 10), Duration::from_secs(30));
    assert_eq!(retry_delay(base, 40), Duration::from_secs(30));
  }

  #[test]
  fn test_with_retry_delay_only_touches_once_mode() {
    let once = QueryOptions::once(2).with_retry_delay(Duration::from_millis(5));
    assert_eq!(
      once.mode,
      FetchMode::Once {
        retry_count: 2,
        retry_delay: Duration::from_millis(5)
      }
    );

    let continuous =
      QueryOptions::continuous(Duration::from_secs(1)).with_retry_delay(Duration::from_millis(5));
    assert!(continuous.is_continuous());
  }

  #[test]
  fn test_loading_wins_over_everything() {
    let snapshot = QuerySnapshot::<u32>::loading();
    assert!(matches!(snapshot.state(), QueryState::Loading));
  }

  #[test]
  fn test_error_wins_over_stale_data() {
    let mut snapshot = QuerySnapshot::from_data(7u32);
    snapshot.error = Some("boom".into());
    assert!(matches!(snapshot.state(), QueryState::Error("boom")));
    assert_eq!(snapshot.data(), Some(&7));
  }

  #[test]
  fn test_success_state() {
    let snapshot = QuerySnapshot::from_data(vec![1, 2, 3]);
    assert!(matches!(snapshot.state(), QueryState::Success(v) if v.len() == 3));
  }
}
