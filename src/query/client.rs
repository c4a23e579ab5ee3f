//! Keyed query cache with one poller task per key.
//!
//! Every subscriber of a key shares one [`Entry`]: one fetcher, one watch
//! channel, and at most one poller task. The poller is the only place that
//! calls the fetcher, so a key never has two requests in flight and results
//! are applied in request order.

use super::state::{retry_delay, FetchMode, QueryOptions, QuerySnapshot};
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// Default retention of unobserved entries.
const DEFAULT_GC_TIME: Duration = Duration::from_secs(300);

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Errors from the query cache itself (fetch failures live in snapshots).
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
  /// The key already holds a different payload type.
  #[error("query key {key:?} is already registered with a different type")]
  TypeMismatch { key: String },
}

/// Shared, cloneable handle to the cache.
#[derive(Clone)]
pub struct QueryClient {
  entries: Arc<Mutex<HashMap<String, Arc<dyn ErasedEntry>>>>,
  gc_time: Duration,
}

impl Default for QueryClient {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryClient {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      gc_time: DEFAULT_GC_TIME,
    }
  }

  /// Set how long an entry without subscribers is kept for reuse.
  pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
    self.gc_time = gc_time;
    self
  }

  /// Subscribe to `key`, creating the entry on first use.
  ///
  /// The first subscriber's `options` and `fetcher` define the entry; later
  /// subscribers share it and their arguments are ignored. Must be called
  /// inside a tokio runtime.
  pub fn subscribe<T, F, Fut, E>(
    &self,
    key: impl Into<String>,
    options: QueryOptions,
    fetcher: F,
  ) -> Result<Subscription<T>, QueryError>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Display + 'static,
  {
    let key = key.into();
    // Attach while holding the map lock so garbage collection cannot evict
    // the entry between lookup and subscription
    let mut entries = lock(&self.entries);
    let entry = match entries.get(&key) {
      Some(existing) => Arc::clone(existing)
        .into_any()
        .downcast::<Entry<T>>()
        .map_err(|_| QueryError::TypeMismatch { key: key.clone() })?,
      None => {
        let fetcher: FetcherFn<T> =
          Arc::new(move || fetcher().map(|r| r.map_err(|e| e.to_string())).boxed());
        let entry = Arc::new(Entry::new(key.clone(), options, fetcher));
        entries.insert(key, entry.clone());
        entry
      }
    };

    Ok(Subscription::attach(entry))
  }

  /// Current snapshot of `key` without subscribing.
  #[cfg(test)]
  pub fn snapshot<T: Send + Sync + 'static>(&self, key: &str) -> Option<QuerySnapshot<T>> {
    let entry = lock(&self.entries).get(key).cloned()?;
    let entry = entry.into_any().downcast::<Entry<T>>().ok()?;
    let snapshot = entry.state.borrow().clone();
    Some(snapshot)
  }

  /// Number of live subscribers of `key`.
  #[cfg(test)]
  pub fn subscriber_count(&self, key: &str) -> usize {
    lock(&self.entries)
      .get(key)
      .map(|entry| entry.subscriber_count())
      .unwrap_or(0)
  }

  /// Drop entries nobody has observed for longer than the gc time.
  ///
  /// Returns the number of entries removed.
  pub fn collect_garbage(&self) -> usize {
    let now = Instant::now();
    let mut entries = lock(&self.entries);
    let before = entries.len();
    entries.retain(|key, entry| {
      let keep = !entry.is_collectable(now, self.gc_time);
      if !keep {
        debug!(key = %key, "evicting idle query");
      }
      keep
    });
    before - entries.len()
  }
}

/// A live interest in one key. Dropping the last one stops polling.
pub struct Subscription<T: Send + Sync + 'static> {
  entry: Arc<Entry<T>>,
  receiver: watch::Receiver<QuerySnapshot<T>>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
  fn attach(entry: Arc<Entry<T>>) -> Self {
    let receiver = entry.state.subscribe();
    entry.add_subscriber();
    Self { entry, receiver }
  }

  /// Current state of the entry.
  pub fn snapshot(&self) -> QuerySnapshot<T> {
    self.receiver.borrow().clone()
  }

  /// Check for a state change since the last call.
  ///
  /// Returns `true` if the entry changed. Call this in the event loop tick.
  pub fn poll(&mut self) -> bool {
    match self.receiver.has_changed() {
      Ok(true) => {
        self.receiver.borrow_and_update();
        true
      }
      _ => false,
    }
  }

  /// Wait until `predicate` holds for the current snapshot.
  pub async fn wait_for(&mut self, predicate: impl FnMut(&QuerySnapshot<T>) -> bool) {
    let _ = self.receiver.wait_for(predicate).await;
  }

  /// Fetch now instead of waiting for the next tick.
  ///
  /// No-op while a request is in flight. Restarts a finished fetch-once
  /// query.
  pub fn refetch(&self) {
    self.entry.refetch();
  }
}

impl<T: Send + Sync + 'static> Clone for Subscription<T> {
  fn clone(&self) -> Self {
    Self::attach(Arc::clone(&self.entry))
  }
}

impl<T: Send + Sync + 'static> Drop for Subscription<T> {
  fn drop(&mut self) {
    self.entry.remove_subscriber();
  }
}

// ============================================================================
// Entries
// ============================================================================

/// Type-erased view of an entry, for the map and garbage collection.
trait ErasedEntry: Send + Sync {
  fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
  fn subscriber_count(&self) -> usize;
  fn is_collectable(&self, now: Instant, gc_time: Duration) -> bool;
}

struct Entry<T> {
  key: String,
  options: QueryOptions,
  fetcher: FetcherFn<T>,
  state: watch::Sender<QuerySnapshot<T>>,
  control: Mutex<Control>,
}

struct Control {
  subscribers: usize,
  /// Wake-up handle of the running poller, `None` when no poller runs.
  /// Each poller gets a fresh one so stale permits never leak into the next.
  poller: Option<Arc<Notify>>,
  idle_since: Option<Instant>,
  /// Fetch-once attempts issued so far. Outlives pollers so that
  /// resubscribing never grants a fresh retry budget; only a manual
  /// refetch resets it.
  attempts: u32,
}

/// Why a poller stopped waiting.
enum Wake {
  Tick,
  Signal,
}

impl<T: Send + Sync + 'static> Entry<T> {
  fn new(key: String, options: QueryOptions, fetcher: FetcherFn<T>) -> Self {
    let (state, _) = watch::channel(QuerySnapshot::loading());
    Self {
      key,
      options,
      fetcher,
      state,
      control: Mutex::new(Control {
        subscribers: 0,
        poller: None,
        idle_since: Some(Instant::now()),
        attempts: 0,
      }),
    }
  }

  fn add_subscriber(self: &Arc<Self>) {
    let mut control = lock(&self.control);
    control.subscribers += 1;
    control.idle_since = None;
    trace!(key = %self.key, subscribers = control.subscribers, "subscribed");

    if control.poller.is_none() && !self.state.borrow().terminal {
      self.start_poller(&mut control);
    }
  }

  fn remove_subscriber(&self) {
    let mut control = lock(&self.control);
    control.subscribers = control.subscribers.saturating_sub(1);
    trace!(key = %self.key, subscribers = control.subscribers, "unsubscribed");

    if control.subscribers == 0 {
      control.idle_since = Some(Instant::now());
      // Only wakes a poller that is parked between ticks; one that is
      // mid-request notices on its own once the request completes.
      if let Some(wake) = &control.poller {
        wake.notify_waiters();
      }
    }
  }

  fn refetch(self: &Arc<Self>) {
    let mut control = lock(&self.control);
    if self.state.borrow().is_fetching {
      return;
    }

    if let Some(wake) = control.poller.clone() {
      // A live fetch-once poller is backing off between retries and already
      // has its next attempt scheduled
      if self.options.is_continuous() {
        wake.notify_one();
      }
    } else {
      self.state.send_modify(|s| s.terminal = false);
      control.attempts = 0;
      self.start_poller(&mut control);
    }
  }

  fn start_poller(self: &Arc<Self>, control: &mut Control) {
    let wake = Arc::new(Notify::new());
    control.poller = Some(Arc::clone(&wake));
    debug!(key = %self.key, mode = ?self.options.mode, "starting poller");

    let entry = Arc::clone(self);
    tokio::spawn(async move {
      match entry.options.mode {
        FetchMode::Continuous { interval } => entry.poll_continuously(interval, &wake).await,
        FetchMode::Once {
          retry_count,
          retry_delay,
        } => entry.fetch_once(retry_count, retry_delay, &wake).await,
      }
    });
  }

  /// Keep polling while anyone is subscribed. Exits with the poller slot
  /// released.
  async fn poll_continuously(&self, interval: Duration, wake: &Notify) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      let reason = tokio::select! {
        _ = ticker.tick() => Wake::Tick,
        _ = wake.notified() => Wake::Signal,
      };

      if !self.keep_running() {
        return;
      }

      let result = self.fetch().await;
      if !self.keep_result() {
        return;
      }
      self.apply(result, false);

      if matches!(reason, Wake::Signal) {
        // A manual refetch restarts the period
        ticker.reset();
      }
    }
  }

  /// One fetch plus bounded retries, then the entry is terminal.
  ///
  /// The attempt counter lives in the entry, so a poller restarted by a new
  /// subscriber continues the budget of the one before it.
  async fn fetch_once(&self, retry_count: u32, base_delay: Duration, wake: &Notify) {
    loop {
      let Some(attempt) = self.next_attempt() else {
        return;
      };

      let result = self.fetch().await;
      // The last attempt is applied even when nobody watches: the budget is
      // spent and the entry has to end up terminal
      let last = attempt >= retry_count;
      if !last && !self.keep_result() {
        return;
      }

      match result {
        Err(error) if !last => {
          let delay = retry_delay(base_delay, attempt);
          warn!(key = %self.key, %error, attempt, ?delay, "fetch failed, retrying");
          self.state.send_modify(|s| {
            s.is_fetching = false;
            s.failure_count += 1;
          });

          tokio::select! {
            _ = time::sleep(delay) => {}
            _ = wake.notified() => {}
          }
        }
        result => {
          self.apply(result, true);
          self.release_poller();
          return;
        }
      }
    }
  }

  async fn fetch(&self) -> Result<T, String> {
    self.state.send_modify(|s| {
      s.is_fetching = true;
      s.fetch_count += 1;
    });
    (self.fetcher)().await
  }

  fn apply(&self, result: Result<T, String>, terminal: bool) {
    self.state.send_modify(|s| {
      s.is_loading = false;
      s.is_fetching = false;
      s.terminal = terminal;
      match result {
        Ok(data) => {
          s.data = Some(Arc::new(data));
          s.error = None;
          s.failure_count = 0;
          s.last_fetched_at = Some(Utc::now());
        }
        Err(error) => {
          debug!(key = %self.key, %error, "fetch failed");
          // Previous data stays: stale-while-revalidate
          s.error = Some(error);
          s.failure_count += 1;
        }
      }
    });
  }

  /// Whether the poller should continue. Releases the poller slot when not.
  fn keep_running(&self) -> bool {
    let mut control = lock(&self.control);
    if control.subscribers == 0 {
      control.poller = None;
      debug!(key = %self.key, "stopping poller");
      false
    } else {
      true
    }
  }

  /// Claim the next fetch-once attempt, or stop when nobody is subscribed.
  fn next_attempt(&self) -> Option<u32> {
    let mut control = lock(&self.control);
    if control.subscribers == 0 {
      control.poller = None;
      debug!(key = %self.key, "stopping poller");
      return None;
    }
    let attempt = control.attempts;
    control.attempts += 1;
    Some(attempt)
  }

  /// Whether a finished request should be applied.
  ///
  /// With no subscribers left the result is dropped and the poller slot
  /// released under one lock, so a poller started by a late subscriber
  /// never has its in-flight flag cleared by this one.
  fn keep_result(&self) -> bool {
    let mut control = lock(&self.control);
    if control.subscribers > 0 {
      return true;
    }
    trace!(key = %self.key, "discarding result, no subscribers left");
    self.state.send_modify(|s| s.is_fetching = false);
    control.poller = None;
    debug!(key = %self.key, "stopping poller");
    false
  }

  fn release_poller(&self) {
    lock(&self.control).poller = None;
  }
}

impl<T: Send + Sync + 'static> ErasedEntry for Entry<T> {
  fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
    self
  }

  fn subscriber_count(&self) -> usize {
    lock(&self.control).subscribers
  }

  fn is_collectable(&self, now: Instant, gc_time: Duration) -> bool {
    let control = lock(&self.control);
    control.subscribers == 0
      && control.poller.is_none()
      && control
        .idle_since
        .map(|since| now.duration_since(since) >= gc_time)
        .unwrap_or(false)
  }
}

/// Lock a mutex, recovering from poisoning (the guarded data stays valid
/// because no critical section can panic halfway through an update).
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
