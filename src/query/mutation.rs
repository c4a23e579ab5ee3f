//! Fire-and-forget writes with observable pending/error state.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

type ActionFn<P, R> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<R, String>> + Send + Sync>;

/// State of a mutation, shared by every clone of it.
#[derive(Debug)]
pub struct MutationState<R> {
  /// Calls started but not yet completed
  pub in_flight: usize,
  /// Message of the most recently completed call, if it failed
  pub error: Option<String>,
  /// Result of the most recently completed successful call
  pub data: Option<Arc<R>>,
}

impl<R> MutationState<R> {
  pub fn is_pending(&self) -> bool {
    self.in_flight > 0
  }

  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }
}

impl<R> Default for MutationState<R> {
  fn default() -> Self {
    Self {
      in_flight: 0,
      error: None,
      data: None,
    }
  }
}

impl<R> Clone for MutationState<R> {
  fn clone(&self) -> Self {
    Self {
      in_flight: self.in_flight,
      error: self.error.clone(),
      data: self.data.clone(),
    }
  }
}

/// An on-demand action (typically a POST).
///
/// Calls are never queued or deduplicated: triggering [`Mutation::mutate`]
/// twice runs both concurrently. Errors are captured into state and never
/// reach the caller.
pub struct Mutation<P, R = ()> {
  name: &'static str,
  action: ActionFn<P, R>,
  state: Arc<watch::Sender<MutationState<R>>>,
}

impl<P, R> Clone for Mutation<P, R> {
  fn clone(&self) -> Self {
    Self {
      name: self.name,
      action: Arc::clone(&self.action),
      state: Arc::clone(&self.state),
    }
  }
}

impl<P, R> Mutation<P, R>
where
  P: Send + 'static,
  R: Send + Sync + 'static,
{
  pub fn new<F, Fut, E>(name: &'static str, action: F) -> Self
  where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    E: Display + 'static,
  {
    let (state, _) = watch::channel(MutationState::default());
    Self {
      name,
      action: Arc::new(move |payload| {
        action(payload)
          .map(|r| r.map_err(|e| e.to_string()))
          .boxed()
      }),
      state: Arc::new(state),
    }
  }

  /// Start the action in the background. Must be called inside a tokio
  /// runtime.
  pub fn mutate(&self, payload: P) {
    self.state.send_modify(|s| s.in_flight += 1);

    let future = (self.action)(payload);
    let state = Arc::clone(&self.state);
    let name = self.name;
    tokio::spawn(async move {
      let result = future.await;
      state.send_modify(|s| {
        s.in_flight = s.in_flight.saturating_sub(1);
        match result {
          Ok(data) => {
            s.data = Some(Arc::new(data));
            s.error = None;
          }
          Err(error) => {
            warn!(mutation = name, %error, "mutation failed");
            s.error = Some(error);
          }
        }
      });
    });
  }

  pub fn snapshot(&self) -> MutationState<R> {
    self.state.borrow().clone()
  }

  pub fn is_pending(&self) -> bool {
    self.state.borrow().is_pending()
  }

  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    self.state.borrow().is_error()
  }

  /// Receiver notified on every state transition.
  pub fn watch(&self) -> watch::Receiver<MutationState<R>> {
    self.state.subscribe()
  }
}
