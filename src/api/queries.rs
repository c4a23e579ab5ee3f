//! Cache keys and polling policy for every endpoint the dashboard reads.

use crate::api::types::{ModuleAuthorMapping, ModuleInfo, SensorValues, StatusBoard, StatusMessage};
use crate::api::ApiClient;
use crate::config::PollingConfig;
use crate::query::{Mutation, QueryClient, QueryError, QueryOptions, Subscription};

pub const STATUSES: &str = "statuses";
pub const MESSAGES: &str = "messages";
pub const VALUES: &str = "values";
pub const RUNNING_MODULES: &str = "running_modules";
pub const INFO: &str = "info";
pub const ALL_MODULES: &str = "all_modules";
pub const MODULE_AUTHOR_MAPPING: &str = "module_author_mapping";

/// Typed entry points into the shared query cache.
///
/// Cheap to clone; every clone talks to the same cache, so two views asking
/// for the same endpoint share one poller.
#[derive(Clone)]
pub struct Queries {
  cache: QueryClient,
  api: ApiClient,
  polling: PollingConfig,
  change_module: Mutation<String>,
  set_data: Mutation<Vec<(String, String)>>,
}

impl Queries {
  pub fn new(api: ApiClient, polling: PollingConfig) -> Self {
    let cache = QueryClient::new().with_gc_time(polling.gc_time());

    let change_api = api.clone();
    let change_module = Mutation::new("change_module", move |module: String| {
      let api = change_api.clone();
      async move { api.change_module(&module).await }
    });

    let set_api = api.clone();
    let set_data = Mutation::new("set_data", move |values: Vec<(String, String)>| {
      let api = set_api.clone();
      async move { api.set_data(&values).await }
    });

    Self {
      cache,
      api,
      polling,
      change_module,
      set_data,
    }
  }

  pub fn cache(&self) -> &QueryClient {
    &self.cache
  }

  fn continuous(&self) -> QueryOptions {
    QueryOptions::continuous(self.polling.interval())
  }

  fn once(&self) -> QueryOptions {
    QueryOptions::once(self.polling.retry_count).with_retry_delay(self.polling.retry_delay())
  }

  pub fn statuses(&self) -> Result<Subscription<StatusBoard>, QueryError> {
    let api = self.api.clone();
    self.cache.subscribe(STATUSES, self.continuous(), move || {
      let api = api.clone();
      async move { api.statuses().await }
    })
  }

  /// Message log, most recent first.
  pub fn messages(&self) -> Result<Subscription<Vec<StatusMessage>>, QueryError> {
    let api = self.api.clone();
    let options = QueryOptions::continuous(self.polling.messages_interval());
    self.cache.subscribe(MESSAGES, options, move || {
      let api = api.clone();
      async move {
        let mut messages = api.messages().await?;
        messages.reverse();
        Ok::<_, crate::api::ApiError>(messages)
      }
    })
  }

  pub fn values(&self) -> Result<Subscription<SensorValues>, QueryError> {
    let api = self.api.clone();
    self.cache.subscribe(VALUES, self.continuous(), move || {
      let api = api.clone();
      async move { api.values().await }
    })
  }

  pub fn running_modules(&self) -> Result<Subscription<Vec<String>>, QueryError> {
    let api = self.api.clone();
    self.cache.subscribe(RUNNING_MODULES, self.continuous(), move || {
      let api = api.clone();
      async move { api.running_modules().await }
    })
  }

  pub fn info(&self) -> Result<Subscription<ModuleInfo>, QueryError> {
    let api = self.api.clone();
    self.cache.subscribe(INFO, self.continuous(), move || {
      let api = api.clone();
      async move { api.info().await }
    })
  }

  /// Every installed module. Fetched once per session.
  pub fn all_modules(&self) -> Result<Subscription<Vec<String>>, QueryError> {
    let api = self.api.clone();
    self.cache.subscribe(ALL_MODULES, self.once(), move || {
      let api = api.clone();
      async move { api.all_modules().await }
    })
  }

  /// Module id to display name. Fetched once per session.
  pub fn module_author_mapping(&self) -> Result<Subscription<ModuleAuthorMapping>, QueryError> {
    let api = self.api.clone();
    self.cache.subscribe(MODULE_AUTHOR_MAPPING, self.once(), move || {
      let api = api.clone();
      async move { api.module_author_mapping().await }
    })
  }

  /// POST `change_module`.
  pub fn change_module(&self) -> Mutation<String> {
    self.change_module.clone()
  }

  /// POST `set_data` with `(label, numeric string)` pairs.
  pub fn set_data(&self) -> Mutation<Vec<(String, String)>> {
    self.set_data.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::test_server::{serve, unreachable};
  use crate::config::ApiConfig;
  use axum::routing::get;
  use axum::{Json, Router};
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  fn queries(base_url: &str, polling: PollingConfig) -> Queries {
    let api = ApiClient::new(&ApiConfig {
      base_url: base_url.to_string(),
      timeout_ms: 2000,
    })
    .unwrap();
    Queries::new(api, polling)
  }

  fn fast_polling() -> PollingConfig {
    PollingConfig {
      interval_ms: 50,
      messages_interval_ms: 50,
      retry_count: 2,
      retry_delay_ms: 10,
      gc_time_secs: 300,
    }
  }

  #[tokio::test]
  async fn test_messages_are_reversed() {
    let router = Router::new().route(
      "/api/messages",
      get(|| async {
        Json(json!([
          {"author": "a", "title": "t", "content": "first"},
          {"author": "b", "title": "t", "content": "second"}
        ]))
      }),
    );
    let queries = queries(&serve(router).await, fast_polling());

    let mut messages = queries.messages().unwrap();
    messages.wait_for(|s| s.data.is_some()).await;

    let snapshot = messages.snapshot();
    let contents: Vec<&str> = snapshot
      .data()
      .unwrap()
      .iter()
      .map(|m| m.content.as_str())
      .collect();
    assert_eq!(contents, vec!["second", "first"]);
  }

  #[tokio::test]
  async fn test_views_share_one_entry_per_endpoint() {
    let router = Router::new().route(
      "/api/statuses",
      get(|| async { Json(json!({"alice": {"author": "alice", "title": "t", "content": "c"}})) }),
    );
    let queries = queries(&serve(router).await, fast_polling());

    let first = queries.statuses().unwrap();
    let second = queries.clone().statuses().unwrap();
    assert_eq!(queries.cache().subscriber_count(STATUSES), 2);

    drop(first);
    drop(second);
    assert_eq!(queries.cache().subscriber_count(STATUSES), 0);
  }

  #[tokio::test]
  async fn test_module_list_is_fetched_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let router = Router::new().route(
      "/api/all_modules",
      get(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Json(json!(["mod_a", "mod_b"])) }
      }),
    );
    let queries = queries(&serve(router).await, fast_polling());

    let mut modules = queries.all_modules().unwrap();
    modules.wait_for(|s| s.terminal).await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(modules.snapshot().data().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_unreachable_backend_surfaces_error() {
    let queries = queries(&unreachable().await, fast_polling());

    let mut mapping = queries.module_author_mapping().unwrap();
    mapping.wait_for(|s| s.terminal).await;

    let snapshot = mapping.snapshot();
    assert!(snapshot.is_error());
    assert!(snapshot.data.is_none());
    assert_eq!(snapshot.fetch_count, 3);
  }
}
