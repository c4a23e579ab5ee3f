use crate::api::error::ApiError;
use crate::api::types::{
  ChangeModuleRequest, ModuleAuthorMapping, ModuleInfo, SensorValues, StatusBoard, StatusMessage,
};
use crate::config::ApiConfig;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

/// Status API client wrapper.
///
/// Issues exactly one request per call. Retrying is the caller's business
/// (see [`crate::query`]).
#[derive(Clone, Debug)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
    let mut base_url = Url::parse(&config.base_url)?;
    // Url::join replaces the last segment unless the path ends with '/'
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .timeout(config.timeout())
      .build()
      .map_err(ApiError::Client)?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Resolve an endpoint path against the base URL.
  pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
    Ok(self.base_url.join(path.trim_start_matches('/'))?)
  }

  /// GET a path and parse the JSON body.
  pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let url = self.endpoint(path)?;
    debug!(%url, "GET");

    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|source| ApiError::Network {
        url: url.to_string(),
        source,
      })?;

    let body = check_status(&url, response)?
      .bytes()
      .await
      .map_err(|source| ApiError::Network {
        url: url.to_string(),
        source,
      })?;

    serde_json::from_slice(&body).map_err(|source| ApiError::Parse {
      url: url.to_string(),
      source,
    })
  }

  /// POST a JSON body. The response body is not inspected.
  pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
    let url = self.endpoint(path)?;
    debug!(%url, "POST");

    let response = self
      .http
      .post(url.clone())
      .json(body)
      .send()
      .await
      .map_err(|source| ApiError::Network {
        url: url.to_string(),
        source,
      })?;

    check_status(&url, response)?;
    Ok(())
  }

  pub async fn statuses(&self) -> Result<StatusBoard, ApiError> {
    self.get_json("statuses").await
  }

  pub async fn messages(&self) -> Result<Vec<StatusMessage>, ApiError> {
    self.get_json("messages").await
  }

  pub async fn values(&self) -> Result<SensorValues, ApiError> {
    self.get_json("values").await
  }

  pub async fn running_modules(&self) -> Result<Vec<String>, ApiError> {
    self.get_json("running_modules").await
  }

  pub async fn all_modules(&self) -> Result<Vec<String>, ApiError> {
    self.get_json("all_modules").await
  }

  pub async fn module_author_mapping(&self) -> Result<ModuleAuthorMapping, ApiError> {
    self.get_json("module_author_mapping").await
  }

  pub async fn info(&self) -> Result<ModuleInfo, ApiError> {
    self.get_json("info").await
  }

  /// Select the active module server-side.
  pub async fn change_module(&self, module_name: &str) -> Result<(), ApiError> {
    self
      .post_json("change_module", &ChangeModuleRequest { module_name })
      .await
  }

  /// Push simulated sensor values, sent as `label -> numeric string`.
  pub async fn set_data(&self, values: &[(String, String)]) -> Result<(), ApiError> {
    let body: Map<String, Value> = values
      .iter()
      .map(|(label, value)| (label.clone(), Value::String(value.clone())))
      .collect();
    self.post_json("set_data", &body).await
  }
}

fn check_status(url: &Url, response: Response) -> Result<Response, ApiError> {
  let status = response.status();
  if status.is_success() {
    Ok(response)
  } else {
    Err(ApiError::Http {
      url: url.to_string(),
      status,
    })
  }
}

#[cfg(test)]
pub(crate) mod test_server {
  //! Throwaway axum backend bound to an ephemeral port.

  use axum::Router;

  /// Serve `router` on 127.0.0.1 and return the API base URL.
  pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api/", addr)
  }

  /// A base URL nothing is listening on.
  pub async fn unreachable() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/", addr)
  }
}

#[cfg(test)]
mod tests {
  use super::test_server::{serve, unreachable};
  use super::*;
  use axum::extract::State;
  use axum::http::StatusCode;
  use axum::routing::{get, post};
  use axum::{Json, Router};
  use serde_json::json;
  use std::sync::{Arc, Mutex};

  fn client(base_url: &str) -> ApiClient {
    ApiClient::new(&ApiConfig {
      base_url: base_url.to_string(),
      timeout_ms: 2000,
    })
    .unwrap()
  }

  #[test]
  fn test_base_url_gets_trailing_slash() {
    let api = client("http://localhost:8000/api");
    assert_eq!(
      api.endpoint("statuses").unwrap().as_str(),
      "http://localhost:8000/api/statuses"
    );
    assert_eq!(
      api.endpoint("/values").unwrap().as_str(),
      "http://localhost:8000/api/values"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    let err = ApiClient::new(&ApiConfig {
      base_url: "not a url".to_string(),
      timeout_ms: 10,
    })
    .unwrap_err();
    assert!(matches!(err, ApiError::Url(_)));
  }

  #[tokio::test]
  async fn test_get_values() {
    let router = Router::new().route(
      "/api/values",
      get(|| async { Json(json!({"Sıcaklık": 21, "Nem": 55})) }),
    );
    let api = client(&serve(router).await);

    let values = api.values().await.unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values.readings()[0].label, "Sıcaklık");
    assert_eq!(values.readings()[0].value, "21");
  }

  #[tokio::test]
  async fn test_non_2xx_is_http_error() {
    let router = Router::new().route(
      "/api/statuses",
      get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let api = client(&serve(router).await);

    let err = api.statuses().await.unwrap_err();
    assert!(matches!(
      err,
      ApiError::Http { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
    ));
  }

  #[tokio::test]
  async fn test_malformed_json_is_parse_error() {
    let router = Router::new().route("/api/messages", get(|| async { "<html>oops</html>" }));
    let api = client(&serve(router).await);

    let err = api.messages().await.unwrap_err();
    assert!(matches!(err, ApiError::Parse { .. }));
  }

  #[tokio::test]
  async fn test_connection_refused_is_network_error() {
    let api = client(&unreachable().await);

    let err = api.running_modules().await.unwrap_err();
    assert!(matches!(err, ApiError::Network { .. }));
  }

  #[tokio::test]
  async fn test_post_bodies() {
    let seen = Arc::new(Mutex::new(Vec::<(String, serde_json::Value)>::new()));
    let router = Router::new()
      .route(
        "/api/change_module",
        post(
          |State(seen): State<Arc<Mutex<Vec<(String, serde_json::Value)>>>>,
           Json(body): Json<serde_json::Value>| async move {
            seen.lock().unwrap().push(("change_module".into(), body));
          },
        ),
      )
      .route(
        "/api/set_data",
        post(
          |State(seen): State<Arc<Mutex<Vec<(String, serde_json::Value)>>>>,
           Json(body): Json<serde_json::Value>| async move {
            seen.lock().unwrap().push(("set_data".into(), body));
          },
        ),
      )
      .with_state(seen.clone());
    let api = client(&serve(router).await);

    api.change_module("mod_a").await.unwrap();
    api
      .set_data(&[("Sıcaklık".into(), "21".into()), ("Nem".into(), "0".into())])
      .await
      .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], ("change_module".into(), json!({"module_name": "mod_a"})));
    assert_eq!(seen[1], ("set_data".into(), json!({"Sıcaklık": "21", "Nem": "0"})));
  }
}
