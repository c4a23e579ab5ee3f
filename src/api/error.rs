//! Error types for calls against the status API.

use reqwest::StatusCode;

/// Errors returned by [`ApiClient`](super::ApiClient).
///
/// The display layer only ever shows the message; there is no per-kind
/// recovery.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// The configured base URL or a joined endpoint is not a valid URL.
  #[error("invalid API url: {0}")]
  Url(#[from] url::ParseError),

  /// The HTTP client could not be constructed.
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  /// The request did not complete (connection refused, timeout, reset).
  #[error("request to {url} failed: {source}")]
  Network {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// The server answered with a non-2xx status. The body is ignored.
  #[error("{url} returned HTTP {status}")]
  Http { url: String, status: StatusCode },

  /// The response body is not the JSON we expected.
  #[error("failed to parse response from {url}: {source}")]
  Parse {
    url: String,
    #[source]
    source: serde_json::Error,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_http_error_message() {
    let err = ApiError::Http {
      url: "http://localhost/api/values".to_string(),
      status: StatusCode::INTERNAL_SERVER_ERROR,
    };
    assert_eq!(
      err.to_string(),
      "http://localhost/api/values returned HTTP 500 Internal Server Error"
    );
  }

  #[test]
  fn test_parse_error_message_includes_cause() {
    let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
    let err = ApiError::Parse {
      url: "http://localhost/api/statuses".to_string(),
      source,
    };
    assert!(err
      .to_string()
      .starts_with("failed to parse response from http://localhost/api/statuses: "));
  }
}
