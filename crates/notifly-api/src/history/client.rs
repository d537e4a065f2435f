// History API HTTP client
//
// Wraps `reqwest::Client` with URL construction, status mapping and JSON
// decoding for the notification history endpoints. The endpoint methods
// live in `notifications.rs` to keep this module focused on transport
// mechanics.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the notification history API.
///
/// Every request carries the session's bearer token. The client is cheap
/// to clone; a token rotation builds a new one.
#[derive(Clone)]
pub struct HistoryClient {
    http: reqwest::Client,
    base_url: Url,
    /// Request timeout the client was built with, when known.
    timeout: Option<Duration>,
}

impl HistoryClient {
    /// Create a client that authenticates with `token`.
    ///
    /// `base_url` is the API root, e.g. `https://console.example.com/api/`.
    /// A trailing slash is added if missing so relative joins keep the path.
    pub fn new(
        base_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_bearer_client(token)?;
        Ok(Self {
            timeout: Some(transport.timeout),
            ..Self::with_client(http, base_url)
        })
    }

    /// Create a history client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            timeout: None,
        }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a path relative to the API root.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// A request that hit the configured timeout becomes [`Error::Timeout`].
    fn transport_error(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            _ => Error::Transport(err),
        }
    }

    /// Send a GET request with query pairs and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        parse_json(resp).await
    }

    /// Send a POST request with an optional JSON body, ignoring the response body.
    pub(crate) async fn post_empty(
        &self,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<(), Error> {
        debug!("POST {}", url);

        let mut request = self.http.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().await.map_err(|e| self.transport_error(e))?;

        check_status(resp).await.map(drop)
    }

    /// Send a DELETE request, ignoring the response body.
    pub(crate) async fn delete_empty(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {}", url);

        let resp = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        check_status(resp).await.map(drop)
    }
}

/// Map the status code, then decode the body as `T`.
async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let resp = check_status(resp).await?;
    let body = resp.text().await.map_err(Error::Transport)?;

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Turn non-success statuses into typed errors.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::Authentication {
            message: format!("token rejected (HTTP {})", status.as_u16()),
        });
    }

    if !status.is_success() {
        let message = resp
            .text()
            .await
            .ok()
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_owned());
        return Err(Error::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(resp)
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
