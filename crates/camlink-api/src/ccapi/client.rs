// CCAPI HTTP client
//
// Wraps `reqwest::Client` with camera-specific URL construction and
// error-body unwrapping. Endpoint groups (device status, shooting) are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::ccapi::capabilities::Capabilities;
use crate::error::Error;
use crate::transport::TransportConfig;

/// CCAPI error responses carry `{"message": "..."}`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Raw HTTP client for one camera's CCAPI surface.
///
/// `base_url` is the CCAPI root advertised by the camera
/// (e.g. `https://192.168.1.2:443/ccapi`). Endpoint paths returned by the
/// capability listing are absolute and resolved against its origin.
#[derive(Debug, Clone)]
pub struct CcapiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl CcapiClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: TransportConfig::default().timeout,
        }
    }

    /// The CCAPI root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The default per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve an absolute CCAPI path (`/ccapi/ver100/...`) against the
    /// camera origin.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Capability discovery ─────────────────────────────────────────

    /// GET the CCAPI root and validate it into a [`Capabilities`] map.
    pub async fn capabilities(&self, timeout: Duration) -> Result<Capabilities, Error> {
        let url = self.base_url.clone();
        let raw: serde_json::Value = self.send(Method::GET, url, None::<&()>, timeout).await?;
        Ok(Capabilities::from_value(&raw))
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET a path and deserialize the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T, Error> {
        let url = self.endpoint_url(path)?;
        self.send(Method::GET, url, None::<&()>, timeout).await
    }

    /// PUT a JSON body to a path and deserialize the response.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        timeout: Duration,
    ) -> Result<T, Error> {
        let url = self.endpoint_url(path)?;
        self.send(Method::PUT, url, Some(body), timeout).await
    }

    /// POST a JSON body to a path and deserialize the response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        timeout: Duration,
    ) -> Result<T, Error> {
        let url = self.endpoint_url(path)?;
        self.send(Method::POST, url, Some(body), timeout).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
        timeout: Duration,
    ) -> Result<T, Error> {
        debug!("{method} {url}");

        let mut builder = self.http.request(method, url).timeout(timeout);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
            } else {
                Error::Transport(e)
            }
        })?;

        parse_response(resp).await
    }
}

/// Turn a response into `T`, or an `Error::Api` carrying the vendor message.
///
/// An empty 2xx body deserializes as JSON `null`, so callers that expect
/// no content can ask for `serde_json::Value` or `()`.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map_or_else(|| format!("HTTP {}", status.as_u16()), String::from)
            });
        return Err(Error::Api {
            status: status.as_u16(),
            message,
        });
    }

    trace!(status = status.as_u16(), bytes = body.len(), "response body");

    let text = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(text).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}
