//! `reqwest`-backed client for the capture server's HTTP API.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use super::{CaptureTransport, PanelApi};
use crate::config::ServerConfig;
use crate::connection::ServerAddress;
use crate::error::{CaptureError, Result};
use crate::protocol::{
    ConfigReply, SetConfigBody, SetConfigResponse, StartCaptureResponse, StatusResponse,
    StopCaptureResponse, SystemActionBody, SystemActionResponse, SystemActionsReply,
};
use crate::request::CaptureRequest;

/// Timeouts applied to every request.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection timeout (how long to wait for the TCP handshake)
    pub connect_timeout: Duration,
    /// Request timeout (whole request, including reading the body)
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Tight timeouts for a server on the local network.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ServerConfig> for ClientConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            connect_timeout: server.connect_timeout,
            request_timeout: server.request_timeout,
        }
    }
}

/// HTTP client for one capture server.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct PanelClient {
    address: ServerAddress,
    http: Client,
}

impl PanelClient {
    /// Create a client with default timeouts.
    pub fn new(address: ServerAddress) -> Result<Self> {
        Self::with_config(address, ClientConfig::default())
    }

    /// Create a client with custom timeouts.
    pub fn with_config(address: ServerAddress, config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        tracing::debug!(
            server = %address,
            source = address.source().label(),
            "Created capture server client"
        );

        Ok(Self { address, http })
    }

    /// The server this client talks to.
    #[must_use]
    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    fn config_url(&self, name: &str) -> Result<Url> {
        let mut url = self.address.endpoint("api/config")?;
        // Push as a single segment so names are percent-encoded, never split
        url.path_segments_mut()
            .map_err(|()| CaptureError::InvalidParameter(format!("cannot address setting '{name}'")))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    async fn call<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(%method, %url, "Sending request");

        let mut builder = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = CaptureError::from(e);
                tracing::warn!(%method, %url, error = %err, "Request failed");
                return Err(err);
            }
        };

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            let err = CaptureError::from(e);
            tracing::warn!(%method, %url, error = %err, "Failed to read response body");
            err
        })?;

        decode(status, &bytes).map_err(|err| {
            tracing::warn!(%method, %url, %status, error = %err, "Unusable response");
            err
        })
    }
}

/// Parse a JSON body whatever the HTTP status; the server reports failures
/// in the body with 4xx/5xx codes.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if !status.is_success() {
        tracing::debug!(%status, "Server returned non-success status, parsing body anyway");
    }
    serde_json::from_slice(body).map_err(|e| {
        CaptureError::Transport(format!("HTTP {status}: unexpected response body: {e}"))
    })
}

#[async_trait]
impl CaptureTransport for PanelClient {
    async fn start_capture(&self, request: &CaptureRequest) -> Result<StartCaptureResponse> {
        let url = self.address.endpoint("start_capture")?;
        self.call(Method::POST, url, Some(request)).await
    }

    async fn capture_status(&self) -> Result<StatusResponse> {
        let url = self.address.endpoint("status")?;
        self.call::<(), _>(Method::GET, url, None).await
    }

    async fn stop_capture(&self) -> Result<StopCaptureResponse> {
        let url = self.address.endpoint("stop_capture")?;
        self.call::<(), _>(Method::POST, url, None).await
    }
}

#[async_trait]
impl PanelApi for PanelClient {
    async fn get_config(&self, name: &str) -> Result<ConfigReply> {
        let url = self.config_url(name)?;
        self.call::<(), _>(Method::GET, url, None).await
    }

    async fn set_config(&self, name: &str, value: &str) -> Result<SetConfigResponse> {
        let url = self.config_url(name)?;
        let body = SetConfigBody {
            value: value.to_string(),
        };
        self.call(Method::POST, url, Some(&body)).await
    }

    async fn system_actions(&self) -> Result<SystemActionsReply> {
        let url = self.address.endpoint("api/system")?;
        self.call::<(), _>(Method::GET, url, None).await
    }

    async fn run_system_action(&self, action: &str) -> Result<SystemActionResponse> {
        let url = self.address.endpoint("api/system")?;
        let body = SystemActionBody {
            action: action.to_string(),
        };
        self.call(Method::POST, url, Some(&body)).await
    }
}
