//! HTTP transport for remote-write pushes.

use tracing::debug;

use crate::error::{ExportError, ExportResult};

const USER_AGENT: &str = concat!("metricgate/", env!("CARGO_PKG_VERSION"));

/// POSTs compressed `WriteRequest` bodies to one endpoint.
#[derive(Clone)]
pub struct RemoteWriteClient {
    url: String,
    username: Option<String>,
    password: Option<String>,
    http: reqwest::Client,
}

impl RemoteWriteClient {
    /// Basic auth is sent when `username` is set.
    pub fn new(
        url: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> ExportResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            username,
            password,
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one snappy-compressed protobuf body. Any 2xx is success.
    pub async fn send(&self, body: Vec<u8>) -> ExportResult<()> {
        let bytes = body.len();
        let mut request = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_ENCODING, "snappy")
            .header(reqwest::header::CONTENT_TYPE, "application/x-protobuf")
            .header("X-Prometheus-Remote-Write-Version", "0.1.0")
            .body(body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            debug!(url = %self.url, bytes, %status, "remote write accepted");
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ExportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
