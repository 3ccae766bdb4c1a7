//! # databridge HTTP Client
//!
//! Wrapper around the databridge REST API.

use databridge_core::{BlockType, DataEnvelope};
use serde_json::Value;

/// Errors from the HTTP client layer.
#[derive(Debug)]
pub enum ClientError {
    /// Cannot reach the databridge server.
    ConnectionFailed(String),
    /// 401 Unauthorized - invalid or missing API key.
    Unauthorized,
    /// 429 Too Many Requests.
    RateLimited,
    /// Server refused the request (4xx), with its error body.
    Rejected(u16, String),
    /// Server returned a 5xx error.
    ServerError(u16, String),
    /// Failed to parse response body.
    ParseError(String),
    /// The server URL cannot carry path segments.
    InvalidUrl(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(url) => write!(f, "Cannot connect to databridge at {url}"),
            Self::Unauthorized => write!(f, "Unauthorized: invalid or missing API key"),
            Self::RateLimited => write!(f, "Rate limited: too many requests"),
            Self::Rejected(status, msg) => write!(f, "Request rejected ({status}): {msg}"),
            Self::ServerError(status, msg) => write!(f, "Server error ({status}): {msg}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::InvalidUrl(msg) => write!(f, "Invalid server URL: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// HTTP client for the databridge REST API.
#[derive(Clone)]
pub struct DataBridgeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl DataBridgeClient {
    /// Create a new client pointing at the given server URL.
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Server URL with each segment appended and percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, ClientError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build a request with optional Bearer auth.
    fn request(
        &self,
        method: reqwest::Method,
        segments: &[&str],
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let mut req = self.http.request(method, self.endpoint(segments)?);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        Ok(req)
    }

    /// Check the status code and parse the JSON body.
    async fn handle_response(&self, resp: reqwest::Response) -> Result<Value, ClientError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Rejected(status.as_u16(), body));
        }
        if status.is_server_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::ServerError(status.as_u16(), body));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))
    }

    /// Send a request and handle connection errors.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        req.send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.base_url)))
    }

    /// GET /health
    pub async fn health(&self) -> Result<Value, ClientError> {
        let req = self.request(reqwest::Method::GET, &["health"])?;
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }

    /// POST /dataserver/pushdata → `true` if accepted, `false` on checksum mismatch.
    pub async fn push(&self, envelope: &DataEnvelope) -> Result<Value, ClientError> {
        let req = self
            .request(reqwest::Method::POST, &["dataserver", "pushdata"])?
            .json(envelope);
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }

    /// GET /dataserver/data/{blockType} → list of envelopes.
    pub async fn get(&self, block_type: BlockType) -> Result<Value, ClientError> {
        let block_type = block_type.to_string();
        let req = self.request(reqwest::Method::GET, &["dataserver", "data", &block_type])?;
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }

    /// PATCH /dataserver/update/{name}/{newBlockType}
    pub async fn update(&self, name: &str, block_type: BlockType) -> Result<Value, ClientError> {
        let block_type = block_type.to_string();
        let req = self.request(
            reqwest::Method::PATCH,
            &["dataserver", "update", name, &block_type],
        )?;
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }
}
