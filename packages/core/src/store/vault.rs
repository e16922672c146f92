//! HashiCorp Vault backend over the HTTP API.
//!
//! # Security
//!
//! - **NO secret logging**: only paths and key counts are logged, never values
//! - **Token in header only**: sent as `X-Vault-Token`, never in the URL
//! - **TLS verification on by default**: skipping it is an explicit opt-in
//!
//! # Vault API Used
//!
//! - `POST /v1/<path>` - write a secret (body is the JSON key-value map)

use crate::error::{Result, UploadError};
use crate::ini::SectionBody;
use crate::store::SecretStore;
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Configuration for the Vault client
#[derive(Debug, Clone)]
pub struct VaultClientConfig {
    /// Server address, e.g. `https://vault.example.com:8200`
    pub server: String,

    /// Token sent with every request
    pub token: String,

    /// Skip TLS certificate verification
    pub insecure: bool,

    /// Per-request timeout, none if unset
    pub timeout: Option<Duration>,
}

impl VaultClientConfig {
    pub fn new(server: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            token: token.into(),
            insecure: false,
            timeout: None,
        }
    }
}

/// Vault client bound to one server and token.
pub struct VaultClient {
    http_client: ReqwestClient,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Error body returned by Vault on failure.
#[derive(Debug, Deserialize)]
struct VaultErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

impl VaultClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Settings`] if the HTTP client cannot be built.
    pub fn new(config: VaultClientConfig) -> Result<Self> {
        if config.insecure {
            warn!(
                server = %config.server,
                "TLS certificate verification is disabled for this Vault server"
            );
        }

        let mut builder = ReqwestClient::builder().danger_accept_invalid_certs(config.insecure);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| UploadError::Settings(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.server.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    /// Full URL for a secret path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn handle_response(path: &str, response: Response) -> Result<Option<serde_json::Value>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Network(format!("Failed to read Vault response: {}", e)))?;

        if !status.is_success() {
            return Err(error_from_status(path, status, &body));
        }

        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(None);
        }

        // The write already succeeded; a body that is not JSON is kept as text
        match serde_json::from_str(&body) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!(%path, status = status.as_u16(), error = %e, "Vault response is not JSON");
                Ok(Some(serde_json::Value::String(body)))
            }
        }
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn write(&self, path: &str, payload: &SectionBody) -> Result<Option<serde_json::Value>> {
        let url = self.url_for(path);
        debug!(%url, keys = payload.len(), "sending Vault write");

        let response = self
            .http_client
            .post(&url)
            .header(TOKEN_HEADER, &self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| UploadError::Network(describe_transport_error(&e)))?;

        Self::handle_response(path, response).await
    }
}

/// Map a non-success status to the error taxonomy.
fn error_from_status(path: &str, status: StatusCode, body: &str) -> UploadError {
    let message = vault_error_message(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UploadError::Authentication {
            status: status.as_u16(),
            message,
        },
        _ => UploadError::Server {
            status: status.as_u16(),
            path: path.to_string(),
            message,
        },
    }
}

/// Extract Vault's `errors` array, falling back to the raw body.
fn vault_error_message(body: &str) -> String {
    match serde_json::from_str::<VaultErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed.errors.join("; "),
        _ if body.trim().is_empty() => "Unknown error".to_string(),
        _ => body.trim().to_string(),
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("could not connect: {}", error)
    } else {
        error.to_string()
    }
}
