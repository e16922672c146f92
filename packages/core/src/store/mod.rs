//! Secret store backends.
//!
//! # Supported Backends
//!
//! - HashiCorp Vault (HTTP API, token auth)

pub mod vault;

pub use vault::{VaultClient, VaultClientConfig};

use crate::error::Result;
use crate::ini::SectionBody;
use async_trait::async_trait;

/// A remote store that accepts key-value secrets at a path.
#[async_trait]
pub trait SecretStore {
    /// Write `payload` at `path`, replacing whatever was there.
    ///
    /// Returns the response body, or `None` when the store answered without
    /// one.
    async fn write(&self, path: &str, payload: &SectionBody) -> Result<Option<serde_json::Value>>;
}
