//! Error types shared by the parser, the publisher and the Vault client.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an upload run.
///
/// Nothing in this crate retries: every variant is terminal for the run that
/// produced it.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The INI file is missing, unreadable, or not valid UTF-8
    #[error("Failed to read config file {path:?}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The INI file violates section or line syntax
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The Vault token was rejected (HTTP 401/403)
    #[error("Vault rejected the token ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// The Vault server could not be reached or the request did not complete
    #[error("Network error talking to Vault: {0}")]
    Network(String),

    /// Vault answered with a non-success status
    #[error("Vault returned HTTP {status} for '{path}': {message}")]
    Server {
        status: u16,
        path: String,
        message: String,
    },

    /// Missing or invalid run settings
    #[error("Invalid settings: {0}")]
    Settings(String),
}

impl UploadError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        UploadError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Whether the error happened before anything was sent to Vault.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            UploadError::FileAccess { .. } | UploadError::Parse { .. } | UploadError::Settings(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;
