//! Vault Uploader - publish the sections of an INI config file as secrets in
//! HashiCorp Vault.
//!
//! Each section of the file is written to `<namespace>/<environment>/<section>`
//! with the section's key-value pairs, after default-section entries have been
//! merged in.

pub mod config;
pub mod error;
pub mod ini;
pub mod publisher;
pub mod store;

pub use error::{Result, UploadError};
