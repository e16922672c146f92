// Vault Uploader Settings Module
//
// Resolves the server, namespace, environment and token for a run from CLI
// flags, an optional YAML settings file, and interactive prompts.

use crate::error::{Result, UploadError};
use crate::store::VaultClientConfig;
use dialoguer::{theme::ColorfulTheme, Input, Password};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SERVER_PROMPT: &str = "Server Address";
pub const NAMESPACE_PROMPT: &str = "Application Namespace";
pub const ENVIRONMENT_PROMPT: &str = "Application Environment";
pub const TOKEN_PROMPT: &str = "Vault Token";

/// Settings file contents, every field optional
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    /// Vault server address
    pub server: Option<String>,

    /// Application namespace
    pub namespace: Option<String>,

    /// Application environment (pilot, prod, ...)
    pub environment: Option<String>,

    /// Vault token
    pub token: Option<String>,

    /// Skip TLS certificate verification
    pub insecure: Option<bool>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl SettingsFile {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            UploadError::Settings(format!("Failed to read settings file {:?}: {}", path, e))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            UploadError::Settings(format!("Failed to parse settings file {:?}: {}", path, e))
        })
    }

    /// `~/.config/vault-uploader/config.yaml`
    pub fn global_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| {
            home.join(".config")
                .join("vault-uploader")
                .join("config.yaml")
        })
    }

    /// Load the explicit settings file, or the global one if it exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            return Self::from_file(path).map(Some);
        }

        match Self::global_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "using global settings file");
                Self::from_file(&path).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// Settings gathered so far; missing values are prompted for.
#[derive(Debug, Default, Clone)]
pub struct PartialSettings {
    pub server: Option<String>,
    pub namespace: Option<String>,
    pub environment: Option<String>,
    pub token: Option<String>,
    pub insecure: bool,
    pub timeout_secs: Option<u64>,
}

impl PartialSettings {
    /// Fill values not already set from a settings file.
    pub fn with_file(mut self, file: SettingsFile) -> Self {
        self.server = self.server.or(file.server);
        self.namespace = self.namespace.or(file.namespace);
        self.environment = self.environment.or(file.environment);
        self.token = self.token.or(file.token);
        self.insecure = self.insecure || file.insecure.unwrap_or(false);
        self.timeout_secs = self.timeout_secs.or(file.timeout_secs);
        self
    }

    /// Prompt for whatever is still missing, then validate.
    pub fn resolve(self, prompter: &dyn Prompter) -> Result<UploadSettings> {
        let server = present_or_prompt(self.server, || prompter.input(SERVER_PROMPT))?;
        let namespace = present_or_prompt(self.namespace, || prompter.input(NAMESPACE_PROMPT))?;
        let environment =
            present_or_prompt(self.environment, || prompter.input(ENVIRONMENT_PROMPT))?;
        let token = present_or_prompt(self.token, || prompter.secret(TOKEN_PROMPT))?;

        let settings = UploadSettings {
            server: server.trim().to_string(),
            namespace: namespace.trim().to_string(),
            environment: environment.trim().to_string(),
            token: token.trim().to_string(),
            insecure: self.insecure,
            timeout: self.timeout_secs.map(Duration::from_secs),
        };

        settings.validate()?;
        Ok(settings)
    }
}

fn present_or_prompt<F>(value: Option<String>, prompt: F) -> Result<String>
where
    F: FnOnce() -> Result<String>,
{
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => prompt(),
    }
}

/// Fully resolved settings for one upload run
#[derive(Clone)]
pub struct UploadSettings {
    pub server: String,
    pub namespace: String,
    pub environment: String,
    pub token: String,
    pub insecure: bool,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for UploadSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSettings")
            .field("server", &self.server)
            .field("namespace", &self.namespace)
            .field("environment", &self.environment)
            .field("token", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl UploadSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.server.is_empty() {
            return Err(UploadError::Settings("Server address cannot be empty".to_string()));
        }

        if !(self.server.starts_with("http://") || self.server.starts_with("https://")) {
            return Err(UploadError::Settings(format!(
                "Server address must start with http:// or https://, got '{}'",
                self.server
            )));
        }

        if self.namespace.is_empty() {
            return Err(UploadError::Settings("Namespace cannot be empty".to_string()));
        }

        if self.environment.is_empty() {
            return Err(UploadError::Settings("Environment cannot be empty".to_string()));
        }

        if self.token.is_empty() {
            return Err(UploadError::Settings("Vault token cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn vault_client_config(&self) -> VaultClientConfig {
        VaultClientConfig {
            server: self.server.clone(),
            token: self.token.clone(),
            insecure: self.insecure,
            timeout: self.timeout,
        }
    }
}

/// Source of values the user did not pass on the command line.
pub trait Prompter {
    fn input(&self, prompt: &str) -> Result<String>;

    /// Like [`Prompter::input`], without echoing what is typed.
    fn secret(&self, prompt: &str) -> Result<String>;
}

/// Prompts on the terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(|e| UploadError::Settings(format!("Failed to read '{}': {}", prompt, e)))
    }

    fn secret(&self, prompt: &str) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact()
            .map_err(|e| UploadError::Settings(format!("Failed to read '{}': {}", prompt, e)))
    }
}

/// Never prompts; any missing value is an error.
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn input(&self, prompt: &str) -> Result<String> {
        Err(UploadError::Settings(format!(
            "Missing value for '{}' and prompting is disabled",
            prompt
        )))
    }

    fn secret(&self, prompt: &str) -> Result<String> {
        self.input(prompt)
    }
}
