//! OAuth client configuration
//!
//! Supports loading OAuth credentials from (in order of priority):
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON file (Google Cloud Console format)
//! 3. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Credentials filename in the config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Application name reported when none is configured
const DEFAULT_APPLICATION_NAME: &str = "gmail-wrapper";

/// OAuth client settings for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub application_name: String,
    /// API key appended to every mailbox request; empty means none
    pub developer_key: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    application_name: Option<String>,
    developer_key: Option<String>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Create credentials for a client id/secret pair
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            developer_key: String::new(),
        }
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn with_developer_key(mut self, key: impl Into<String>) -> Self {
        self.developer_key = key.into();
        self
    }

    /// The developer key, if one is configured
    pub fn api_key(&self) -> Option<&str> {
        Some(self.developer_key.as_str()).filter(|k| !k.is_empty())
    }

    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials
    /// 2. JSON file (`google-credentials.json` in the config directory)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let file: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(file);
        }

        Self::from_env()
    }

    /// Credentials embedded at build time.
    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        let mut creds = Self::new(client_id, client_secret);
        if let Some(key) = option_env!("GOOGLE_DEVELOPER_KEY") {
            creds.developer_key = key.to_string();
        }
        Some(creds)
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(file)
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(file)
    }

    fn from_credential_file(file: GoogleCredentialFile) -> Result<Self> {
        // "installed" is the desktop client type, "web" the server-side one
        let section = file
            .installed
            .or(file.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        let mut creds = Self::new(section.client_id, section.client_secret);
        if let Some(name) = file.application_name {
            creds.application_name = name;
        }
        if let Some(key) = file.developer_key {
            creds.developer_key = key;
        }
        Ok(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        let mut creds = Self::new(client_id, client_secret);
        if let Ok(name) = std::env::var("GMAIL_APPLICATION_NAME") {
            creds.application_name = name;
        }
        if let Ok(key) = std::env::var("GMAIL_DEVELOPER_KEY") {
            creds.developer_key = key;
        }
        Ok(creds)
    }

    /// Default credentials file path in the config directory
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    /// Check if credentials are available (compile-time, file, or env vars)
    pub fn is_available() -> bool {
        if Self::from_compile_time().is_some() {
            return true;
        }
        if config::config_exists(CREDENTIALS_FILE) {
            return true;
        }
        std::env::var("GMAIL_CLIENT_ID").is_ok() && std::env::var("GMAIL_CLIENT_SECRET").is_ok()
    }
}
