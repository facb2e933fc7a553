//! Configuration file access for the Gmail wrapper
//!
//! Config files live in a shared directory, `<os config dir>/gmail-wrapper/`
//! by default. Setting `GMAIL_WRAPPER_CONFIG_DIR` points every lookup at a
//! different directory instead.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config directory
pub const CONFIG_DIR_ENV: &str = "GMAIL_WRAPPER_CONFIG_DIR";

/// Name of the application directory under the OS config directory
const APP_DIR: &str = "gmail-wrapper";

/// Get the config directory, honouring [`CONFIG_DIR_ENV`]
pub fn config_dir() -> Option<PathBuf> {
    let override_dir = std::env::var_os(CONFIG_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    resolve_config_dir(override_dir, dirs::config_dir())
}

/// Pick the override if present, otherwise the app directory under `base`
fn resolve_config_dir(override_dir: Option<PathBuf>, base: Option<PathBuf>) -> Option<PathBuf> {
    override_dir.or_else(|| base.map(|p| p.join(APP_DIR)))
}

/// Get the path to a file within the config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Check if a config file exists in the config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.is_file())
}

/// Load and parse a JSON file from the config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        retries: u32,
    }

    #[test]
    fn test_resolve_prefers_override() {
        let dir = resolve_config_dir(
            Some(PathBuf::from("/srv/mail")),
            Some(PathBuf::from("/home/me/.config")),
        );
        assert_eq!(dir, Some(PathBuf::from("/srv/mail")));
    }

    #[test]
    fn test_resolve_falls_back_to_app_dir() {
        let dir = resolve_config_dir(None, Some(PathBuf::from("/home/me/.config"))).unwrap();
        assert!(dir.ends_with("gmail-wrapper"));
        assert_eq!(resolve_config_dir(None, None), None);
    }

    #[test]
    fn test_load_json_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sample.json");
        std::fs::write(&path, r#"{ "name": "inbox", "retries": 3 }"#).unwrap();

        let sample: Sample = load_json_file(&path).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "inbox".to_string(),
                retries: 3
            }
        );
    }

    #[test]
    fn test_load_json_file_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing.json");

        let err = load_json_file::<Sample>(&path).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_load_json_file_rejects_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_json_file::<Sample>(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config file"));
    }
}
