//! Application configuration for modbind.
//!
//! User config lives at `~/.modbind/modbind.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModbindError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "modbind.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".modbind";

// ---------------------------------------------------------------------------
// Config structs (matching modbind.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host LMS settings.
    #[serde(default)]
    pub lms: LmsConfig,

    /// Content service settings.
    #[serde(default)]
    pub content_service: ContentServiceConfig,

    /// HTTP client settings shared by every client.
    #[serde(default)]
    pub http: HttpConfig,

    /// Traversal guards.
    #[serde(default)]
    pub traversal: TraversalConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[lms]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmsConfig {
    /// Base URL of the host LMS (module item sequence API).
    #[serde(default = "default_lms_base_url")]
    pub base_url: String,
}

impl Default for LmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_lms_base_url(),
        }
    }
}

fn default_lms_base_url() -> String {
    "https://ufl.instructure.com".into()
}

/// `[content_service]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentServiceConfig {
    /// Base URL of the rich-content service.
    #[serde(default = "default_content_base_url")]
    pub base_url: String,

    /// Tenant/client id embedded in API paths and session storage keys.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Alternate format requested for each page.
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for ContentServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_content_base_url(),
            client_id: default_client_id(),
            format: default_format(),
        }
    }
}

fn default_content_base_url() -> String {
    "https://prod.ally.ac".into()
}
fn default_client_id() -> String {
    "603".into()
}
fn default_format() -> String {
    "Beeline".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed when dereferencing locators.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl HttpConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    10
}

/// `[traversal]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Upper bound on resolver calls for one module.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

fn default_max_steps() -> usize {
    500
}

/// Rendered output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Markdown,
}

impl OutputFormat {
    /// File extension for documents in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "md",
        }
    }
}

/// What to do with a fetched document that has no `<main>` region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionPolicy {
    /// Fail the whole assembly.
    #[default]
    Fail,
    /// Skip the document and keep going.
    Skip,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the assembled document is written to.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Policy for documents without a `<main>` region.
    #[serde(default)]
    pub on_missing_main: RegionPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::default(),
            on_missing_main: RegionPolicy::default(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.modbind/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ModbindError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.modbind/modbind.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ModbindError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ModbindError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ModbindError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ModbindError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ModbindError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("prod.ally.ac"));
        assert!(toml_str.contains("Beeline"));
        assert!(toml_str.contains("on_missing_main = \"fail\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.content_service.client_id, "603");
        assert_eq!(parsed.http.timeout_secs, 30);
        assert_eq!(parsed.traversal.max_steps, 500);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[lms]
base_url = "https://canvas.example.edu"

[output]
format = "markdown"
on_missing_main = "skip"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.lms.base_url, "https://canvas.example.edu");
        assert_eq!(config.output.format, OutputFormat::Markdown);
        assert_eq!(config.output.on_missing_main, RegionPolicy::Skip);
        assert_eq!(config.output.dir, ".");
        assert_eq!(config.content_service.format, "Beeline");
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let toml_str = r#"
[output]
on_missing_main = "ignore"
"#;
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("modbind-definitely-missing.toml");
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ModbindError::Io { .. }));
    }
}
