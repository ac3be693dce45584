use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub views: ViewsConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("unclosed variable reference '${{' (missing '}}')")]
    UnclosedVarReference,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults; `${VAR}` references are expanded
    /// before parsing.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let expanded = expand_env_vars(&contents)?;
        Ok(serde_saphyr::from_str(&expanded)?)
    }

    /// Credentials file location, resolved against the config file directory.
    pub fn credentials_path(&self, config_path: &Path) -> PathBuf {
        match &self.credentials.path {
            Some(path) => resolve_path(config_path, path),
            None => default_credentials_path(),
        }
    }
}

/// Resolve a path relative to the config file directory.
///
/// Absolute paths are returned as-is.
pub fn resolve_path(config_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    config_dir.join(path)
}

// ============================================================================
// Default Paths
// ============================================================================

/// Default state directory (relative to `$HOME`).
pub const DEFAULT_STATE_DIR: &str = ".marquee";
/// Default credentials file name (inside the state directory).
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// `$HOME/.marquee/credentials.json`, falling back to `/tmp` without `HOME`.
pub fn default_credentials_path() -> PathBuf {
    let home = match std::env::var("HOME") {
        Ok(h) => h,
        Err(_) => {
            tracing::warn!("HOME not set, using /tmp for credentials");
            "/tmp".to_string()
        }
    };
    PathBuf::from(home)
        .join(DEFAULT_STATE_DIR)
        .join(DEFAULT_CREDENTIALS_FILE)
}

// ============================================================================
// Private Helpers (Serde Defaults)
// ============================================================================

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_page_ceiling() -> u32 {
    crate::views::DEFAULT_PAGE_CEILING
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports the following syntax (shell-compatible):
/// - `${VAR}` - Required variable, errors if not set
/// - `${VAR:-default}` - Optional variable with default value
/// - `${VAR:-}` - Optional variable, empty string if not set
/// - `$$` - Escaped `$` (only needed before `{` to prevent expansion)
///
/// Nested expansion (`${VAR:-${OTHER}}`) is not supported.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                result.push('$');
            }
            Some('{') => {
                chars.next();
                let expanded = parse_var_reference(&mut chars)?;
                result.push_str(&expanded);
            }
            _ => result.push('$'),
        }
    }

    Ok(result)
}

/// Parse a variable reference after seeing `${`.
fn parse_var_reference(
    chars: &mut std::iter::Peekable<std::str::Chars>,
) -> Result<String, ConfigError> {
    let mut var_name = String::new();
    let mut default_value: Option<String> = None;
    let mut found_closing_brace = false;

    while let Some(c) = chars.next() {
        match (c, default_value.as_mut()) {
            ('}', _) => {
                found_closing_brace = true;
                break;
            }
            (':', None) if chars.peek() == Some(&'-') => {
                chars.next();
                default_value = Some(String::new());
            }
            (c, Some(default)) => default.push(c),
            (c, None) => var_name.push(c),
        }
    }

    if !found_closing_brace {
        return Err(ConfigError::UnclosedVarReference);
    }

    match std::env::var(&var_name) {
        Ok(value) => Ok(value),
        Err(_) => default_value.ok_or(ConfigError::MissingEnvVar(var_name)),
    }
}

// ============================================================================
// ApiConfig
// ============================================================================

/// Remote catalog service endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

// ============================================================================
// CredentialsConfig
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsConfig {
    /// Credentials file. Relative paths resolve against the config file.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ============================================================================
// ViewsConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ViewsConfig {
    /// Upper bound on the page count exposed by feed and search views.
    #[serde(default = "default_page_ceiling")]
    pub page_ceiling: u32,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            page_ceiling: default_page_ceiling(),
        }
    }
}
