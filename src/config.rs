use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{GistLogError, GistLogResult};

pub const DEFAULT_API_BASE: &str = "https://api.github.com/gists/";
pub const DEFAULT_ACCEPT: &str = "application/vnd.github.v3+json";

const CONFIG_FILE_NAME: &str = "gistlog.toml";

/// Connection settings for the gist document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistLogConfig {
    /// Endpoint prefix; the gist id is appended verbatim.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_accept")]
    pub accept: String,
    /// GitHub refuses API calls that carry no User-Agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout. Unset means the HTTP client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

fn default_user_agent() -> String {
    format!("gistlog/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for GistLogConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            accept: default_accept(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

impl GistLogConfig {
    pub fn validate(&self) -> GistLogResult<()> {
        if self.api_base.trim().is_empty() {
            return Err(GistLogError::Config("api_base must not be empty".into()));
        }
        reqwest::Url::parse(&self.api_base).map_err(|e| {
            GistLogError::Config(format!("api_base '{}' is not a valid URL: {e}", self.api_base))
        })?;
        if self.timeout_secs == Some(0) {
            return Err(GistLogError::Config("timeout_secs must be greater than zero".into()));
        }
        Ok(())
    }

    /// Full document URL for a gist id.
    pub fn gist_url(&self, gist_id: &str) -> String {
        format!("{}{}", self.api_base, gist_id)
    }
}

/// Looks for `gistlog.toml` next to the executable, then in the working directory.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    let candidate = std::env::current_dir().ok()?.join(CONFIG_FILE_NAME);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Some(candidate);
    }
    None
}

pub fn load_config(path: &Path) -> GistLogResult<GistLogConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: GistLogConfig = toml::from_str(&content)?;
    config.validate()?;
    tracing::info!(path = %path.display(), api_base = %config.api_base, "config loaded");
    Ok(config)
}

/// Loads `gistlog.toml` when one can be found, defaults otherwise.
pub fn load_default_config() -> GistLogResult<GistLogConfig> {
    match resolve_config_path() {
        Some(path) => load_config(&path),
        None => {
            tracing::debug!("no gistlog.toml found, using defaults");
            Ok(GistLogConfig::default())
        }
    }
}

/// Token accessor for `GistLog::new`.
///
/// Reads `GISTLOG_TOKEN`, then `GITHUB_TOKEN`, after loading a `.env` file if present.
pub fn env_token() -> String {
    let _ = dotenvy::dotenv();
    ["GISTLOG_TOKEN", "GITHUB_TOKEN"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| {
            tracing::warn!("neither GISTLOG_TOKEN nor GITHUB_TOKEN is set; requests will be unauthenticated");
            String::new()
        })
}
