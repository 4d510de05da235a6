//! Process-wide endpoint and credential configuration.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ConfigError;

/// Media type selecting the pinned API version.
pub const DEFAULT_API_VERSION: &str = "application/vnd.recurly.v2021-02-25";
pub const DEFAULT_RESPONSES_DIR: &str = "responses";
pub const DEFAULT_OPERATIONS_LOG: &str = "logs/operations.log";

/// Immutable configuration loaded once at startup and shared by reference.
///
/// `api_key` is deliberately excluded from `Debug` output.
#[derive(Clone)]
pub struct Config {
    api_key: String,
    base_url: String,
    account_id: String,
    api_version: String,
    responses_dir: PathBuf,
    operations_log: PathBuf,
}

impl Config {
    pub fn new(api_key: &str, base_url: &str, account_id: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: account_id.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            responses_dir: PathBuf::from(DEFAULT_RESPONSES_DIR),
            operations_log: PathBuf::from(DEFAULT_OPERATIONS_LOG),
        }
    }

    /// Read `API_KEY`, `BASE_URL` and `ACCOUNT_ID` (plus the optional
    /// `API_VERSION`, `RESPONSES_DIR`, `OPERATIONS_LOG`) from the environment,
    /// after loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as
    /// missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mut config = Self::new(
            &require("API_KEY")?,
            &require("BASE_URL")?,
            &require("ACCOUNT_ID")?,
        );
        if let Some(version) = get("API_VERSION") {
            config = config.with_api_version(&version);
        }
        if let Some(dir) = get("RESPONSES_DIR") {
            config = config.with_responses_dir(dir);
        }
        if let Some(log) = get("OPERATIONS_LOG") {
            config = config.with_operations_log(log);
        }
        Ok(config)
    }

    pub fn with_api_version(mut self, api_version: &str) -> Self {
        self.api_version = api_version.to_string();
        self
    }

    pub fn with_responses_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.responses_dir = dir.into();
        self
    }

    pub fn with_operations_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.operations_log = path.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn responses_dir(&self) -> &PathBuf {
        &self.responses_dir
    }

    pub fn operations_log(&self) -> &PathBuf {
        &self.operations_log
    }

    /// `Basic <base64(api_key)>`. The key is encoded on its own, without a
    /// `user:` prefix.
    pub fn authorization(&self) -> String {
        format!("Basic {}", STANDARD.encode(self.api_key.as_bytes()))
    }

    /// Headers sent with every request.
    pub fn default_headers(&self) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_string(), self.authorization()),
            ("Accept".to_string(), self.api_version.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .field("api_version", &self.api_version)
            .field("responses_dir", &self.responses_dir)
            .field("operations_log", &self.operations_log)
            .finish_non_exhaustive()
    }
}
