// Configuration: the static token, tenant URL and target folder every upload
// needs. Values come from the environment (optionally a `.env` file loaded by
// the binaries); the token can also live in `~/.beekeeper_token`.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const TOKEN_VAR: &str = "BEEKEEPER_TOKEN";
pub const TENANT_URL_VAR: &str = "BEEKEEPER_TENANT_URL";
pub const TARGET_FOLDER_VAR: &str = "BEEKEEPER_TARGET_FOLDER_ID";
pub const TIMEOUT_VAR: &str = "BEEKEEPER_TIMEOUT_SECS";

/// Name of the token file looked up in the user's home directory.
const TOKEN_FILE: &str = ".beekeeper_token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything the upload client needs to talk to one Beekeeper tenant.
#[derive(Clone)]
pub struct Config {
    /// Sent as `Authorization: Token <token>`.
    pub token: String,
    /// Tenant base URL without trailing slash, e.g. `https://acme.beekeeper.io`.
    pub tenant_url: String,
    /// Folder under which every artifact is created.
    pub target_folder_id: String,
    /// Per-request timeout of the HTTP client.
    pub timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("tenant_url", &self.tenant_url)
            .field("target_folder_id", &self.target_folder_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn new(
        token: impl Into<String>,
        tenant_url: impl Into<String>,
        target_folder_id: impl Into<String>,
    ) -> Self {
        let tenant_url: String = tenant_url.into();
        Config {
            token: token.into(),
            tenant_url: tenant_url.trim_end_matches('/').to_string(),
            target_folder_id: target_folder_id.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Load from the process environment, falling back to the token file in
    /// the home directory when `BEEKEEPER_TOKEN` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_file = token_file_path();
        Self::from_lookup(|name| std::env::var(name).ok(), token_file.as_deref())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count
    /// as missing.
    pub fn from_lookup<F>(lookup: F, token_file: Option<&Path>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let token = match get(TOKEN_VAR) {
            Some(token) => token,
            None => token_file
                .and_then(load_token)
                .ok_or(ConfigError::Missing(TOKEN_VAR))?,
        };
        let tenant_url = get(TENANT_URL_VAR).ok_or(ConfigError::Missing(TENANT_URL_VAR))?;
        let target_folder_id =
            get(TARGET_FOLDER_VAR).ok_or(ConfigError::Missing(TARGET_FOLDER_VAR))?;

        let mut config = Config::new(token, tenant_url, target_folder_id);
        if let Some(raw) = get(TIMEOUT_VAR) {
            let secs: u64 = raw
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

/// Read a token persisted in a file; blank files are ignored.
fn load_token(path: &Path) -> Option<String> {
    let data = std::fs::read_to_string(path).ok()?;
    let token = data.trim();
    if token.is_empty() {
        None
    } else {
        tracing::debug!(path = %path.display(), "using token file");
        Some(token.to_string())
    }
}

/// Default location of the token file, if a home directory is known.
pub fn token_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|dir| dir.join(TOKEN_FILE))
}
