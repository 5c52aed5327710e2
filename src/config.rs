use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::auth::Token;

const CONFIG_FILE_NAME: &str = "config.json";

/// Credential configuration persisted between runs.
///
/// Field names match the on-disk JSON keys, so files written by older
/// versions of the tool keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// GitLab personal access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_token: Option<String>,

    /// GitLab instance base URL
    #[serde(default = "default_gitlab_url")]
    pub gitlab_url: String,

    /// Keys this tool does not use, written back untouched on save
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gitlab_token: None,
            gitlab_url: default_gitlab_url(),
            extra: Map::new(),
        }
    }
}

pub fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

impl Config {
    /// Returns the configured token, `None` when no token has been set.
    ///
    /// An empty string stored in the file comes back as `Some` with an empty
    /// token; it is not treated as missing.
    pub fn get_token(&self) -> Option<Token> {
        self.gitlab_token.as_deref().map(Token::from)
    }

    pub fn set_token(&mut self, token: &Token) {
        self.gitlab_token = Some(token.as_str().to_owned());
    }

    /// Applies command-line overrides on top of the loaded values.
    pub fn apply_overrides(&mut self, token: Option<&str>, url: Option<&str>) {
        if let Some(token) = token {
            self.gitlab_token = Some(token.to_owned());
        }

        if let Some(url) = url {
            self.gitlab_url = url.to_owned();
        }
    }
}

/// Reads and writes the config file inside a single directory.
///
/// The directory is resolved once at startup and handed to the store; nothing
/// else in the crate knows where the file lives.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolves the config directory.
    ///
    /// Uses `dir_override` when given, otherwise `~/.config/fulgens`.
    pub fn locate(dir_override: Option<&Path>) -> Result<Self> {
        if let Some(dir) = dir_override {
            return Ok(Self::new(dir));
        }

        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Self::new(home.join(".config").join("fulgens")))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Loads the config file.
    ///
    /// A missing file yields the default config. A file that exists but does
    /// not parse is an error.
    pub fn load(&self) -> Result<Config> {
        let path = self.path();

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))
            }
        };

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
    }

    /// Writes the config file, readable and writable by the owner only.
    ///
    /// Contents go to a temporary file in the same directory which is then
    /// renamed over the target, so readers never see a partial file.
    pub fn save(&self, config: &Config) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create config directory: {}", self.dir.display())
        })?;

        let path = self.path();
        let contents = serde_json::to_string_pretty(config)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir).with_context(|| {
            format!("Failed to create temporary file in: {}", self.dir.display())
        })?;
        restrict_permissions(temp_file.path())?;
        temp_file.write_all(contents.as_bytes())?;
        temp_file.as_file().sync_all()?;

        temp_file
            .persist(&path)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        restrict_permissions(&path)?;

        info!("Configuration saved to: {}", path.display());

        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on: {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
