use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

/// Which side of an image the resize limit applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Constrain whichever of width and height is larger.
    #[default]
    Longest,
    Width,
    Height,
}

impl ResizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Longest => "longest",
            Self::Width => "width",
            Self::Height => "height",
        }
    }
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "longest" => Ok(Self::Longest),
            "width" => Ok(Self::Width),
            "height" => Ok(Self::Height),
            other => Err(format!(
                "unknown side `{other}`, expected one of: longest, width, height"
            )),
        }
    }
}

/// Resize settings for a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeConfig {
    pub mode: ResizeMode,
    pub limit: NonZeroU32,
}

impl ResizeConfig {
    pub fn new(mode: ResizeMode, limit: NonZeroU32) -> Self {
        Self { mode, limit }
    }
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            mode: ResizeMode::default(),
            limit: Config::DEFAULT_RESIZE_LIMIT,
        }
    }
}

/// Persisted user settings.
///
/// Field names on disk match the settings file written by the editor plugin, so an
/// existing `data.json` can be pointed at directly.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// API key for the newsletter service. Empty disables every network action.
    #[serde(rename = "APIKey")]
    pub api_key: String,
    /// Which side the resize limit constrains.
    #[serde(rename = "sidePreference")]
    pub side_preference: ResizeMode,
    /// Pixel limit for the constrained side.
    #[serde(rename = "resizeLimit")]
    pub resize_limit: NonZeroU32,
    /// Base URL of the API.
    pub endpoint: String,
}

impl Config {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.buttondown.email";
    pub const DEFAULT_RESIZE_LIMIT: NonZeroU32 = match NonZeroU32::new(1200) {
        Some(limit) => limit,
        None => unreachable!(),
    };

    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self, ConfigError> {
        loader.load().await.map_err(|source| ConfigError::Load {
            path: loader.location(),
            source,
        })
    }

    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<(), ConfigError> {
        saver.save(self).await.map_err(|source| ConfigError::Save {
            path: saver.location(),
            source,
        })
    }

    /// Whether a usable API key is configured. Whitespace-only keys count as missing.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The API key as it should be sent on the wire.
    pub fn api_key(&self) -> &str {
        self.api_key.trim()
    }

    /// Snapshot of the resize settings for one run.
    pub fn resize_config(&self) -> ResizeConfig {
        ResizeConfig::new(self.side_preference, self.resize_limit)
    }

    /// Apply `SENDRAFT_*` environment variables on top of the loaded settings.
    ///
    /// - `SENDRAFT_API_KEY`: API key
    /// - `SENDRAFT_ENDPOINT`: API base URL
    /// - `SENDRAFT_SIDE`: `longest`, `width` or `height`
    /// - `SENDRAFT_RESIZE_LIMIT`: positive pixel count
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Same as [`Config::with_env_overrides`] with a custom variable lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(key) = lookup("SENDRAFT_API_KEY") {
            self.api_key = key;
        }
        if let Some(endpoint) = lookup("SENDRAFT_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(side) = lookup("SENDRAFT_SIDE") {
            self.side_preference = side.parse().map_err(|message| ConfigError::InvalidEnv {
                var: "SENDRAFT_SIDE",
                message,
            })?;
        }
        if let Some(limit) = lookup("SENDRAFT_RESIZE_LIMIT") {
            self.resize_limit =
                limit
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidEnv {
                        var: "SENDRAFT_RESIZE_LIMIT",
                        message: e.to_string(),
                    })?;
        }
        Ok(self)
    }

    /// Default location of the settings file.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("sendraft").join("config.json"))
            .ok_or(ConfigError::NoConfigDir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            side_preference: ResizeMode::default(),
            resize_limit: Self::DEFAULT_RESIZE_LIMIT,
            endpoint: Self::DEFAULT_ENDPOINT.to_owned(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.has_api_key() { "<redacted>" } else { "<unset>" };
        f.debug_struct("Config")
            .field("api_key", &key)
            .field("side_preference", &self.side_preference)
            .field("resize_limit", &self.resize_limit)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(
        &self,
    ) -> impl Future<
        Output = core::result::Result<Config, Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;

    /// Where the data is loaded from, for error reporting.
    fn location(&self) -> PathBuf;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(
        &self,
        config: &Config,
    ) -> impl Future<
        Output = core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;

    /// Where the data is saved to, for error reporting.
    fn location(&self) -> PathBuf;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// [`Config`] data will be serialized and deserialized based on the file extension.
    /// `.json` and `.toml` are supported. Loading a file that does not exist yields the
    /// default configuration.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unsupported(&self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        Box::new(ConfigError::UnsupportedFormat {
            path: self.path.clone(),
        })
    }
}

impl Loader for FileStore {
    async fn load(
        &self,
    ) -> core::result::Result<Config, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(e.into()),
        };
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&contents)?),
            Some("toml") => Ok(toml::from_str(&contents)?),
            _ => Err(self.unsupported()),
        }
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}

impl Saver for FileStore {
    async fn save(
        &self,
        config: &Config,
    ) -> core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let contents = match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config)?,
            Some("toml") => toml::to_string_pretty(config)?,
            _ => return Err(self.unsupported()),
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}
