//! Configuration file and environment overrides.
//!
//! Configuration is layered: built-in defaults, then the YAML file, then
//! `SQL_DIFF_*` environment variables. Command-line flags are applied last
//! by the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sql_diff_core::{Dialect, DiffOptions, OptionsError};
use tracing::{debug, warn};

/// File name searched in the working directory and in `$HOME`.
pub const CONFIG_FILE_NAME: &str = ".sql-diff-config.yaml";

/// Environment variable enabling the AI layer (`true` or `1`).
pub const ENV_AI_ENABLED: &str = "SQL_DIFF_AI_ENABLED";
/// Environment variable selecting the AI provider.
pub const ENV_AI_PROVIDER: &str = "SQL_DIFF_AI_PROVIDER";
/// Environment variable holding the AI API key.
pub const ENV_AI_API_KEY: &str = "SQL_DIFF_AI_API_KEY";
/// Environment variable holding the AI endpoint.
pub const ENV_AI_ENDPOINT: &str = "SQL_DIFF_AI_ENDPOINT";
/// Environment variable holding the AI model.
pub const ENV_AI_MODEL: &str = "SQL_DIFF_AI_MODEL";
/// Environment variable holding the AI timeout in seconds.
pub const ENV_AI_TIMEOUT: &str = "SQL_DIFF_AI_TIMEOUT";
/// Environment variable selecting the default dialect.
pub const ENV_DIALECT: &str = "SQL_DIFF_DIALECT";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// `init` would overwrite an existing file.
    #[error("config file already exists: {} (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),

    /// Reading or writing the file failed.
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid YAML for this schema.
    #[error("invalid config file {}: {source}", .path.display())]
    Yaml {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },

    /// Serializing the configuration failed.
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// Diff options out of range.
    #[error(transparent)]
    Options(#[from] OptionsError),

    /// A setting is missing or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ================================================================
// AI settings
// ================================================================

/// Settings of the optional AI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Whether analysis runs after each diff.
    pub enabled: bool,
    /// Provider name, `deepseek` or `openai`.
    pub provider: String,
    /// Bearer token sent to the provider.
    pub api_key: String,
    /// Base URL; `/chat/completions` is appended.
    pub api_endpoint: String,
    /// Model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "deepseek".to_string(),
            api_key: String::new(),
            api_endpoint: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            timeout: 30,
        }
    }
}

/// Masks an API key for display, keeping at most four characters at each
/// end.
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

// ================================================================
// Configuration
// ================================================================

/// Effective configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AI layer settings.
    pub ai: AiConfig,
    /// Default diff options.
    pub diff: DiffOptions,
    /// Default dialect name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
}

impl Config {
    /// Finds the configuration file: `explicit` if given, else
    /// [`CONFIG_FILE_NAME`] in `cwd`, else in `home`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when `explicit` does not exist.
    pub fn locate(
        explicit: Option<&Path>,
        cwd: &Path,
        home: Option<&Path>,
    ) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = explicit {
            return if path.is_file() {
                Ok(Some(path.to_path_buf()))
            } else {
                Err(ConfigError::NotFound(path.to_path_buf()))
            };
        }
        let found = std::iter::once(cwd)
            .chain(home)
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|path| path.is_file());
        Ok(found)
    }

    /// Loads defaults, the located file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be found, read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        let home = std::env::var_os("HOME").map(PathBuf::from);

        let mut config = match Self::locate(explicit, &cwd, home.as_deref())? {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration");
                Self::from_file(&path)?
            }
            None => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Reads a YAML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `SQL_DIFF_*` variables read through `lookup`. Empty values are
    /// ignored, as is a timeout that is not a number.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(value) = get(ENV_AI_ENABLED) {
            self.ai.enabled = value == "true" || value == "1";
        }
        if let Some(value) = get(ENV_AI_PROVIDER) {
            self.ai.provider = value;
        }
        if let Some(value) = get(ENV_AI_API_KEY) {
            self.ai.api_key = value;
        }
        if let Some(value) = get(ENV_AI_ENDPOINT) {
            self.ai.api_endpoint = value;
        }
        if let Some(value) = get(ENV_AI_MODEL) {
            self.ai.model = value;
        }
        if let Some(value) = get(ENV_AI_TIMEOUT) {
            match value.parse() {
                Ok(timeout) => self.ai.timeout = timeout,
                Err(_) => warn!(value = %value, "Ignoring non-numeric {ENV_AI_TIMEOUT}"),
            }
        }
        if let Some(value) = get(ENV_DIALECT) {
            self.dialect = Some(value);
        }
    }

    /// Applies the command line dialect selection over the file and
    /// environment: a name replaces the configured dialect, and a
    /// descriptor file clears it.
    pub fn apply_dialect_flags(&mut self, name: Option<&str>, descriptor_file: bool) {
        if let Some(name) = name {
            self.dialect = Some(name.to_string());
        } else if descriptor_file {
            self.dialect = None;
        }
    }

    /// Checks the configuration before use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when AI is enabled without an API
    /// key or endpoint, or the dialect is unknown, and
    /// [`ConfigError::Options`] for out-of-range diff options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.enabled {
            if self.ai.api_key.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "AI is enabled but no API key is set (config ai.api_key or {ENV_AI_API_KEY})"
                )));
            }
            if self.ai.api_endpoint.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "AI is enabled but no endpoint is set (config ai.api_endpoint or {ENV_AI_ENDPOINT})"
                )));
            }
        }
        if let Some(name) = &self.dialect {
            if Dialect::from_name(name).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "unknown dialect '{name}', expected one of: {}",
                    Dialect::BUILTIN.join(", ")
                )));
            }
        }
        self.diff.validate()?;
        Ok(())
    }

    /// Copy with the API key masked, for display.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        config.ai.api_key = mask_key(&config.ai.api_key);
        config
    }

    /// Serializes to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Shell `export` lines reproducing the configuration through the
    /// environment. Empty settings are left out.
    #[must_use]
    pub fn env_exports(&self) -> String {
        let mut lines = vec![format!("export {ENV_AI_ENABLED}={}", self.ai.enabled)];
        let settings = [
            (ENV_AI_PROVIDER, &self.ai.provider),
            (ENV_AI_API_KEY, &self.ai.api_key),
            (ENV_AI_ENDPOINT, &self.ai.api_endpoint),
            (ENV_AI_MODEL, &self.ai.model),
        ];
        for (name, value) in settings {
            if !value.is_empty() {
                lines.push(format!("export {name}={value}"));
            }
        }
        if self.ai.timeout > 0 {
            lines.push(format!("export {ENV_AI_TIMEOUT}={}", self.ai.timeout));
        }
        if let Some(dialect) = &self.dialect {
            lines.push(format!("export {ENV_DIALECT}={dialect}"));
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Writes the default configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyExists`] when the file exists and
    /// `force` is false, or an I/O error.
    pub fn write_default(path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let body = Self::default().to_yaml()?;
        let text = format!("# sql-diff configuration\n{body}");
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
