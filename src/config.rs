//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`--config`, or `config.toml` in the platform config dir)
//! 3. Environment variables prefixed with `PICGRAB_`
//! 4. CLI flags
//!
//! Unknown keys in the config file are reported with a "did you mean"
//! suggestion. A file that cannot be parsed is ignored with a warning.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::actions::DeleteConfig;
use crate::cli::{DedupeArgs, FetchArgs};
use crate::fetch::poller::{
    DEFAULT_IMAGE_URL, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_SLICE, DEFAULT_SAVE_DIRECTORY,
};
use crate::fetch::transport::DEFAULT_TIMEOUT;
use crate::fetch::{NamingConfig, PollerConfig};
use crate::listener::ListenerConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PICGRAB_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image endpoint to poll.
    pub image_url: String,
    /// Directory receiving the downloads.
    pub save_directory: PathBuf,
    /// Number of download attempts.
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds.
    pub interval_ms: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Key that stops the download loop.
    #[serde(deserialize_with = "deserialize_key")]
    pub cancel_key: char,
    /// Random characters per file name.
    pub name_length: usize,
    /// Extension of saved files, without the dot.
    pub file_extension: String,
    /// File name draws before giving up on a collision streak.
    pub max_name_attempts: u32,
    /// Move duplicates to the trash instead of deleting them.
    pub use_trash: bool,
    /// Listen for the cancel key while downloading.
    pub listen_for_keys: bool,
}

impl Default for Config {
    fn default() -> Self {
        let naming = NamingConfig::default();
        Self {
            image_url: DEFAULT_IMAGE_URL.to_string(),
            save_directory: PathBuf::from(DEFAULT_SAVE_DIRECTORY),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_ms: 1000,
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            cancel_key: '1',
            name_length: naming.length,
            file_extension: naming.extension,
            max_name_attempts: naming.max_attempts,
            use_trash: false,
            listen_for_keys: true,
        }
    }
}

/// Accepts `"q"` as well as a bare digit such as `1`, which TOML and
/// environment variables both hand over as an integer.
fn deserialize_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<char, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Key {
        Text(String),
        Digit(u64),
    }

    let text = match Key::deserialize(deserializer)? {
        Key::Text(s) => s,
        Key::Digit(n) => n.to_string(),
    };
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(de::Error::custom(format!(
            "cancel_key must be a single character, got {text:?}"
        ))),
    }
}

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds a value the program cannot use.
    #[error("invalid value for `{field}`: {message}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "image_url",
    "save_directory",
    "max_attempts",
    "interval_ms",
    "request_timeout_secs",
    "cancel_key",
    "name_length",
    "file_extension",
    "max_name_attempts",
    "use_trash",
    "listen_for_keys",
];

impl Config {
    /// Load the configuration from `path`, or from the default
    /// platform-specific location when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load_from_path(path),
            None => match Self::config_path() {
                Some(path) => Self::load_from_path(path),
                None => Self::load_from_env(),
            },
        }
    }

    /// Load defaults, then `path` (if it exists), then the environment.
    ///
    /// Falls back to defaults plus environment if the file is invalid, and
    /// to plain defaults if the environment is invalid too.
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            warn_unknown_keys(path);
        }

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Self::env_provider());

        match figment.extract() {
            Ok(config) => {
                log::debug!("Loaded configuration (file: {})", path.display());
                config
            }
            Err(e) => {
                log::warn!(
                    "Ignoring invalid configuration in {}: {}",
                    path.display(),
                    e
                );
                Self::load_from_env()
            }
        }
    }

    /// Load defaults overridden by the environment only.
    pub fn load_from_env() -> Self {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Self::env_provider())
            .extract()
            .unwrap_or_else(|e| {
                log::warn!("Ignoring invalid {}* environment: {}", ENV_PREFIX, e);
                Self::default()
            })
    }

    fn env_provider() -> Env {
        Env::prefixed(ENV_PREFIX).ignore(&["config"])
    }

    /// Default platform-specific configuration file path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "picgrab", "picgrab")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply `fetch` flags on top of the loaded values.
    pub fn merge_fetch_args(&mut self, args: &FetchArgs) {
        if let Some(url) = &args.url {
            self.image_url.clone_from(url);
        }
        if let Some(dir) = &args.dir {
            self.save_directory.clone_from(dir);
        }
        if let Some(attempts) = args.attempts {
            self.max_attempts = attempts;
        }
        if let Some(interval) = args.interval_ms {
            self.interval_ms = interval;
        }
        if let Some(timeout) = args.timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(key) = args.cancel_key {
            self.cancel_key = key;
        }
        if args.no_listen {
            self.listen_for_keys = false;
        }
        if args.trash {
            self.use_trash = true;
        }
    }

    /// Apply `dedupe` flags on top of the loaded values.
    pub fn merge_dedupe_args(&mut self, args: &DedupeArgs) {
        if let Some(path) = &args.path {
            self.save_directory.clone_from(path);
        }
        if args.trash {
            self.use_trash = true;
        }
    }

    /// Reject values the program cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.image_url)
            .map_err(|e| ConfigError::invalid("image_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "image_url",
                format!("unsupported scheme `{}`", url.scheme()),
            ));
        }
        if self.save_directory.as_os_str().is_empty() {
            return Err(ConfigError::invalid("save_directory", "must not be empty"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "request_timeout_secs",
                "must be at least 1",
            ));
        }
        if self.name_length == 0 {
            return Err(ConfigError::invalid("name_length", "must be at least 1"));
        }
        if self.max_name_attempts == 0 {
            return Err(ConfigError::invalid(
                "max_name_attempts",
                "must be at least 1",
            ));
        }
        if self.file_extension.is_empty() {
            return Err(ConfigError::invalid("file_extension", "must not be empty"));
        }
        if self
            .file_extension
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '.')
        {
            return Err(ConfigError::invalid(
                "file_extension",
                "must not contain '/', '\\' or '.'",
            ));
        }
        Ok(())
    }

    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// How duplicates are removed.
    #[must_use]
    pub fn delete_config(&self) -> DeleteConfig {
        if self.use_trash {
            DeleteConfig::trash()
        } else {
            DeleteConfig::permanent()
        }
    }

    /// Settings for the download loop.
    #[must_use]
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            url: self.image_url.clone(),
            directory: self.save_directory.clone(),
            max_attempts: self.max_attempts,
            interval: Duration::from_millis(self.interval_ms),
            poll_slice: DEFAULT_POLL_SLICE,
            naming: NamingConfig {
                length: self.name_length,
                extension: self.file_extension.clone(),
                max_attempts: self.max_name_attempts,
            },
            delete: self.delete_config(),
        }
    }

    /// Settings for the cancel-key listener.
    #[must_use]
    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            cancel_key: self.cancel_key,
            ..ListenerConfig::default()
        }
    }
}

/// Log a warning for every top-level key the program does not know.
fn warn_unknown_keys(path: &Path) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let Ok(table) = content.parse::<toml::Table>() else {
        return;
    };

    for key in unknown_keys(&table) {
        match suggest_key(&key) {
            Some(suggestion) => log::warn!(
                "Unknown config key `{}` in {} (did you mean `{}`?)",
                key,
                path.display(),
                suggestion
            ),
            None => log::warn!("Unknown config key `{}` in {}", key, path.display()),
        }
    }
}

fn unknown_keys(table: &toml::Table) -> Vec<String> {
    let known: HashSet<&str> = KNOWN_KEYS.iter().copied().collect();
    table
        .keys()
        .filter(|k| !known.contains(k.as_str()))
        .cloned()
        .collect()
}

/// Closest known key, if any is reasonably close.
#[must_use]
pub fn suggest_key(unknown: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .map(|known| (*known, strsim::jaro_winkler(unknown, known)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known)
}
