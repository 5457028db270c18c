//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: `courier.toml`, `config.toml`
//! - `yaml-config`: `courier.yaml`, `courier.yml`, `config.yaml`, `config.yml`
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic merges ([`ConfigLoader::merge`])
//! 3. Profile-specific file (`courier.{profile}.toml`)
//! 4. Main file (`courier.toml`)
//! 5. Environment variables (`COURIER_*`)
//!
//! # Environment Variable Mapping
//!
//! Variables use the `COURIER_` prefix with `__` between nested keys:
//!
//! - `COURIER_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `COURIER_ROUTING__OPERATION_NAME=Ingest` → `routing.operation_name = "Ingest"`
//! - `COURIER_ROUTING__CORRELATION__FORMAT=hierarchical`
//!
//! `COURIER_PROFILE` selects the profile.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .search_path("/etc/courier")
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::CourierConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "COURIER_";
const PROFILE_VAR: &str = "COURIER_PROFILE";
const APP_DIR: &str = "courier";

/// Configuration profile selecting `courier.{profile}.*` files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod` and `dev` are accepted as short forms.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `COURIER_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|name| Self::from_name(&name))
            .unwrap_or_default()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-source configuration loader.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::from_name(profile.as_ref());
        self
    }

    /// Adds a directory searched for configuration files.
    ///
    /// Without explicit paths, the current directory and the user config
    /// directory (`~/.config/courier` on Linux) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration values over the defaults.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<CourierConfig> {
        let profile = self.profile.clone();
        let config: CourierConfig = self.build_figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            correlation_format = %config.routing.correlation.format,
            "Configuration loaded"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let merged = std::mem::take(&mut self.figment);
        let mut figment = Figment::from(Serialized::defaults(CourierConfig::default())).merge(merged);

        figment = match self.config_file.take() {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading configuration file");
                merge_file(figment, &path)?
            }
            Some(path) => return Err(ConfigError::FileNotFound(path)),
            None => self.search_files(figment),
        };

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment)
    }

    fn search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(APP_DIR));
        }
        paths
    }

    /// Merges the first directory's `{stem}.{profile}.{ext}` and
    /// `{stem}.{ext}` files, trying each base name in order.
    fn search_files(&self, mut figment: Figment) -> Figment {
        let mut found = false;

        'search: for directory in self.search_paths() {
            for base_name in base_names() {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    directory.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.is_file() {
                    debug!(path = %profile_path.display(), "Loading profile configuration");
                    figment = merge_known(figment, &profile_path, ext);
                }

                let base_path = directory.join(base_name);
                if base_path.is_file() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    figment = merge_known(figment, &base_path, ext);
                    found = true;
                    break 'search;
                }
            }
        }

        if !found {
            debug!("No configuration file found, using defaults");
        }
        figment
    }
}

fn base_names() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut names = Vec::new();
    #[cfg(feature = "toml-config")]
    names.extend(["courier.toml", "config.toml"]);
    #[cfg(feature = "yaml-config")]
    names.extend(["courier.yaml", "courier.yml", "config.yaml", "config.yml"]);
    names
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    if !base_names().iter().any(|name| name.ends_with(&format!(".{ext}"))) {
        return Err(ConfigError::ParseError(format!(
            "Unsupported or disabled configuration file format: .{ext}"
        )));
    }
    Ok(merge_known(figment, path, ext))
}

#[allow(unused_variables)]
fn merge_known(figment: Figment, path: &Path, ext: &str) -> Figment {
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => figment.merge(Toml::file(path)),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        _ => figment,
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<CourierConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from one file plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<CourierConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
