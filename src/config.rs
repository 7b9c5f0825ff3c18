//! Kefir configuration.
//!
//! Loaded from `~/.kefir/config.toml`. A missing file means defaults, which
//! is demo mode with default display settings.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Environment variable that selects the relational store.
pub const DATABASE_ENV: &str = "KEFIR_DATABASE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Kefir configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Path of the relational database. Demo mode when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Signed-in user for the relational deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    #[serde(default)]
    pub display: DisplaySettings,
}

/// Presentation preferences. Stored and shown; they never affect the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplaySettings {
    #[serde(default)]
    pub text_size: TextSize,

    #[serde(default)]
    pub language: Language,

    #[serde(default)]
    pub notifications: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    Sm,
    #[default]
    Md,
    Lg,
    Xl,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Th,
}

/// Which backend the process runs against. Decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Local mock store and demo session under `root`.
    Demo { root: PathBuf },

    /// Relational store at `database`.
    Relational { database: PathBuf },
}

impl Config {
    /// Load config from `~/.kefir/config.toml`, or defaults if it is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path().ok_or(ConfigError::NoHome)?;
        Self::load_from(&path)
    }

    /// Load config from `path`, or defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write config to `~/.kefir/config.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path().ok_or(ConfigError::NoHome)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string(self)?;
        let write = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write)?;
        }
        fs::write(path, contents).map_err(write)
    }

    /// The config file path: `~/.kefir/config.toml`.
    pub fn path() -> Option<PathBuf> {
        crate::storage::default_root().map(|root| root.join("config.toml"))
    }

    /// Resolves the deployment mode.
    ///
    /// `KEFIR_DATABASE` wins over the `database` key; an empty value counts
    /// as unset. With neither, the process runs in demo mode under `root`.
    pub fn deployment_mode(&self, root: PathBuf) -> DeploymentMode {
        let from_env = env::var_os(DATABASE_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.mode_with(from_env, root)
    }

    fn mode_with(&self, from_env: Option<PathBuf>, root: PathBuf) -> DeploymentMode {
        let configured = self
            .database
            .clone()
            .filter(|p| !p.as_os_str().is_empty());
        match from_env.or(configured) {
            Some(database) => DeploymentMode::Relational { database },
            None => DeploymentMode::Demo { root },
        }
    }
}
