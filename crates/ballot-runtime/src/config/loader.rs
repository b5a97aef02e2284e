//! Layered configuration loading on top of figment.
//!
//! Sources, later ones winning:
//!
//! 1. [`BallotConfig::default`]
//! 2. values passed to [`ConfigLoader::merge`]
//! 3. `ballot.<profile>.toml` next to the main file
//! 4. `ballot.toml` (or `config.toml`)
//! 5. `BALLOT_*` environment variables
//!
//! The `toml-config` feature (default) enables TOML files, `yaml-config`
//! enables `ballot.yaml` / `ballot.yml`. With both on, both are read.
//!
//! Nested keys use a double underscore in environment variables:
//!
//! | Variable | Key |
//! |---|---|
//! | `BALLOT_LOGGING__LEVEL=debug` | `logging.level` |
//! | `BALLOT_STORAGE__BACKEND=file` | `storage.backend` |
//! | `BALLOT_COMMANDS__TIMEOUT_MS=2000` | `commands.timeout_ms` |
//!
//! ```rust,ignore
//! use ballot_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./deploy/ballot.toml")
//!     .profile("production")
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
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BallotConfig;
use super::validation::validate_config;

/// Prefix of the environment variables read by the loader.
pub const ENV_PREFIX: &str = "BALLOT_";

/// Selects the optional `ballot.<profile>.*` file.
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

    /// Case-insensitive; `dev` and `prod` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "development" | "dev" => Self::Development,
            "production" | "prod" => Self::Production,
            _ => Self::Custom(name),
        }
    }

    /// Reads `BALLOT_PROFILE`; unset means [`Profile::Development`].
    pub fn from_env() -> Self {
        match std::env::var("BALLOT_PROFILE") {
            Ok(name) => Self::parse(&name),
            Err(_) => Self::default(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── File formats ─────────────────────────────────────────────────────────────

/// Config file formats compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    const ENABLED: &'static [FileFormat] = &[
        #[cfg(feature = "toml-config")]
        FileFormat::Toml,
        #[cfg(feature = "yaml-config")]
        FileFormat::Yaml,
    ];

    /// Base names searched for, most preferred first.
    fn base_names(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["ballot.toml", "config.toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["ballot.yaml", "ballot.yml", "config.yaml", "config.yml"],
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        let suffix = format!(".{}", path.extension()?.to_str()?);
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.base_names().iter().any(|n| n.ends_with(&suffix)))
    }

    #[allow(unused_variables)]
    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Builds a [`BallotConfig`] from defaults, files and the environment.
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    read_env: bool,
    explicit_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Profile from `BALLOT_PROFILE`, environment enabled, no search paths
    /// (the current and user config directories are used when none are added).
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            read_env: true,
            explicit_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to look for config files in, in call order.
    pub fn search_path<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.search_paths.push(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds `<config dir>/ballot`, e.g. `~/.config/ballot` on Linux.
    pub fn with_user_config_dir(self) -> Self {
        match user_config_dir() {
            Some(dir) => self.search_path(dir),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching. A missing file is an error.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.explicit_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Layers `config` over the defaults, below files and environment.
    pub fn merge(mut self, config: BallotConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Merges every source, extracts and validates the result.
    pub fn load(self) -> ConfigResult<BallotConfig> {
        let config: BallotConfig = self
            .to_figment()?
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        validate_config(&config)?;

        debug!(
            profile = %self.profile,
            logging_level = %config.logging.level,
            backend = ?config.storage.backend,
            space = %config.storage.space,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn to_figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(BallotConfig::default()))
            .merge(self.overrides.clone());

        for path in self.files()? {
            let Some(format) = FileFormat::from_path(&path) else {
                return Err(ConfigError::ParseError(format!(
                    "unsupported or disabled config file format: {}",
                    path.display()
                )));
            };
            info!(path = %path.display(), "Reading configuration file");
            figment = format.merge_into(figment, &path);
        }

        if self.read_env {
            trace!(prefix = ENV_PREFIX, "Reading environment overrides");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment)
    }

    /// Files to merge, in merge order.
    ///
    /// Per format, the first directory holding a base file wins; its profile
    /// variant (`ballot.production.toml`) is merged right before it.
    fn files(&self) -> ConfigResult<Vec<PathBuf>> {
        if let Some(path) = &self.explicit_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            return Ok(vec![path.clone()]);
        }

        let dirs: Vec<PathBuf> = if self.search_paths.is_empty() {
            std::env::current_dir()
                .ok()
                .into_iter()
                .chain(user_config_dir())
                .collect()
        } else {
            self.search_paths.clone()
        };

        let mut files = Vec::new();
        for format in FileFormat::ENABLED {
            if let Some((variant, base)) = self.find(&dirs, format.base_names()) {
                files.extend(variant);
                files.push(base);
            }
        }

        if files.is_empty() {
            warn!(searched = ?dirs, "No configuration file found, using defaults");
        }
        Ok(files)
    }

    fn find(&self, dirs: &[PathBuf], names: &[&str]) -> Option<(Option<PathBuf>, PathBuf)> {
        dirs.iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find(|base| base.is_file())
            .map(|base| {
                let variant = profile_variant(&base, &self.profile).filter(|p| p.is_file());
                (variant, base)
            })
    }
}

/// `dir/ballot.toml` -> `dir/ballot.<profile>.toml`.
fn profile_variant(base: &Path, profile: &Profile) -> Option<PathBuf> {
    let stem = base.file_stem()?.to_str()?;
    let ext = base.extension()?.to_str()?;
    Some(base.with_file_name(format!("{stem}.{profile}.{ext}")))
}

fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ballot"))
}

/// Loads configuration from the current and user config directories.
pub fn load_config() -> ConfigResult<BallotConfig> {
    ConfigLoader::new().load()
}

/// Loads `path` plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<BallotConfig> {
    ConfigLoader::new().file(path).load()
}
