//! Configuration settings for matrix-user-admin.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AdminError;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/matrix-user-admin/config.toml";

/// Environment variable that overrides `database.password`.
pub const PASSWORD_ENV_VAR: &str = "MATRIX_ADMIN_DB_PASSWORD";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mas: MasConfig,
    #[serde(default)]
    pub subprocess: SubprocessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Synapse database connection.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default = "default_db_name")]
    pub name: String,
    /// Passed to the client as `PGPASSWORD`.
    #[serde(default)]
    pub password: Option<String>,
    /// Database client program.
    #[serde(default = "default_db_client")]
    pub client: String,
}

// Hand-written so the password never lands in logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("client", &self.client)
            .finish()
    }
}

/// Matrix Authentication Service CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasConfig {
    /// Path to the `mas` binary.
    #[serde(default = "default_mas_binary")]
    pub binary: PathBuf,
    /// Passed to the binary as `MAS_CONFIG`.
    #[serde(default = "default_mas_config")]
    pub config: PathBuf,
}

/// Environment for external commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubprocessConfig {
    /// `PATH` given to every child process.
    #[serde(default = "default_subprocess_path")]
    pub path: String,
    /// Kill children after this many seconds. Unset means wait indefinitely.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_db_user() -> String {
    "synapse_user".to_string()
}

fn default_db_name() -> String {
    "synapse_db".to_string()
}

fn default_db_client() -> String {
    "psql".to_string()
}

fn default_mas_binary() -> PathBuf {
    PathBuf::from("/opt/mas/mas")
}

fn default_mas_config() -> PathBuf {
    PathBuf::from("/opt/mas/config.yaml")
}

fn default_subprocess_path() -> String {
    "/usr/bin:/bin".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            user: default_db_user(),
            name: default_db_name(),
            password: None,
            client: default_db_client(),
        }
    }
}

impl Default for MasConfig {
    fn default() -> Self {
        Self {
            binary: default_mas_binary(),
            config: default_mas_config(),
        }
    }
}

impl Default for SubprocessConfig {
    fn default() -> Self {
        Self {
            path: default_subprocess_path(),
            timeout_seconds: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SubprocessConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AdminError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AdminError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            AdminError::Config { message } => AdminError::Config {
                message: format!("{} ({})", message, path.display()),
            },
            other => other,
        })
    }

    /// Resolve the settings for this process.
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// when present and built-in defaults otherwise. The password from
    /// [`PASSWORD_ENV_VAR`] overrides whatever the file says.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, AdminError> {
        let mut settings = match explicit {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };

        if let Some(password) = std::env::var(PASSWORD_ENV_VAR)
            .ok()
            .filter(|p| !p.is_empty())
        {
            settings.database.password = Some(password);
        }

        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, AdminError> {
        let settings: Settings = toml::from_str(content).map_err(|e| AdminError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), AdminError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(AdminError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(AdminError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if self.subprocess.path.trim().is_empty() {
            return Err(AdminError::Config {
                message: "subprocess.path must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
