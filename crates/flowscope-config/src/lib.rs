//! Configuration for the flowscope dashboard.
//!
//! One TOML file plus `FLOWSCOPE_*` environment overrides, translated into
//! `flowscope_api::TransportConfig` and `flowscope_core::EngineConfig`.
//! The binary layers its CLI flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use flowscope_api::TransportConfig;
use flowscope_core::EngineConfig;

/// Prefix for environment overrides; nested keys are joined with `__`,
/// e.g. `FLOWSCOPE_DISPLAY__REFRESH_INTERVAL_SECS=2`.
pub const ENV_PREFIX: &str = "FLOWSCOPE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("username '{username}' is configured but no password was found")]
    NoPassword { username: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub appliance: ApplianceSection,

    #[serde(default)]
    pub display: DisplaySection,
}

/// How to reach the appliance's web server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApplianceSection {
    /// Base URL of the appliance web UI.
    #[serde(default = "default_url")]
    pub url: String,

    /// Dashboard login, if the appliance has one enabled.
    pub username: Option<String>,

    /// Password (plaintext; prefer `password_env`).
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    pub password_env: Option<String>,

    /// Accept self-signed TLS certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApplianceSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            password_env: None,
            insecure: default_insecure(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Dashboard behavior.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplaySection {
    /// Seconds between data refreshes.
    #[serde(default = "default_refresh")]
    pub refresh_interval_secs: u64,

    /// Initial particle speed multiplier.
    #[serde(default = "default_speed")]
    pub animation_speed: f64,

    /// Directory of `<kind>.txt` device icons.
    pub icon_dir: Option<PathBuf>,

    /// Ask the appliance to name client devices.
    #[serde(default = "default_identity_lookup")]
    pub identity_lookup: bool,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh(),
            animation_speed: default_speed(),
            icon_dir: None,
            identity_lookup: default_identity_lookup(),
        }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:8090".into()
}
fn default_insecure() -> bool {
    true
}
fn default_timeout() -> u64 {
    10
}
fn default_refresh() -> u64 {
    5
}
fn default_speed() -> f64 {
    1.0
}
fn default_identity_lookup() -> bool {
    true
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "flowscope", "flowscope").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("flowscope");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the platform config path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` plus environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if self.display.refresh_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "display.refresh_interval_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if !(self.display.animation_speed.is_finite() && self.display.animation_speed > 0.0) {
            return Err(ConfigError::Validation {
                field: "display.animation_speed".into(),
                reason: format!("must be positive, got {}", self.display.animation_speed),
            });
        }
        if self.appliance.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "appliance.timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Parsed appliance URL; must be http or https.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self
            .appliance
            .url
            .parse()
            .map_err(|e| ConfigError::Validation {
                field: "appliance.url".into(),
                reason: format!("{e}: {}", self.appliance.url),
            })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Validation {
                field: "appliance.url".into(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.appliance.timeout_secs),
            accept_invalid_certs: self.appliance.insecure,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            refresh_interval: Duration::from_secs(self.display.refresh_interval_secs),
            animation_speed: self.display.animation_speed,
            icon_dir: self.display.icon_dir.clone(),
            identity_lookup: self.display.identity_lookup,
        }
    }

    /// Password from the variable named by `password_env`, else plaintext.
    pub fn password(&self) -> Option<SecretString> {
        if let Some(ref env_name) = self.appliance.password_env {
            if let Ok(val) = std::env::var(env_name) {
                return Some(SecretString::from(val));
            }
        }
        self.appliance
            .password
            .as_ref()
            .map(|pw| SecretString::from(pw.clone()))
    }

    /// Login credentials, if a username is configured.
    pub fn credentials(&self) -> Result<Option<(String, SecretString)>, ConfigError> {
        let Some(username) = self.appliance.username.clone() else {
            return Ok(None);
        };
        match self.password() {
            Some(password) => Ok(Some((username, password))),
            None => Err(ConfigError::NoPassword { username }),
        }
    }

    /// Effective config as TOML, with any plaintext password masked.
    pub fn to_toml_redacted(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.appliance.password.is_some() {
            shown.appliance.password = Some("********".into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.display.refresh_interval_secs, 5);
        assert_eq!(cfg.base_url().unwrap().as_str(), "http://127.0.0.1:8090/");
    }

    #[test]
    fn rejects_zero_interval_and_bad_speed() {
        let mut cfg = Config::default();
        cfg.display.refresh_interval_secs = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation { .. })));

        let mut cfg = Config::default();
        cfg.display.animation_speed = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn rejects_non_http_url() {
        let mut cfg = Config::default();
        cfg.appliance.url = "ftp://10.0.0.1".into();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("appliance.url"), "{err}");
    }

    #[test]
    fn translates_to_runtime_configs() {
        let mut cfg = Config::default();
        cfg.appliance.timeout_secs = 3;
        cfg.appliance.insecure = false;
        cfg.display.icon_dir = Some(PathBuf::from("/usr/share/flowscope/icons"));

        let transport = cfg.transport_config();
        assert_eq!(transport.timeout, Duration::from_secs(3));
        assert!(!transport.accept_invalid_certs);

        let engine = cfg.engine_config();
        assert_eq!(engine.refresh_interval, Duration::from_secs(5));
        assert_eq!(engine.icon_dir, cfg.display.icon_dir);
    }

    #[test]
    fn password_env_wins_over_plaintext() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FLOWSCOPE_TEST_PW", "from-env");
            let mut cfg = Config::default();
            cfg.appliance.password = Some("plain".into());
            cfg.appliance.password_env = Some("FLOWSCOPE_TEST_PW".into());
            assert_eq!(cfg.password().unwrap().expose_secret(), "from-env");

            cfg.appliance.password_env = Some("FLOWSCOPE_UNSET_PW".into());
            assert_eq!(cfg.password().unwrap().expose_secret(), "plain");
            Ok(())
        });
    }

    #[test]
    fn username_without_password_is_an_error() {
        let mut cfg = Config::default();
        assert!(cfg.credentials().unwrap().is_none());
        cfg.appliance.username = Some("admin".into());
        assert!(matches!(cfg.credentials(), Err(ConfigError::NoPassword { .. })));
    }

    #[test]
    fn redacted_toml_hides_password() {
        let mut cfg = Config::default();
        cfg.appliance.password = Some("hunter2".into());
        let text = cfg.to_toml_redacted().unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("refresh_interval_secs = 5"));
    }
}
