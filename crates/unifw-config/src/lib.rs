//! Configuration for the unifw CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation of a profile into controller settings for `unifw-api`.

use std::collections::BTreeMap;
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

use unifw_api::{ControllerBuilder, ControllerPlatform, Credentials, TlsMode, TransportConfig};

/// Keyring service name for stored passwords.
pub const KEYRING_SERVICE: &str = "unifw";

/// Env var overriding the config file location.
pub const CONFIG_ENV: &str = "UNIFW_CONFIG";
pub const USERNAME_ENV: &str = "UNIFW_USERNAME";
pub const PASSWORD_ENV: &str = "UNIFW_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{name}' in the config file")]
    UnknownProfile { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// The profile to use: the explicit name, else `default_profile`,
    /// else `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(String::from)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds; 0 disables it.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named controller profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL (e.g., "https://192.168.1.1").
    pub controller: String,

    /// Site short name.
    #[serde(default = "default_site")]
    pub site: String,

    /// "auto", "unifi-os", or "classic".
    #[serde(default = "default_platform")]
    pub platform: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Plaintext password (prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,

    /// Log in again automatically when the session expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reauthenticate: Option<bool>,
}

fn default_site() -> String {
    unifw_api::DEFAULT_SITE.into()
}
fn default_platform() -> String {
    "auto".into()
}

impl Profile {
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            site: default_site(),
            platform: default_platform(),
            username: None,
            password: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            reauthenticate: None,
        }
    }

    /// The configured platform; `None` means detect it.
    pub fn platform(&self) -> Result<Option<ControllerPlatform>, ConfigError> {
        if self.platform.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        self.platform
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Validation {
                field: "platform".into(),
                reason: format!(
                    "expected 'auto', 'unifi-os', or 'classic', got '{}'",
                    self.platform
                ),
            })
    }
}

/// Check a timeout in seconds; negative values are rejected.
pub fn validate_timeout(secs: i64) -> Result<Duration, ConfigError> {
    u64::try_from(secs)
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::Validation {
            field: "timeout".into(),
            reason: format!("must not be negative, got {secs}"),
        })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `UNIFW_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "unifw", "unifw").map_or_else(
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
    p.push("unifw");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config layered as defaults, then the TOML file at `path` (if it
/// exists), then `UNIFW_*` environment variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UNIFW_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Parse a TOML string on top of the defaults, ignoring the environment.
pub fn parse_config(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml_str))
        .extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/password"),
    )?)
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

/// First password found in the chain: env var, keyring, plaintext.
fn first_password(
    from_env: Option<String>,
    from_keyring: impl FnOnce() -> Option<String>,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    from_env
        .or_else(from_keyring)
        .or_else(|| plaintext.map(String::from))
        .map(SecretString::from)
}

/// Resolve username + password for a profile.
///
/// Username: profile, then `UNIFW_USERNAME`. Password: `UNIFW_PASSWORD`,
/// then the system keyring, then the plaintext `password` field.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Credentials, ConfigError> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    let password = first_password(
        std::env::var(PASSWORD_ENV).ok(),
        || {
            keyring_entry(profile_name)
                .ok()
                .and_then(|entry| entry.get_password().ok())
        },
        profile.password.as_deref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
    })?;

    Ok(Credentials { username, password })
}

// ── Controller settings ─────────────────────────────────────────────

/// Everything needed to build a controller from a profile.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub url: url::Url,
    pub site: String,
    /// `None` when the platform should be detected.
    pub platform: Option<ControllerPlatform>,
    pub transport: TransportConfig,
    pub reauthenticate: bool,
}

impl ControllerSettings {
    /// A controller builder for the given (configured or detected) platform.
    pub fn builder(&self, platform: ControllerPlatform) -> ControllerBuilder {
        ControllerBuilder::new()
            .base_url(self.url.as_str())
            .platform(platform)
            .transport(self.transport.clone())
            .reauthenticate(self.reauthenticate)
    }
}

/// Translate a profile (plus global defaults) into controller settings.
pub fn profile_to_settings(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerSettings, ConfigError> {
    let url: url::Url = profile
        .controller
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "controller".into(),
            reason: format!("invalid URL: {}", profile.controller),
        })?;

    if profile.site.is_empty() {
        return Err(ConfigError::Validation {
            field: "site".into(),
            reason: "must not be empty".into(),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let timeout = match profile.timeout {
        Some(secs) => validate_timeout(secs)?,
        None => Duration::from_secs(defaults.timeout),
    };

    Ok(ControllerSettings {
        url,
        site: profile.site.clone(),
        platform: profile.platform()?,
        transport: TransportConfig { tls, timeout },
        reauthenticate: profile.reauthenticate.unwrap_or(true),
    })
}
