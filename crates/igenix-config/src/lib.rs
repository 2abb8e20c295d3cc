//! Device profiles for Igenix air conditioners.
//!
//! TOML profiles, local-key resolution (env + keyring + plaintext),
//! and translation to `igenix_core::DeviceConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use igenix_core::{DeviceConfig, DeviceIdentity};

/// Keyring service all local keys are stored under.
pub const KEYRING_SERVICE: &str = "igenix";

/// Length of a device local key.
const LOCAL_KEY_LEN: usize = 16;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no local key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named explicitly.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
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

/// Timeouts applied to every profile that does not override them, in
/// seconds. Zero disables the bound.
#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            resolve_timeout: default_resolve_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}
fn default_resolve_timeout() -> u64 {
    10
}

/// One air conditioner.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Display name; the profile name when unset.
    pub name: Option<String>,

    /// Cloud device id (`devId`).
    pub device_id: String,

    /// Account id, needed by some protocol versions.
    pub uid: Option<String>,

    /// Local key in plaintext. Prefer the keyring or an env var.
    pub local_key: Option<String>,

    /// Environment variable holding the local key.
    pub local_key_env: Option<String>,

    /// Override `defaults.timeout`.
    pub timeout: Option<u64>,

    /// Override `defaults.resolve_timeout`.
    pub resolve_timeout: Option<u64>,
}

impl Config {
    /// Name of the profile to use: `requested` if given, else the
    /// configured default, else the only profile present.
    pub fn active_profile_name(&self, requested: Option<&str>) -> Option<String> {
        if let Some(name) = requested {
            return Some(name.to_owned());
        }
        if let Some(ref name) = self.default_profile {
            if self.profiles.contains_key(name) {
                return Some(name.clone());
            }
        }
        if self.profiles.len() == 1 {
            return self.profiles.keys().next().cloned();
        }
        None
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }

    /// Build the `DeviceConfig` for a profile, applying `[defaults]`.
    pub fn device_config(&self, requested: Option<&str>) -> Result<DeviceConfig, ConfigError> {
        let name = self
            .active_profile_name(requested)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: requested.unwrap_or("default").into(),
            })?;
        let profile = self.profile(&name)?;
        profile_to_device_config(profile, &name, &self.defaults)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "igenix", "igenix").map_or_else(
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
    p.push("igenix");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, then apply `IGENIX_` environment overrides.
///
/// Nested keys are separated by a double underscore, e.g.
/// `IGENIX_PROFILES__LOUNGE__TIMEOUT=8`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("IGENIX_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Local key resolution ────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/local-key"))
}

/// Resolve a profile's local key from the credential chain.
pub fn resolve_local_key(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's local_key_env → env var lookup
    if let Some(ref env_name) = profile.local_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.local_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's local key in the system keyring.
pub fn store_local_key(profile_name: &str, key: &SecretString) -> Result<(), ConfigError> {
    validate_local_key(key)?;
    keyring_entry(profile_name)?.set_password(key.expose_secret())?;
    Ok(())
}

fn validate_local_key(key: &SecretString) -> Result<(), ConfigError> {
    let len = key.expose_secret().chars().count();
    if len == LOCAL_KEY_LEN {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: "local_key".into(),
            reason: format!("expected {LOCAL_KEY_LEN} characters, got {len}"),
        })
    }
}

// ── Profile → DeviceConfig ──────────────────────────────────────────

/// Build a `DeviceConfig` from a profile.
pub fn profile_to_device_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<DeviceConfig, ConfigError> {
    if profile.device_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "device_id".into(),
            reason: format!("profile '{profile_name}' has no device id"),
        });
    }

    let local_key = resolve_local_key(profile, profile_name)?;
    validate_local_key(&local_key)?;

    let name = profile.name.as_deref().unwrap_or(profile_name);
    let mut identity = DeviceIdentity::new(name, profile.device_id.trim(), local_key);
    if let Some(ref uid) = profile.uid {
        identity = identity.with_uid(uid.clone());
    }

    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    let resolve_timeout = profile.resolve_timeout.unwrap_or(defaults.resolve_timeout);

    Ok(DeviceConfig::new(identity)
        .with_request_timeout(Duration::from_secs(timeout))
        .with_resolve_timeout(Duration::from_secs(resolve_timeout)))
}
