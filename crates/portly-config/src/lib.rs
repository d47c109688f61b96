//! Shared configuration for the portly CLI.
//!
//! TOML switch profiles, credential resolution (env + keyring + plaintext),
//! and translation to `portly_core::CoordinatorConfig`. The CLI adds
//! flag-aware overrides on top.

use std::collections::{BTreeMap, BTreeSet};
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
use tracing::debug;

use portly_core::CoordinatorConfig;

/// Keyring service name; entries are keyed `<profile>/password`.
pub const KEYRING_SERVICE: &str = "portly";

/// Environment variable consulted before the keyring.
pub const PASSWORD_ENV: &str = "PORTLY_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found in config")]
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
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named switch profiles.
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
    /// Look up a profile by name, falling back to the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|p| (name.clone(), p))
            .ok_or(ConfigError::UnknownProfile { profile: name })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// A named switch profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Switch hostname or IP address.
    pub host: String,

    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Number of front-panel ports.
    #[serde(default = "default_port_count")]
    pub port_count: u16,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Ports hidden from output and writes, e.g. `"25-28"`.
    pub exclude_ports: Option<String>,

    /// Ports whose PoE may not be toggled, e.g. `"1,3,5-8"`.
    pub exclude_poe: Option<String>,

    /// Failed polls before the switch counts as offline.
    pub offline_threshold: Option<u32>,

    /// Retries for a failed write.
    pub write_retries: Option<u32>,

    /// Per-command timeout.
    pub command_timeout_secs: Option<u64>,

    /// TCP + SSH handshake timeout.
    pub connect_timeout_secs: Option<u64>,
}

impl Profile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ssh_port: default_ssh_port(),
            username: default_username(),
            password: None,
            password_env: None,
            port_count: default_port_count(),
            poll_interval_secs: default_poll_interval(),
            exclude_ports: None,
            exclude_poe: None,
            offline_threshold: None,
            write_retries: None,
            command_timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

fn default_ssh_port() -> u16 {
    22
}
fn default_username() -> String {
    "manager".into()
}
fn default_port_count() -> u16 {
    24
}
fn default_poll_interval() -> u64 {
    30
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "portly", "portly").map_or_else(
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
    p.push("portly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + `PORTLY_` environment overrides.
///
/// Nested keys use a double underscore:
/// `PORTLY_PROFILES__LAB__HOST=10.0.0.2`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PORTLY_").split("__"));

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
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Port lists ──────────────────────────────────────────────────────

/// Parse a port list such as `"1,3,5-8"` into a set of indices.
///
/// Whitespace is ignored; an empty string is an empty set.
pub fn parse_port_list(spec: &str) -> Result<BTreeSet<u16>, ConfigError> {
    let invalid = |reason: String| ConfigError::Validation {
        field: "port list".into(),
        reason,
    };
    let number = |s: &str| {
        s.trim()
            .parse::<u16>()
            .map_err(|_| invalid(format!("'{}' is not a port number", s.trim())))
    };

    let mut ports = BTreeSet::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let (start, end) = (number(start)?, number(end)?);
            if start > end {
                return Err(invalid(format!("range '{part}' is reversed")));
            }
            ports.extend(start..=end);
        } else {
            ports.insert(number(part)?);
        }
    }
    Ok(ports)
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_lookup(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .ok()?
        .get_password()
        .ok()
}

/// Resolve the SSH password: profile env var, `PORTLY_PASSWORD`,
/// keyring, then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(profile, profile_name, |name| std::env::var(name).ok(), keyring_lookup)
}

/// [`resolve_password`] with pluggable env and keyring lookups.
pub fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(pw));
    }

    // 2. Global env var
    if let Some(pw) = env(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Some(pw) = keyring(profile_name) {
        return Ok(SecretString::from(pw));
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))?
        .set_password(password)?;
    Ok(())
}

// ── Profile → CoordinatorConfig ─────────────────────────────────────

/// Build a `CoordinatorConfig` from a profile and a resolved password.
pub fn build_coordinator_config(
    profile: &Profile,
    password: SecretString,
) -> Result<CoordinatorConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }

    let mut cfg = CoordinatorConfig::new(profile.host.trim(), profile.username.clone(), password);
    cfg.transport.port = profile.ssh_port;
    cfg.port_count = profile.port_count;
    cfg.poll_interval = Duration::from_secs(profile.poll_interval_secs);
    cfg.excluded_ports = parse_port_list(profile.exclude_ports.as_deref().unwrap_or_default())?;
    cfg.excluded_poe = parse_port_list(profile.exclude_poe.as_deref().unwrap_or_default())?;
    if let Some(threshold) = profile.offline_threshold {
        cfg.offline_threshold = threshold;
    }
    if let Some(retries) = profile.write_retries {
        cfg.write_retries = retries;
    }
    if let Some(secs) = profile.command_timeout_secs {
        cfg.command_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = profile.connect_timeout_secs {
        cfg.transport.connect_timeout = Duration::from_secs(secs);
    }

    cfg.validate().map_err(|e| ConfigError::Validation {
        field: "profile".into(),
        reason: e.to_string(),
    })?;
    Ok(cfg)
}

/// Build a `CoordinatorConfig` from a profile -- no CLI flag overrides.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<CoordinatorConfig, ConfigError> {
    let password = resolve_password(profile, profile_name)?;
    build_coordinator_config(profile, password)
}
