//! CLI configuration -- thin wrapper around `portly_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --username, --ssh-port).

use portly_core::CoordinatorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use portly_config::{Config, Profile, config_path, load_config_or_default};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Apply flag overrides on top of a profile.
pub fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(ref username) = global.username {
        profile.username.clone_from(username);
    }
    if let Some(port) = global.ssh_port {
        profile.ssh_port = port;
    }
    profile
}

/// Pick the profile to run against: the named or default profile when
/// it exists, else an ad-hoc one built from `--host`.
pub fn resolve_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);

    if let Some(profile) = config.profiles.get(&name) {
        return Ok((name, apply_overrides(profile.clone(), global)));
    }

    // A profile asked for by name must exist.
    if global.profile.is_some() {
        return Err(portly_config::ConfigError::UnknownProfile { profile: name }.into());
    }

    let host = global.host.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    Ok((name, apply_overrides(Profile::new(host), global)))
}

/// Build a `CoordinatorConfig` from the config file, profile, and CLI overrides.
pub fn build_coordinator_config(global: &GlobalOpts) -> Result<CoordinatorConfig, CliError> {
    let cfg = load_config_or_default();
    let (name, profile) = resolve_profile(global, &cfg)?;
    tracing::debug!(profile = %name, host = %profile.host, "resolved profile");
    Ok(portly_config::profile_to_coordinator_config(&profile, &name)?)
}
