//! Config subcommand handlers.

use std::io::BufRead;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map an interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Plaintext passwords never leave the config file through `show`.
fn redacted(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("********".into());
        }
    }
    cfg
}

fn read_password(from_stdin: bool) -> Result<String, CliError> {
    let password = if from_stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_owned()
    } else {
        rpassword::prompt_password("SSH password: ").map_err(prompt_err)?
    };
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(password)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(config::load_config_or_default());
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| {
                    let mut lines = vec![format!(
                        "Default profile: {}",
                        c.default_profile.as_deref().unwrap_or("-")
                    )];
                    for (name, p) in &c.profiles {
                        lines.push(format!(
                            "  {name}: {}@{}:{} ({} ports, every {}s)",
                            p.username, p.host, p.ssh_port, p.port_count, p.poll_interval_secs
                        ));
                    }
                    lines.join("\n")
                },
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { stdin } => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let password = read_password(stdin)?;
            portly_config::store_password(&profile_name, &password)?;
            if !global.quiet {
                eprintln!("✓ Password for profile '{profile_name}' stored in system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use portly_config::Profile;

    use super::*;

    #[test]
    fn show_redacts_plaintext_passwords() {
        let mut cfg = Config::default();
        let mut lab = Profile::new("10.0.0.2");
        lab.password = Some("hunter2".into());
        cfg.profiles.insert("lab".into(), lab);
        cfg.profiles.insert("core".into(), Profile::new("10.0.0.3"));

        let cfg = redacted(cfg);
        assert_eq!(cfg.profiles["lab"].password.as_deref(), Some("********"));
        assert_eq!(cfg.profiles["core"].password, None);
    }
}
