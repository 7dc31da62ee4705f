//! Config subcommand handlers.

use dialoguer::{Input, Select};
use unifw_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Copy of the config with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
    cfg
}

fn config_detail(cfg: &Config) -> String {
    let default = cfg.default_profile.as_deref().unwrap_or("default");
    let mut lines = vec![
        format!("Default profile: {default}"),
        format!(
            "Defaults:        output={} color={} insecure={} timeout={}s",
            cfg.defaults.output, cfg.defaults.color, cfg.defaults.insecure, cfg.defaults.timeout
        ),
    ];
    if cfg.profiles.is_empty() {
        lines.push("Profiles:        (none)".into());
    }
    for (name, p) in &cfg.profiles {
        let marker = if name == default { " *" } else { "" };
        lines.push(String::new());
        lines.push(format!("[{name}]{marker}"));
        lines.push(format!("  controller: {}", p.controller));
        lines.push(format!("  site:       {}", p.site));
        lines.push(format!("  platform:   {}", p.platform));
        lines.push(format!(
            "  username:   {}",
            p.username.as_deref().unwrap_or("-")
        ));
        if let Some(ref password) = p.password {
            lines.push(format!("  password:   {password}"));
        }
        if let Some(insecure) = p.insecure {
            lines.push(format!("  insecure:   {insecure}"));
        }
        if let Some(timeout) = p.timeout {
            lines.push(format!("  timeout:    {timeout}s"));
        }
    }
    lines.join("\n")
}

fn init() -> Result<(), CliError> {
    let config_path = unifw_config::config_path();
    eprintln!("unifw configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = if config_path.exists() {
        unifw_config::load_config_from(&config_path)?
    } else {
        Config::default()
    };

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let controller: String = Input::new()
        .with_prompt("Controller URL")
        .default("https://192.168.1.1".into())
        .interact_text()
        .map_err(prompt_err)?;

    let platforms = &["auto", "unifi-os", "classic"];
    let platform = Select::new()
        .with_prompt("Controller platform")
        .items(&[
            "Detect automatically",
            "UniFi OS console (UDM, UCG, Cloud Key Gen2+)",
            "Classic Network Application",
        ])
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let username: String = Input::new()
        .with_prompt("Username")
        .interact_text()
        .map_err(prompt_err)?;
    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if username.is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    let store = Select::new()
        .with_prompt("Where to store the password?")
        .items(&[
            "Store in system keyring (recommended)",
            "Save to config file (plaintext)",
        ])
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let password = if store == 0 {
        unifw_config::store_password(&profile_name, &password)?;
        eprintln!("   ✓ Password stored in system keyring");
        None
    } else {
        Some(password)
    };

    let site: String = Input::new()
        .with_prompt("Site name")
        .default(unifw_api::DEFAULT_SITE.into())
        .interact_text()
        .map_err(prompt_err)?;

    let mut profile = Profile::new(controller);
    profile.site = site;
    profile.platform = platforms[platform].into();
    profile.username = Some(username);
    profile.password = password;
    // Catch typos in the URL before writing anything.
    unifw_config::profile_to_settings(&profile, &cfg.defaults)?;

    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let path = unifw_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: unifw session check");
    Ok(())
}

fn set_password(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = unifw_config::load_config()?;
    let profile_name = config::active_profile_name(global, &cfg);
    if !cfg.profiles.contains_key(&profile_name) {
        return Err(CliError::ProfileNotFound {
            available: config::available_profiles(&cfg),
            name: profile_name,
        });
    }

    let password = rpassword::prompt_password(format!("Password for '{profile_name}': "))
        .map_err(prompt_err)?;
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "value cannot be empty".into(),
        });
    }

    unifw_config::store_password(&profile_name, &password)?;
    output::status(
        &format!("Password stored in system keyring for profile '{profile_name}'"),
        global,
    );
    Ok(())
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = redacted(&unifw_config::load_config()?);
            let out = output::render_single(output::format(global), &cfg, config_detail, |c| {
                c.default_profile.clone().unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(
                &unifw_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::SetPassword => set_password(global),
    }
}
