//! CLI-side configuration: merges global flags over the loaded profile and
//! opens an authenticated controller session.

use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use tracing::{debug, warn};

use unifw_api::{Controller, ControllerPlatform, Credentials, Site};
use unifw_config::{Config, ConfigError, ControllerSettings, Profile};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat, PlatformArg};
use crate::error::CliError;

/// Fill unset presentation flags from the config file's `[defaults]`.
pub fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) {
    if global.output.is_none() {
        global.output = OutputFormat::from_str(&cfg.defaults.output, true).ok();
    }
    if global.color.is_none() {
        global.color = ColorMode::from_str(&cfg.defaults.color, true).ok();
    }
}

/// The profile name to use for this invocation.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    cfg.active_profile_name(global.profile.as_deref())
}

/// The active profile with command-line overrides applied.
///
/// Without a stored profile, `--controller` alone is enough to build one.
pub fn resolve_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, cfg);

    let mut profile = match (cfg.profiles.get(&name), global.controller.as_deref()) {
        (Some(stored), _) => stored.clone(),
        (None, Some(url)) => Profile::new(url),
        (None, None) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(cfg),
                name,
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: unifw_config::config_path().display().to_string(),
            });
        }
    };

    if let Some(ref url) = global.controller {
        profile.controller.clone_from(url);
    }
    if let Some(ref site) = global.site {
        profile.site.clone_from(site);
    }
    if let Some(platform) = global.platform {
        profile.platform = match platform {
            PlatformArg::Auto => "auto".into(),
            PlatformArg::UnifiOs => ControllerPlatform::UnifiOs.to_string(),
            PlatformArg::Classic => ControllerPlatform::Classic.to_string(),
        };
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok((name, profile))
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Credentials from the chain, prompting for a password on a terminal
/// when only the username is known.
fn credentials(profile: &Profile, name: &str) -> Result<Credentials, CliError> {
    match unifw_config::resolve_credentials(profile, name) {
        Ok(creds) => Ok(creds),
        Err(ConfigError::NoCredentials { .. })
            if profile.username.is_some() && std::io::stdin().is_terminal() =>
        {
            let username = profile.username.clone().unwrap_or_default();
            let password = rpassword::prompt_password(format!("Password for {username}: "))?;
            Ok(Credentials::new(username, SecretString::from(password)))
        }
        Err(e) => Err(e.into()),
    }
}

fn spinner(global: &GlobalOpts, message: &str) -> Option<ProgressBar> {
    if global.quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// An authenticated controller plus the site commands operate on.
pub struct Session {
    pub controller: Controller,
    pub site: String,
    pub profile: String,
}

impl Session {
    pub fn site(&self) -> Result<Site<'_>, CliError> {
        Ok(self.controller.site(self.site.as_str())?)
    }

    /// Log out; failures are only logged since the command already ran.
    pub async fn close(self) {
        if let Err(e) = self.controller.logout().await {
            warn!(error = %e, "logout failed");
        }
    }
}

async fn platform_for(settings: &ControllerSettings) -> Result<ControllerPlatform, CliError> {
    if let Some(platform) = settings.platform {
        return Ok(platform);
    }
    let http = settings.transport.build_client()?;
    let platform = ControllerPlatform::detect(&http, &settings.url)
        .await
        .map_err(|e| CliError::from(e).with_url(settings.url.as_str()))?;
    debug!(%platform, "detected controller platform");
    Ok(platform)
}

/// Resolve the profile, build the controller, and log in.
pub async fn connect(global: &GlobalOpts, cfg: &Config) -> Result<Session, CliError> {
    let (name, profile) = resolve_profile(global, cfg)?;
    let settings = unifw_config::profile_to_settings(&profile, &cfg.defaults)?;
    let creds = credentials(&profile, &name)?;

    let platform = platform_for(&settings).await?;
    let controller = settings.builder(platform).build()?;

    debug!(profile = %name, url = %settings.url, %platform, "logging in");
    let pb = spinner(global, &format!("Logging in to {}", settings.url));
    let result = controller.login(&creds.username, &creds.password).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    result.map_err(|e| CliError::from(e).with_url(settings.url.as_str()))?;

    Ok(Session {
        controller,
        site: settings.site,
        profile: name,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["unifw"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["config", "path"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    fn sample() -> Config {
        unifw_config::parse_config(
            r#"
default_profile = "home"

[defaults]
output = "yaml"

[profiles.home]
controller = "https://192.168.1.1"
username = "admin"
"#,
        )
        .unwrap()
    }

    #[test]
    fn flags_override_profile() {
        let cfg = sample();
        let g = global(&[
            "--site",
            "lab",
            "--platform",
            "classic",
            "-k",
            "--timeout",
            "5",
        ]);
        let (name, profile) = resolve_profile(&g, &cfg).unwrap();
        assert_eq!(name, "home");
        assert_eq!(profile.site, "lab");
        assert_eq!(profile.platform, "classic");
        assert_eq!(profile.insecure, Some(true));
        assert_eq!(profile.timeout, Some(5));
        assert_eq!(profile.controller, "https://192.168.1.1");
    }

    #[test]
    fn controller_flag_without_config() {
        let cfg = Config::default();
        let g = global(&["--controller", "https://10.0.0.1:8443"]);
        let (name, profile) = resolve_profile(&g, &cfg).unwrap();
        assert_eq!(name, "default");
        assert_eq!(profile.controller, "https://10.0.0.1:8443");
    }

    #[test]
    fn nothing_configured() {
        let cfg = Config::default();
        assert!(matches!(
            resolve_profile(&global(&[]), &cfg),
            Err(CliError::NoConfig { .. })
        ));
        assert!(matches!(
            resolve_profile(&global(&["-p", "office"]), &cfg),
            Err(CliError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn defaults_fill_unset_flags() {
        let cfg = sample();
        let mut g = global(&[]);
        apply_defaults(&mut g, &cfg);
        assert_eq!(g.output, Some(OutputFormat::Yaml));
        assert_eq!(g.color, Some(ColorMode::Auto));

        let mut g = global(&["-o", "json"]);
        apply_defaults(&mut g, &cfg);
        assert_eq!(g.output, Some(OutputFormat::Json));
    }
}
