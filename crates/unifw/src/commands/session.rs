//! `session check`: report on the login that was just made.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{GlobalOpts, SessionArgs, SessionCommand};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct SessionReport {
    profile: String,
    controller: String,
    platform: String,
    site: String,
    authenticated: bool,
    expires_at: Option<DateTime<Utc>>,
}

fn report_detail(r: &SessionReport, color: bool) -> String {
    let expires = r.expires_at.map_or_else(
        || "never".into(),
        |at| {
            let left = (at - Utc::now()).num_seconds().max(0);
            format!("{} ({left}s left)", at.format("%Y-%m-%d %H:%M:%S UTC"))
        },
    );
    [
        format!("Profile:       {}", r.profile),
        format!("Controller:    {}", r.controller),
        format!("Platform:      {}", r.platform),
        format!("Site:          {}", r.site),
        format!(
            "Authenticated: {}",
            output::yes_no(Some(r.authenticated), color)
        ),
        format!("Expires:       {expires}"),
    ]
    .join("\n")
}

pub fn handle(session: &Session, args: SessionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SessionCommand::Check => {
            let controller = &session.controller;
            let report = SessionReport {
                profile: session.profile.clone(),
                controller: controller.base_url().to_string(),
                platform: controller.platform().to_string(),
                site: session.site.clone(),
                authenticated: controller.is_authenticated(),
                expires_at: controller.session_expires_at(),
            };

            let color = output::should_color(global);
            let out = output::render_single(
                output::format(global),
                &report,
                |r| report_detail(r, color),
                |r| r.authenticated.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
