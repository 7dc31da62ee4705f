//! Firewall rule command handlers.

use tabled::Tabled;
use unifw_api::{FirewallAction, FirewallRule, Ruleset};

use crate::cli::{ActionArg, GlobalOpts, RulesArgs, RulesCommand, RulesetArg};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

pub(crate) fn map_ruleset(r: RulesetArg) -> Ruleset {
    match r {
        RulesetArg::WanIn => Ruleset::WanIn,
        RulesetArg::WanOut => Ruleset::WanOut,
        RulesetArg::WanLocal => Ruleset::WanLocal,
        RulesetArg::LanIn => Ruleset::LanIn,
        RulesetArg::LanOut => Ruleset::LanOut,
        RulesetArg::LanLocal => Ruleset::LanLocal,
        RulesetArg::GuestIn => Ruleset::GuestIn,
        RulesetArg::GuestOut => Ruleset::GuestOut,
        RulesetArg::GuestLocal => Ruleset::GuestLocal,
        RulesetArg::Wanv6In => Ruleset::WanV6In,
        RulesetArg::Wanv6Out => Ruleset::WanV6Out,
        RulesetArg::Wanv6Local => Ruleset::WanV6Local,
        RulesetArg::Lanv6In => Ruleset::LanV6In,
        RulesetArg::Lanv6Out => Ruleset::LanV6Out,
        RulesetArg::Lanv6Local => Ruleset::LanV6Local,
        RulesetArg::Guestv6In => Ruleset::GuestV6In,
        RulesetArg::Guestv6Out => Ruleset::GuestV6Out,
        RulesetArg::Guestv6Local => Ruleset::GuestV6Local,
    }
}

fn map_action(a: ActionArg) -> FirewallAction {
    match a {
        ActionArg::Accept => FirewallAction::Accept,
        ActionArg::Reject => FirewallAction::Reject,
        ActionArg::Drop => FirewallAction::Drop,
    }
}

fn not_found(id: String) -> CliError {
    CliError::NotFound {
        resource_type: "firewall rule".into(),
        identifier: id,
        list_command: "rules list".into(),
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Index")]
    index: String,
    #[tabled(rename = "Ruleset")]
    ruleset: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Protocol")]
    protocol: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

fn protocol(r: &FirewallRule) -> Option<&str> {
    if r.ruleset.as_ref().is_some_and(Ruleset::is_ipv6) {
        r.protocol_v6.as_deref()
    } else {
        r.protocol.as_deref()
    }
}

fn rule_row(r: &FirewallRule, color: bool) -> RuleRow {
    RuleRow {
        id: util::or_dash(r.id.as_deref()),
        index: r.rule_index.map_or_else(|| "-".into(), |i| i.to_string()),
        ruleset: r.ruleset.as_ref().map_or_else(|| "-".into(), ToString::to_string),
        name: util::or_dash(r.name.as_deref()),
        action: r
            .action
            .as_ref()
            .map_or_else(|| "-".into(), |a| output::action(a.as_str(), color)),
        protocol: util::or_dash(protocol(r)),
        enabled: output::yes_no(r.enabled, color),
    }
}

fn endpoint(address: Option<&str>, port: Option<&str>, groups: Option<&Vec<String>>) -> String {
    let mut parts = Vec::new();
    if let Some(a) = address.filter(|a| !a.is_empty()) {
        parts.push(a.to_owned());
    }
    if let Some(p) = port.filter(|p| !p.is_empty()) {
        parts.push(format!("port {p}"));
    }
    if let Some(g) = groups.filter(|g| !g.is_empty()) {
        parts.push(format!("groups [{}]", g.join(", ")));
    }
    if parts.is_empty() {
        "any".into()
    } else {
        parts.join(", ")
    }
}

fn rule_detail(r: &FirewallRule, color: bool) -> String {
    [
        format!("ID:          {}", util::or_dash(r.id.as_deref())),
        format!("Name:        {}", util::or_dash(r.name.as_deref())),
        format!(
            "Ruleset:     {}",
            r.ruleset.as_ref().map_or_else(|| "-".into(), ToString::to_string)
        ),
        format!(
            "Index:       {}",
            r.rule_index.map_or_else(|| "-".into(), |i| i.to_string())
        ),
        format!(
            "Action:      {}",
            r.action
                .as_ref()
                .map_or_else(|| "-".into(), |a| output::action(a.as_str(), color))
        ),
        format!("Enabled:     {}", output::yes_no(r.enabled, color)),
        format!("Protocol:    {}", util::or_dash(protocol(r))),
        format!(
            "Source:      {}",
            endpoint(
                r.src_address.as_deref(),
                r.src_port.as_deref(),
                r.src_firewall_group_ids.as_ref()
            )
        ),
        format!(
            "Destination: {}",
            endpoint(
                r.dst_address.as_deref(),
                r.dst_port.as_deref(),
                r.dst_firewall_group_ids.as_ref()
            )
        ),
        format!("Logging:     {}", output::yes_no(r.logging, color)),
    ]
    .join("\n")
}

fn rule_id(r: &FirewallRule) -> String {
    r.id.clone().unwrap_or_default()
}

fn print_rule(rule: &FirewallRule, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global);
    let out = output::render_single(
        output::format(global),
        rule,
        |r| rule_detail(r, color),
        rule_id,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Draft from flags ────────────────────────────────────────────────

/// Rule fields collected from `rules create` flags.
pub(crate) struct RuleDraft {
    pub name: String,
    pub ruleset: RulesetArg,
    pub action: ActionArg,
    pub index: Option<i64>,
    pub protocol: String,
    pub src_address: Option<String>,
    pub src_group: Vec<String>,
    pub dst_address: Option<String>,
    pub dst_port: Option<String>,
    pub dst_group: Vec<String>,
    pub logging: bool,
    pub enabled: bool,
}

impl RuleDraft {
    pub fn into_rule(self) -> FirewallRule {
        let ruleset = map_ruleset(self.ruleset);
        let (protocol, protocol_v6) = if ruleset.is_ipv6() {
            (None, Some(self.protocol))
        } else {
            (Some(self.protocol), None)
        };
        let groups = |ids: Vec<String>| (!ids.is_empty()).then_some(ids);

        FirewallRule {
            name: Some(self.name),
            ruleset: Some(ruleset),
            action: Some(map_action(self.action)),
            rule_index: self.index,
            enabled: Some(self.enabled),
            protocol,
            protocol_v6,
            src_address: self.src_address,
            src_firewall_group_ids: groups(self.src_group),
            dst_address: self.dst_address,
            dst_port: self.dst_port,
            dst_firewall_group_ids: groups(self.dst_group),
            logging: Some(self.logging),
            ..FirewallRule::default()
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    session: &Session,
    args: RulesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let site = session.site()?;

    match args.command {
        RulesCommand::List { ruleset } => {
            let mut rules = site.list_firewall_rules().await?;
            if let Some(rs) = ruleset.map(map_ruleset) {
                rules.retain(|r| r.ruleset.as_ref() == Some(&rs));
            }
            rules.sort_by_key(|r| {
                (
                    r.ruleset.as_ref().map(ToString::to_string),
                    r.rule_index,
                )
            });

            let color = output::should_color(global);
            let out = output::render_list(
                output::format(global),
                &rules,
                |r| rule_row(r, color),
                rule_id,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RulesCommand::Get { id } => {
            let rule = site
                .get_firewall_rule(&id)
                .await?
                .ok_or_else(|| not_found(id))?;
            print_rule(&rule, global)
        }

        RulesCommand::Create {
            from_file,
            name,
            ruleset,
            action,
            index,
            protocol,
            src_address,
            src_group,
            dst_address,
            dst_port,
            dst_group,
            logging,
            disabled,
        } => {
            let rule: FirewallRule = if let Some(ref path) = from_file {
                serde_json::from_value(util::read_json_file(path)?)?
            } else {
                let (Some(name), Some(ruleset), Some(action)) = (name, ruleset, action) else {
                    return Err(CliError::Validation {
                        field: "rule".into(),
                        reason: "--name, --ruleset and --action are required".into(),
                    });
                };
                RuleDraft {
                    name,
                    ruleset,
                    action,
                    index,
                    protocol,
                    src_address,
                    src_group,
                    dst_address,
                    dst_port,
                    dst_group,
                    logging,
                    enabled: !disabled,
                }
                .into_rule()
            };

            let created = site.create_firewall_rule(&rule).await?;
            output::status(
                &format!("Created firewall rule {}", rule_id(&created)),
                global,
            );
            print_rule(&created, global)
        }

        RulesCommand::Update { id, from_file } => {
            let mut rule: FirewallRule = serde_json::from_value(util::read_json_file(&from_file)?)?;
            rule.id = Some(id);
            let updated = site.update_firewall_rule(&rule).await?;
            output::status(
                &format!("Updated firewall rule {}", rule_id(&updated)),
                global,
            );
            print_rule(&updated, global)
        }

        RulesCommand::Enable { id } => toggle(&site, id, true, global).await,

        RulesCommand::Disable { id } => toggle(&site, id, false, global).await,

        RulesCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete firewall rule {id}?"),
                "rules delete",
                global.yes,
            )? {
                return Ok(());
            }
            site.delete_firewall_rule(&id).await?;
            output::status(&format!("Deleted firewall rule {id}"), global);
            Ok(())
        }
    }
}

async fn toggle(
    site: &unifw_api::Site<'_>,
    id: String,
    enable: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match site.set_firewall_rule_enabled(&id, enable).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => return Err(not_found(id)),
        Err(e) => return Err(e.into()),
    }
    let verb = if enable { "Enabled" } else { "Disabled" };
    output::status(&format!("{verb} firewall rule {id}"), global);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(ruleset: RulesetArg) -> RuleDraft {
        RuleDraft {
            name: "Block cameras".into(),
            ruleset,
            action: ActionArg::Drop,
            index: Some(2001),
            protocol: "tcp".into(),
            src_address: None,
            src_group: vec!["g1".into()],
            dst_address: Some("0.0.0.0/0".into()),
            dst_port: None,
            dst_group: Vec::new(),
            logging: false,
            enabled: true,
        }
    }

    #[test]
    fn ipv4_draft_sets_protocol() {
        let rule = draft(RulesetArg::LanIn).into_rule();
        assert_eq!(rule.ruleset, Some(Ruleset::LanIn));
        assert_eq!(rule.action, Some(FirewallAction::Drop));
        assert_eq!(rule.protocol.as_deref(), Some("tcp"));
        assert!(rule.protocol_v6.is_none());
        assert_eq!(rule.src_firewall_group_ids, Some(vec!["g1".to_owned()]));
        assert!(rule.dst_firewall_group_ids.is_none());
        assert_eq!(rule.logging, Some(false));
    }

    #[test]
    fn ipv6_draft_sets_protocol_v6() {
        let rule = draft(RulesetArg::Lanv6In).into_rule();
        assert_eq!(rule.ruleset, Some(Ruleset::LanV6In));
        assert!(rule.protocol.is_none());
        assert_eq!(rule.protocol_v6.as_deref(), Some("tcp"));
    }

    #[test]
    fn detail_lists_endpoints() {
        let rule = draft(RulesetArg::WanIn).into_rule();
        let detail = rule_detail(&rule, false);
        assert!(detail.contains("Source:      groups [g1]"));
        assert!(detail.contains("Destination: 0.0.0.0/0"));
        assert!(detail.contains("Action:      drop"));
    }
}
