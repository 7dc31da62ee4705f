//! Firewall group command handlers.

use tabled::Tabled;
use unifw_api::{FirewallGroup, GroupType};

use crate::cli::{GlobalOpts, GroupTypeArg, GroupsArgs, GroupsCommand};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

fn map_group_type(t: GroupTypeArg) -> GroupType {
    match t {
        GroupTypeArg::AddressGroup => GroupType::AddressGroup,
        GroupTypeArg::Ipv6AddressGroup => GroupType::Ipv6AddressGroup,
        GroupTypeArg::PortGroup => GroupType::PortGroup,
    }
}

fn not_found(id: String) -> CliError {
    CliError::NotFound {
        resource_type: "firewall group".into(),
        identifier: id,
        list_command: "groups list".into(),
    }
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    group_type: String,
    #[tabled(rename = "Members")]
    members: String,
}

fn members(g: &FirewallGroup) -> String {
    match g.group_members.as_deref() {
        Some(m) if !m.is_empty() => m.join(", "),
        _ => "-".into(),
    }
}

fn group_row(g: &FirewallGroup) -> GroupRow {
    GroupRow {
        id: util::or_dash(g.id.as_deref()),
        name: util::or_dash(g.name.as_deref()),
        group_type: g.group_type.as_ref().map_or_else(|| "-".into(), ToString::to_string),
        members: members(g),
    }
}

fn group_detail(g: &FirewallGroup) -> String {
    [
        format!("ID:      {}", util::or_dash(g.id.as_deref())),
        format!("Name:    {}", util::or_dash(g.name.as_deref())),
        format!(
            "Type:    {}",
            g.group_type.as_ref().map_or_else(|| "-".into(), ToString::to_string)
        ),
        format!("Members: {}", members(g)),
    ]
    .join("\n")
}

fn group_id(g: &FirewallGroup) -> String {
    g.id.clone().unwrap_or_default()
}

fn print_group(group: &FirewallGroup, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(output::format(global), group, group_detail, group_id)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Apply `groups update` edits: replace, then add, then remove.
fn edit_members(
    group: &mut FirewallGroup,
    replace: Option<Vec<String>>,
    add: Vec<String>,
    remove: &[String],
) {
    let mut current = replace.unwrap_or_else(|| group.group_members.take().unwrap_or_default());
    for member in add {
        if !current.contains(&member) {
            current.push(member);
        }
    }
    current.retain(|m| !remove.contains(m));
    group.group_members = Some(current);
}

pub async fn handle(
    session: &Session,
    args: GroupsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let site = session.site()?;

    match args.command {
        GroupsCommand::List => {
            let groups = site.list_firewall_groups().await?;
            let out = output::render_list(output::format(global), &groups, group_row, group_id)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupsCommand::Get { id } => {
            let group = site
                .get_firewall_group(&id)
                .await?
                .ok_or_else(|| not_found(id))?;
            print_group(&group, global)
        }

        GroupsCommand::Create {
            name,
            group_type,
            members,
        } => {
            let group = FirewallGroup::new(name, map_group_type(group_type), members);
            let created = site.create_firewall_group(&group).await?;
            output::status(
                &format!("Created firewall group {}", group_id(&created)),
                global,
            );
            print_group(&created, global)
        }

        GroupsCommand::Update {
            id,
            name,
            members,
            add,
            remove,
        } => {
            if name.is_none() && members.is_none() && add.is_empty() && remove.is_empty() {
                return Err(CliError::Validation {
                    field: "update".into(),
                    reason: "nothing to change; pass --name, --members, --add or --remove".into(),
                });
            }

            let mut group = site
                .get_firewall_group(&id)
                .await?
                .ok_or_else(|| not_found(id.clone()))?;
            if name.is_some() {
                group.name = name;
            }
            if members.is_some() || !add.is_empty() || !remove.is_empty() {
                edit_members(&mut group, members, add, &remove);
            }

            let updated = site.update_firewall_group(&group).await?;
            output::status(&format!("Updated firewall group {id}"), global);
            print_group(&updated, global)
        }

        GroupsCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete firewall group {id}?"),
                "groups delete",
                global.yes,
            )? {
                return Ok(());
            }
            site.delete_firewall_group(&id).await?;
            output::status(&format!("Deleted firewall group {id}"), global);
            Ok(())
        }
    }
}
