// Firewall group endpoints (`rest/firewallgroup`)

use tracing::debug;

use crate::error::Error;
use crate::models::FirewallGroup;
use crate::site::{Site, require_id};

const PATH: &str = "rest/firewallgroup";

impl Site<'_> {
    pub async fn create_firewall_group(
        &self,
        group: &FirewallGroup,
    ) -> Result<FirewallGroup, Error> {
        let url = self.url(PATH, None)?;
        debug!(site = self.name(), name = ?group.name, "creating firewall group");
        let created: Vec<FirewallGroup> = self.post(url, group).await?;
        created.into_iter().next().ok_or(Error::EmptyResponse {
            resource: "firewall group",
        })
    }

    pub async fn list_firewall_groups(&self) -> Result<Vec<FirewallGroup>, Error> {
        let url = self.url(PATH, None)?;
        self.get(url).await
    }

    /// `None` when no group has this id.
    pub async fn get_firewall_group(&self, id: &str) -> Result<Option<FirewallGroup>, Error> {
        let url = self.url(PATH, Some(require_id(id, "firewall group")?))?;
        let groups: Vec<FirewallGroup> = self.get(url).await?;
        Ok(groups.into_iter().next())
    }

    pub async fn update_firewall_group(
        &self,
        group: &FirewallGroup,
    ) -> Result<FirewallGroup, Error> {
        let id = require_id(group.id.as_deref().unwrap_or_default(), "firewall group")?;
        let url = self.url(PATH, Some(id))?;
        debug!(site = self.name(), id, "updating firewall group");
        let updated: Vec<FirewallGroup> = self.put(url, group).await?;
        updated.into_iter().next().ok_or(Error::EmptyResponse {
            resource: "firewall group",
        })
    }

    pub async fn delete_firewall_group(&self, id: &str) -> Result<(), Error> {
        let url = self.url(PATH, Some(require_id(id, "firewall group")?))?;
        debug!(site = self.name(), id, "deleting firewall group");
        let _: Vec<serde_json::Value> = self.delete(url).await?;
        Ok(())
    }
}
