// Firewall rule endpoints (`rest/firewallrule`)

use tracing::debug;

use crate::error::Error;
use crate::models::FirewallRule;
use crate::site::{Site, require_id};

const PATH: &str = "rest/firewallrule";

impl Site<'_> {
    /// Create a firewall rule and return the record the controller stored.
    pub async fn create_firewall_rule(&self, rule: &FirewallRule) -> Result<FirewallRule, Error> {
        let url = self.url(PATH, None)?;
        debug!(site = self.name(), name = ?rule.name, "creating firewall rule");
        let mut created: Vec<FirewallRule> = self.post(url, rule).await?;
        if created.is_empty() {
            return Err(Error::EmptyResponse {
                resource: "firewall rule",
            });
        }
        Ok(created.swap_remove(0))
    }

    /// List every firewall rule on the site.
    pub async fn list_firewall_rules(&self) -> Result<Vec<FirewallRule>, Error> {
        let url = self.url(PATH, None)?;
        self.get(url).await
    }

    /// Fetch one rule. `None` when the controller has no rule with that id.
    pub async fn get_firewall_rule(&self, id: &str) -> Result<Option<FirewallRule>, Error> {
        let url = self.url(PATH, Some(require_id(id, "firewall rule")?))?;
        let rules: Vec<FirewallRule> = self.get(url).await?;
        Ok(rules.into_iter().next())
    }

    /// Replace a rule. The rule's `_id` selects the record.
    pub async fn update_firewall_rule(&self, rule: &FirewallRule) -> Result<FirewallRule, Error> {
        let id = require_id(rule.id.as_deref().unwrap_or_default(), "firewall rule")?;
        let url = self.url(PATH, Some(id))?;
        debug!(site = self.name(), id, "updating firewall rule");
        let mut updated: Vec<FirewallRule> = self.put(url, rule).await?;
        if updated.is_empty() {
            return Err(Error::EmptyResponse {
                resource: "firewall rule",
            });
        }
        Ok(updated.swap_remove(0))
    }

    /// Flip a rule's `enabled` flag, leaving the rest of it untouched.
    pub async fn set_firewall_rule_enabled(
        &self,
        id: &str,
        enabled: bool,
    ) -> Result<FirewallRule, Error> {
        let mut rule = self
            .get_firewall_rule(id)
            .await?
            .ok_or_else(|| Error::Http {
                status: 404,
                message: format!("firewall rule '{id}' not found"),
            })?;
        rule.enabled = Some(enabled);
        self.update_firewall_rule(&rule).await
    }

    pub async fn delete_firewall_rule(&self, id: &str) -> Result<(), Error> {
        let url = self.url(PATH, Some(require_id(id, "firewall rule")?))?;
        debug!(site = self.name(), id, "deleting firewall rule");
        let _: Vec<serde_json::Value> = self.delete(url).await?;
        Ok(())
    }
}
