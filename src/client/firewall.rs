//! Firewall groups and rules

use super::{ApiError, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body for `POST /firewalls/{id}/rules`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallRuleRequest {
    /// "v4" or "v6"
    pub ip_type: String,
    /// "tcp", "udp", "icmp" or "gre"
    pub protocol: String,
    pub subnet: String,
    pub subnet_size: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl VultrClient {
    pub async fn list_firewall_groups(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/firewalls", "firewall_groups").await
    }

    pub async fn get_firewall_group(&self, group_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/firewalls/{}", group_id), "firewall_group")
            .await
    }

    pub async fn create_firewall_group(
        &self,
        description: Option<&str>,
    ) -> Result<Value, ApiError> {
        let body = match description {
            Some(description) => json!({ "description": description }),
            None => json!({}),
        };
        let created = self.post("/firewalls", &body).await?;
        Ok(super::unwrap_envelope(created, "firewall_group"))
    }

    pub async fn update_firewall_group(
        &self,
        group_id: &str,
        description: &str,
    ) -> Result<Value, ApiError> {
        self.put(
            &format!("/firewalls/{}", group_id),
            &json!({ "description": description }),
        )
        .await
    }

    pub async fn delete_firewall_group(&self, group_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/firewalls/{}", group_id)).await
    }

    pub async fn list_firewall_rules(&self, group_id: &str) -> Result<Vec<Value>, ApiError> {
        self.list_all(&format!("/firewalls/{}/rules", group_id), "firewall_rules")
            .await
    }

    pub async fn get_firewall_rule(
        &self,
        group_id: &str,
        rule_id: &str,
    ) -> Result<Value, ApiError> {
        self.get_object(
            &format!("/firewalls/{}/rules/{}", group_id, rule_id),
            "firewall_rule",
        )
        .await
    }

    pub async fn create_firewall_rule(
        &self,
        group_id: &str,
        rule: &FirewallRuleRequest,
    ) -> Result<Value, ApiError> {
        let created = self
            .post(&format!("/firewalls/{}/rules", group_id), rule)
            .await?;
        Ok(super::unwrap_envelope(created, "firewall_rule"))
    }

    pub async fn delete_firewall_rule(
        &self,
        group_id: &str,
        rule_id: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&format!("/firewalls/{}/rules/{}", group_id, rule_id))
            .await
    }
}
