//! Load balancers

use super::{ApiError, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardingRule {
    pub frontend_protocol: String,
    pub frontend_port: u16,
    pub backend_protocol: String,
    pub backend_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub protocol: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unhealthy_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_threshold: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbFirewallRule {
    pub port: u16,
    pub source: String,
    /// "v4" or "v6"
    pub ip_type: String,
}

/// Body for both `POST /load-balancers` and `PATCH /load-balancers/{id}`
///
/// Everything but `region` is optional, and `region` is only sent on create.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadBalancerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// "roundrobin" or "leastconn"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balancing_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_redirect: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http3: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_protocol: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarding_rules: Option<Vec<ForwardingRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall_rules: Option<Vec<LbFirewallRule>>,
    /// `{private_key, certificate, chain}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<Value>,
    /// `{domain_zone, domain_sub}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_ssl: Option<Value>,
    /// `{cookie_name}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky_session: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<String>,
}

fn lb_path(load_balancer_id: &str) -> String {
    format!("/load-balancers/{}", load_balancer_id)
}

impl VultrClient {
    pub async fn list_load_balancers(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/load-balancers", "load_balancers").await
    }

    pub async fn get_load_balancer(&self, load_balancer_id: &str) -> Result<Value, ApiError> {
        self.get_object(&lb_path(load_balancer_id), "load_balancer")
            .await
    }

    pub async fn create_load_balancer(
        &self,
        request: &LoadBalancerRequest,
    ) -> Result<Value, ApiError> {
        let body = self.post("/load-balancers", request).await?;
        Ok(super::unwrap_envelope(body, "load_balancer"))
    }

    pub async fn update_load_balancer(
        &self,
        load_balancer_id: &str,
        request: &LoadBalancerRequest,
    ) -> Result<Value, ApiError> {
        self.patch(&lb_path(load_balancer_id), request).await
    }

    pub async fn delete_load_balancer(&self, load_balancer_id: &str) -> Result<Value, ApiError> {
        self.delete(&lb_path(load_balancer_id)).await
    }

    pub async fn delete_load_balancer_ssl(
        &self,
        load_balancer_id: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&format!("{}/ssl", lb_path(load_balancer_id)))
            .await
    }

    pub async fn disable_load_balancer_auto_ssl(
        &self,
        load_balancer_id: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&format!("{}/auto_ssl", lb_path(load_balancer_id)))
            .await
    }

    pub async fn list_load_balancer_forwarding_rules(
        &self,
        load_balancer_id: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.list_all(
            &format!("{}/forwarding-rules", lb_path(load_balancer_id)),
            "forwarding_rules",
        )
        .await
    }

    pub async fn create_load_balancer_forwarding_rule(
        &self,
        load_balancer_id: &str,
        rule: &ForwardingRule,
    ) -> Result<Value, ApiError> {
        let body = self
            .post(
                &format!("{}/forwarding-rules", lb_path(load_balancer_id)),
                rule,
            )
            .await?;
        Ok(super::unwrap_envelope(body, "forwarding_rule"))
    }

    pub async fn get_load_balancer_forwarding_rule(
        &self,
        load_balancer_id: &str,
        rule_id: &str,
    ) -> Result<Value, ApiError> {
        self.get_object(
            &format!("{}/forwarding-rules/{}", lb_path(load_balancer_id), rule_id),
            "forwarding_rule",
        )
        .await
    }

    pub async fn delete_load_balancer_forwarding_rule(
        &self,
        load_balancer_id: &str,
        rule_id: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&format!(
            "{}/forwarding-rules/{}",
            lb_path(load_balancer_id),
            rule_id
        ))
        .await
    }

    pub async fn list_load_balancer_firewall_rules(
        &self,
        load_balancer_id: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.list_all(
            &format!("{}/firewall-rules", lb_path(load_balancer_id)),
            "firewall_rules",
        )
        .await
    }

    pub async fn get_load_balancer_firewall_rule(
        &self,
        load_balancer_id: &str,
        rule_id: &str,
    ) -> Result<Value, ApiError> {
        self.get_object(
            &format!("{}/firewall-rules/{}", lb_path(load_balancer_id), rule_id),
            "firewall_rule",
        )
        .await
    }
}
