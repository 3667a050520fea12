//! Load balancer tools

use super::instances::resolve_instance;
use super::{parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{ForwardingRule, HealthCheck, LbFirewallRule, LoadBalancerRequest, VultrClient};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const LOAD_BALANCER: IdentifierResolver = IdentifierResolver::new("Load balancer", &["label"]);

const DEFAULT_ALGORITHM: &str = "roundrobin";
const DEFAULT_TIMEOUT: u32 = 600;
const ANYWHERE_V4: &str = "0.0.0.0/0";

#[derive(Debug, Deserialize)]
struct LbArgs {
    load_balancer_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    load_balancer_id: String,
    #[serde(flatten)]
    request: LoadBalancerRequest,
}

#[derive(Debug, Deserialize)]
struct CreateRuleArgs {
    load_balancer_id: String,
    #[serde(flatten)]
    rule: ForwardingRule,
}

#[derive(Debug, Deserialize)]
struct ForwardingRuleArgs {
    load_balancer_id: String,
    forwarding_rule_id: String,
}

#[derive(Debug, Deserialize)]
struct FirewallRuleArgs {
    load_balancer_id: String,
    firewall_rule_id: String,
}

#[derive(Debug, Deserialize)]
struct BasicWebArgs {
    region: String,
    label: String,
    /// Instance IDs, labels or hostnames
    backend_instances: Vec<String>,
    #[serde(default = "yes")]
    enable_ssl: bool,
    #[serde(default = "yes")]
    ssl_redirect: bool,
    #[serde(default)]
    domain_zone: Option<String>,
    #[serde(default)]
    domain_sub: Option<String>,
}

fn yes() -> bool {
    true
}

/// Frontend rule that always lands on plain HTTP/80 at the backends
fn web_rule(frontend_protocol: &str, frontend_port: u16) -> ForwardingRule {
    ForwardingRule {
        frontend_protocol: frontend_protocol.to_string(),
        frontend_port,
        backend_protocol: "http".to_string(),
        backend_port: 80,
    }
}

fn open_port(port: u16) -> LbFirewallRule {
    LbFirewallRule {
        port,
        source: ANYWHERE_V4.to_string(),
        ip_type: "v4".to_string(),
    }
}

/// Request for a roundrobin HTTP(S) load balancer in front of `instances`.
///
/// TLS terminates at the load balancer.
fn basic_web_request(args: &BasicWebArgs, instances: Vec<String>) -> LoadBalancerRequest {
    let mut forwarding_rules = vec![web_rule("http", 80)];
    let mut firewall_rules = vec![open_port(80)];
    if args.enable_ssl {
        forwarding_rules.push(web_rule("https", 443));
        firewall_rules.push(open_port(443));
    }

    let auto_ssl = match (&args.domain_zone, args.enable_ssl) {
        (Some(zone), true) => Some(json!({
            "domain_zone": zone,
            "domain_sub": args.domain_sub.as_deref().unwrap_or("www"),
        })),
        _ => None,
    };

    LoadBalancerRequest {
        region: Some(args.region.clone()),
        label: Some(args.label.clone()),
        balancing_algorithm: Some(DEFAULT_ALGORITHM.to_string()),
        ssl_redirect: Some(args.enable_ssl && args.ssl_redirect),
        health_check: Some(HealthCheck {
            protocol: "http".to_string(),
            port: 80,
            path: Some("/".to_string()),
            check_interval: Some(15),
            response_timeout: Some(5),
            unhealthy_threshold: Some(3),
            healthy_threshold: Some(2),
        }),
        forwarding_rules: Some(forwarding_rules),
        firewall_rules: Some(firewall_rules),
        auto_ssl,
        instances: Some(instances),
        ..Default::default()
    }
}

fn configuration_summary(lb: &Value) -> Value {
    let field = |name: &str| lb.get(name).cloned().unwrap_or(Value::Null);
    let list = |name: &str| lb.get(name).cloned().unwrap_or_else(|| json!([]));
    let generic = lb.get("generic_info").cloned().unwrap_or_else(|| json!({}));
    let setting = |name: &str| generic.get(name).cloned().unwrap_or(Value::Null);

    json!({
        "basic_info": {
            "id": field("id"),
            "label": field("label"),
            "status": field("status"),
            "region": field("region"),
            "date_created": field("date_created"),
        },
        "network": {
            "ipv4": field("ipv4"),
            "ipv6": field("ipv6"),
            "vpc": setting("vpc"),
        },
        "configuration": {
            "balancing_algorithm": setting("balancing_algorithm"),
            "ssl_redirect": setting("ssl_redirect"),
            "proxy_protocol": setting("proxy_protocol"),
            "timeout": setting("timeout"),
            "sticky_sessions": setting("sticky_sessions"),
        },
        "ssl": {"has_ssl": lb.get("has_ssl").cloned().unwrap_or(json!(false))},
        "health_check": lb.get("health_check").cloned().unwrap_or_else(|| json!({})),
        "forwarding_rules": list("forward_rules"),
        "firewall_rules": list("firewall_rules"),
        "backend": {
            "nodes": field("nodes"),
            "instances": list("instances"),
        },
    })
}

pub struct LoadBalancerTools {
    client: Arc<VultrClient>,
}

impl LoadBalancerTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(LOAD_BALANCER
            .resolve(identifier, || self.client.list_load_balancers())
            .await?)
    }

    async fn configure_basic_web(&self, args: BasicWebArgs) -> Result<Value, ToolError> {
        if args.backend_instances.is_empty() {
            return Err(ToolError::InvalidArguments(
                "backend_instances must name at least one instance".to_string(),
            ));
        }
        let mut instances = Vec::with_capacity(args.backend_instances.len());
        for identifier in &args.backend_instances {
            instances.push(resolve_instance(&self.client, identifier).await?);
        }

        let request = basic_web_request(&args, instances);
        let load_balancer = self.client.create_load_balancer(&request).await?;
        Ok(json!({
            "load_balancer": load_balancer,
            "configuration": "basic_web",
            "message": format!("Basic web load balancer '{}' configured successfully", args.label),
        }))
    }
}

fn lb_schema() -> Schema {
    Schema::new()
        .string("load_balancer_id", "Load balancer ID or label")
        .required()
}

fn settings(schema: Schema) -> Schema {
    schema
        .string("label", "Label")
        .string("balancing_algorithm", "Balancing algorithm")
        .one_of(&["roundrobin", "leastconn"])
        .boolean("ssl_redirect", "Redirect HTTP to HTTPS")
        .boolean("http2", "Enable HTTP/2")
        .boolean("http3", "Enable HTTP/3")
        .boolean("proxy_protocol", "Enable the PROXY protocol")
        .integer("timeout", "Connection timeout in seconds")
        .integer("nodes", "Number of load balancer nodes (odd)")
        .object(
            "health_check",
            "protocol, port, path, check_interval, response_timeout, unhealthy_threshold, healthy_threshold",
        )
        .object_array(
            "forwarding_rules",
            "frontend_protocol, frontend_port, backend_protocol, backend_port",
        )
        .object_array("firewall_rules", "port, source, ip_type (v4 or v6)")
        .object("ssl", "private_key, certificate, chain")
        .object("auto_ssl", "domain_zone, domain_sub")
        .object("sticky_session", "cookie_name")
        .string_array("instances", "Attached instance IDs")
        .string("vpc", "VPC ID")
}

#[async_trait]
impl ToolModule for LoadBalancerTools {
    fn prefix(&self) -> &'static str {
        "load_balancer"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List all load balancers", Schema::new().build()),
            Tool::new("get", "Get a load balancer", lb_schema().build()),
            Tool::new(
                "create",
                "Create a load balancer",
                settings(Schema::new().string("region", "Region ID").required()).build(),
            ),
            Tool::new("update", "Change load balancer settings", settings(lb_schema()).build()),
            Tool::new("delete", "Delete a load balancer", lb_schema().build()),
            Tool::new("delete_ssl", "Remove the SSL certificate", lb_schema().build()),
            Tool::new("disable_auto_ssl", "Turn off automatic SSL", lb_schema().build()),
            Tool::new("list_forwarding_rules", "List forwarding rules", lb_schema().build()),
            Tool::new(
                "create_forwarding_rule",
                "Add a forwarding rule",
                lb_schema()
                    .string("frontend_protocol", "Frontend protocol")
                    .required()
                    .one_of(&["http", "https", "tcp"])
                    .integer("frontend_port", "Frontend port")
                    .required()
                    .string("backend_protocol", "Backend protocol")
                    .required()
                    .one_of(&["http", "https", "tcp"])
                    .integer("backend_port", "Backend port")
                    .required()
                    .build(),
            ),
            Tool::new(
                "get_forwarding_rule",
                "Get a forwarding rule",
                lb_schema()
                    .string("forwarding_rule_id", "Forwarding rule ID")
                    .required()
                    .build(),
            ),
            Tool::new(
                "delete_forwarding_rule",
                "Delete a forwarding rule",
                lb_schema()
                    .string("forwarding_rule_id", "Forwarding rule ID")
                    .required()
                    .build(),
            ),
            Tool::new("list_firewall_rules", "List firewall rules", lb_schema().build()),
            Tool::new(
                "get_firewall_rule",
                "Get a firewall rule",
                lb_schema()
                    .string("firewall_rule_id", "Firewall rule ID")
                    .required()
                    .build(),
            ),
            Tool::new(
                "configure_basic_web_lb",
                "Create a load balancer for web traffic: HTTP 80, optional HTTPS 443 terminated at the balancer, open firewall",
                Schema::new()
                    .string("region", "Region ID")
                    .required()
                    .string("label", "Label")
                    .required()
                    .string_array("backend_instances", "Instance IDs, labels or hostnames")
                    .required()
                    .boolean("enable_ssl", "Terminate HTTPS 443 and forward to backend HTTP 80")
                    .default_value(true)
                    .boolean("ssl_redirect", "Redirect HTTP to HTTPS")
                    .default_value(true)
                    .string("domain_zone", "Domain for automatic SSL")
                    .string("domain_sub", "Subdomain for automatic SSL")
                    .default_value("www")
                    .build(),
            ),
            Tool::new(
                "get_health_status",
                "Get status, health check and attached instances",
                lb_schema().build(),
            ),
            Tool::new(
                "get_configuration_summary",
                "Summarize network, balancing, SSL and backend settings",
                lb_schema().build(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_load_balancers().await?))
            }
            "get" => {
                let args: LbArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                Ok(self.client.get_load_balancer(&id).await?)
            }
            "create" => {
                let mut request: LoadBalancerRequest = parse_args(args)?;
                if request.region.is_none() {
                    return Err(ToolError::InvalidArguments("region is required".to_string()));
                }
                request.balancing_algorithm.get_or_insert_with(|| DEFAULT_ALGORITHM.to_string());
                request.timeout.get_or_insert(DEFAULT_TIMEOUT);
                request.nodes.get_or_insert(1);
                Ok(self.client.create_load_balancer(&request).await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                let request = LoadBalancerRequest {
                    region: None,
                    ..args.request
                };
                self.client.update_load_balancer(&id, &request).await?;
                Ok(success(format!("Load balancer {} updated successfully", args.load_balancer_id)))
            }
            "delete" => {
                let args: LbArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                self.client.delete_load_balancer(&id).await?;
                Ok(success(format!("Load balancer {} deleted successfully", args.load_balancer_id)))
            }
            "delete_ssl" => {
                let args: LbArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                self.client.delete_load_balancer_ssl(&id).await?;
                Ok(success(format!(
                    "SSL certificate removed from load balancer {}",
                    args.load_balancer_id
                )))
            }
            "disable_auto_ssl" => {
                let args: LbArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                self.client.disable_load_balancer_auto_ssl(&id).await?;
                Ok(success(format!(
                    "Auto SSL disabled for load balancer {}",
                    args.load_balancer_id
                )))
            }
            "list_forwarding_rules" => {
                let args: LbArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                Ok(json!(self.client.list_load_balancer_forwarding_rules(&id).await?))
            }
            "create_forwarding_rule" => {
                let args: CreateRuleArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                Ok(self
                    .client
                    .create_load_balancer_forwarding_rule(&id, &args.rule)
                    .await?)
            }
            "get_forwarding_rule" => {
                let args: ForwardingRuleArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                Ok(self
                    .client
                    .get_load_balancer_forwarding_rule(&id, &args.forwarding_rule_id)
                    .await?)
            }
            "delete_forwarding_rule" => {
                let args: ForwardingRuleArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                self.client
                    .delete_load_balancer_forwarding_rule(&id, &args.forwarding_rule_id)
                    .await?;
                Ok(success(format!(
                    "Forwarding rule {} deleted successfully",
                    args.forwarding_rule_id
                )))
            }
            "list_firewall_rules" => {
                let args: LbArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                Ok(json!(self.client.list_load_balancer_firewall_rules(&id).await?))
            }
            "get_firewall_rule" => {
                let args: FirewallRuleArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                Ok(self
                    .client
                    .get_load_balancer_firewall_rule(&id, &args.firewall_rule_id)
                    .await?)
            }
            "configure_basic_web_lb" => self.configure_basic_web(parse_args(args)?).await,
            "get_health_status" => {
                let args: LbArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                let lb = self.client.get_load_balancer(&id).await?;
                let field = |name: &str| lb.get(name).cloned().unwrap_or(Value::Null);
                Ok(json!({
                    "id": field("id"),
                    "label": field("label"),
                    "status": field("status"),
                    "region": field("region"),
                    "ipv4": field("ipv4"),
                    "ipv6": field("ipv6"),
                    "has_ssl": lb.get("has_ssl").cloned().unwrap_or(json!(false)),
                    "health_check": lb.get("health_check").cloned().unwrap_or_else(|| json!({})),
                    "instances": lb.get("instances").cloned().unwrap_or_else(|| json!([])),
                    "forwarding_rules": lb.get("forward_rules").cloned().unwrap_or_else(|| json!([])),
                }))
            }
            "get_configuration_summary" => {
                let args: LbArgs = parse_args(args)?;
                let id = self.resolve(&args.load_balancer_id).await?;
                Ok(configuration_summary(&self.client.get_load_balancer(&id).await?))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("load_balancers://list", "load-balancers", "All load balancers"),
            ResourceDef::json(
                "load_balancers://{load_balancer_id}",
                "load-balancer",
                "One load balancer by ID or label",
            ),
            ResourceDef::json(
                "load_balancers://{load_balancer_id}/forwarding_rules",
                "forwarding-rules",
                "Forwarding rules of a load balancer",
            ),
            ResourceDef::json(
                "load_balancers://{load_balancer_id}/firewall_rules",
                "firewall-rules",
                "Firewall rules of a load balancer",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        if template == "load_balancers://list" {
            return Ok(json!(self.client.list_load_balancers().await?));
        }
        let id = self.resolve(uri_param(params, "load_balancer_id")?).await?;
        match template {
            "load_balancers://{load_balancer_id}" => Ok(self.client.get_load_balancer(&id).await?),
            "load_balancers://{load_balancer_id}/forwarding_rules" => {
                Ok(json!(self.client.list_load_balancer_forwarding_rules(&id).await?))
            }
            "load_balancers://{load_balancer_id}/firewall_rules" => {
                Ok(json!(self.client.list_load_balancer_firewall_rules(&id).await?))
            }
            _ => Err(ToolError::UnknownResource(template.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use reqwest::Method;

    fn tools() -> (Arc<MockTransport>, LoadBalancerTools) {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/load-balancers",
            200,
            json!({"load_balancers": [{"id": "lb-1", "label": "web-lb"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on(
            Method::GET,
            "/instances",
            200,
            json!({"instances": [{"id": "i-1", "label": "web-1", "hostname": "web-1"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on(Method::POST, "/load-balancers", 202, json!({"load_balancer": {"id": "lb-2"}}));
        let tools = LoadBalancerTools::new(Arc::new(VultrClient::new(mock.clone())));
        (mock, tools)
    }

    fn posted_body(mock: &MockTransport) -> Value {
        mock.requests()
            .into_iter()
            .find(|r| r.method == Method::POST)
            .and_then(|r| r.body)
            .unwrap()
    }

    #[tokio::test]
    async fn test_basic_web_with_ssl() {
        let (mock, tools) = tools();
        let result = tools
            .call(
                "configure_basic_web_lb",
                json!({
                    "region": "ewr",
                    "label": "site",
                    "backend_instances": ["web-1"],
                    "domain_zone": "example.com"
                }),
            )
            .await
            .unwrap();
        assert_eq!(result["configuration"], "basic_web");
        assert_eq!(result["load_balancer"]["id"], "lb-2");

        let body = posted_body(&mock);
        assert_eq!(body["instances"], json!(["i-1"]));
        assert_eq!(body["health_check"]["path"], "/");
        assert_eq!(body["health_check"]["port"], 80);
        assert_eq!(body["forwarding_rules"].as_array().unwrap().len(), 2);
        assert_eq!(
            body["forwarding_rules"][1],
            json!({
                "frontend_protocol": "https",
                "frontend_port": 443,
                "backend_protocol": "http",
                "backend_port": 80
            })
        );
        assert_eq!(body["auto_ssl"], json!({"domain_zone": "example.com", "domain_sub": "www"}));
        assert_eq!(body["ssl_redirect"], true);
    }

    #[tokio::test]
    async fn test_basic_web_without_ssl() {
        let (mock, tools) = tools();
        tools
            .call(
                "configure_basic_web_lb",
                json!({
                    "region": "ewr",
                    "label": "site",
                    "backend_instances": ["web-1"],
                    "enable_ssl": false,
                    "domain_zone": "example.com"
                }),
            )
            .await
            .unwrap();

        let body = posted_body(&mock);
        assert_eq!(body["forwarding_rules"].as_array().unwrap().len(), 1);
        assert_eq!(body["firewall_rules"], json!([{"port": 80, "source": "0.0.0.0/0", "ip_type": "v4"}]));
        assert!(body.get("auto_ssl").is_none());
        assert_eq!(body["ssl_redirect"], false);
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let (mock, tools) = tools();
        tools.call("create", json!({"region": "ams"})).await.unwrap();

        let body = posted_body(&mock);
        assert_eq!(body["balancing_algorithm"], "roundrobin");
        assert_eq!(body["timeout"], 600);
        assert_eq!(body["nodes"], 1);

        let err = tools.call("create", json!({"label": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_forwarding_rule_by_label() {
        let (mock, tools) = tools();
        mock.on(
            Method::POST,
            "/load-balancers/lb-1/forwarding-rules",
            201,
            json!({"forwarding_rule": {"id": "fr-1"}}),
        );

        let rule = tools
            .call(
                "create_forwarding_rule",
                json!({
                    "load_balancer_id": "web-lb",
                    "frontend_protocol": "tcp",
                    "frontend_port": 5432,
                    "backend_protocol": "tcp",
                    "backend_port": 5432
                }),
            )
            .await
            .unwrap();
        assert_eq!(rule["id"], "fr-1");
    }

    #[test]
    fn test_configuration_summary_shape() {
        let summary = configuration_summary(&json!({
            "id": "lb-1",
            "generic_info": {"balancing_algorithm": "leastconn"},
            "forward_rules": [{"id": "fr-1"}]
        }));
        assert_eq!(summary["configuration"]["balancing_algorithm"], "leastconn");
        assert_eq!(summary["forwarding_rules"][0]["id"], "fr-1");
        assert_eq!(summary["ssl"]["has_ssl"], false);
    }
}
