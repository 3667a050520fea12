//! Firewall group and rule tools

use super::{parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{FirewallRuleRequest, VultrClient};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

const GROUP: IdentifierResolver = IdentifierResolver::new("Firewall group", &["description"]);

#[derive(Debug, Deserialize)]
struct GroupArgs {
    firewall_group_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateGroupArgs {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateGroupArgs {
    firewall_group_id: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct RuleArgs {
    firewall_group_id: String,
    firewall_rule_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateRuleArgs {
    firewall_group_id: String,
    #[serde(flatten)]
    rule: FirewallRuleRequest,
}

#[derive(Debug, Deserialize)]
struct WebServerArgs {
    firewall_group_id: String,
    #[serde(default = "anywhere")]
    allow_ssh_from: String,
}

fn anywhere() -> String {
    "0.0.0.0/0".to_string()
}

/// Split `10.0.0.0/8` into subnet and prefix size; a bare address is a /32
fn parse_subnet(cidr: &str) -> Result<(String, u8), ToolError> {
    let (subnet, size) = match cidr.split_once('/') {
        Some((subnet, size)) => {
            let size = size
                .parse::<u8>()
                .ok()
                .filter(|size| *size <= 32)
                .ok_or_else(|| ToolError::InvalidArguments(format!("invalid subnet size in '{}'", cidr)))?;
            (subnet, size)
        }
        None => (cidr, 32),
    };
    if subnet.parse::<std::net::Ipv4Addr>().is_err() {
        return Err(ToolError::InvalidArguments(format!(
            "'{}' is not an IPv4 subnet",
            cidr
        )));
    }
    Ok((subnet.to_string(), size))
}

fn web_rule(
    protocol: &str,
    port: Option<&str>,
    subnet: &str,
    size: u8,
    notes: &str,
) -> FirewallRuleRequest {
    FirewallRuleRequest {
        ip_type: "v4".to_string(),
        protocol: protocol.to_string(),
        subnet: subnet.to_string(),
        subnet_size: size,
        port: port.map(str::to_string),
        source: None,
        notes: Some(notes.to_string()),
    }
}

pub struct FirewallTools {
    client: Arc<VultrClient>,
}

impl FirewallTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(GROUP
            .resolve(identifier, || self.client.list_firewall_groups())
            .await?)
    }

    async fn setup_web_server_rules(&self, args: WebServerArgs) -> Result<Value, ToolError> {
        let (ssh_subnet, ssh_size) = parse_subnet(&args.allow_ssh_from)?;
        let group_id = self.resolve(&args.firewall_group_id).await?;

        let rules = [
            web_rule("tcp", Some("80"), "0.0.0.0", 0, "HTTP"),
            web_rule("tcp", Some("443"), "0.0.0.0", 0, "HTTPS"),
            web_rule("tcp", Some("22"), &ssh_subnet, ssh_size, "SSH"),
            web_rule("icmp", None, "0.0.0.0", 0, "ICMP"),
        ];

        let mut created = Vec::with_capacity(rules.len());
        for rule in &rules {
            created.push(self.client.create_firewall_rule(&group_id, rule).await?);
        }
        info!(group = %group_id, rules = created.len(), "Web server firewall rules created");

        Ok(json!(created))
    }
}

fn group_schema() -> Value {
    Schema::new()
        .string("firewall_group_id", "Firewall group ID or description")
        .required()
        .build()
}

fn rule_schema() -> Value {
    Schema::new()
        .string("firewall_group_id", "Firewall group ID or description")
        .required()
        .string("firewall_rule_id", "Firewall rule ID")
        .required()
        .build()
}

#[async_trait]
impl ToolModule for FirewallTools {
    fn prefix(&self) -> &'static str {
        "firewall"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list_groups", "List all firewall groups", Schema::new().build()),
            Tool::new("get_group", "Get a firewall group", group_schema()),
            Tool::new(
                "create_group",
                "Create a firewall group",
                Schema::new()
                    .string("description", "Group description")
                    .build(),
            ),
            Tool::new(
                "update_group",
                "Change the description of a firewall group",
                Schema::new()
                    .string("firewall_group_id", "Firewall group ID or description")
                    .required()
                    .string("description", "New description")
                    .required()
                    .build(),
            ),
            Tool::new("delete_group", "Delete a firewall group", group_schema()),
            Tool::new("list_rules", "List the rules of a firewall group", group_schema()),
            Tool::new("get_rule", "Get a firewall rule", rule_schema()),
            Tool::new(
                "create_rule",
                "Add a rule to a firewall group",
                Schema::new()
                    .string("firewall_group_id", "Firewall group ID or description")
                    .required()
                    .string("ip_type", "IP version")
                    .one_of(&["v4", "v6"])
                    .required()
                    .string("protocol", "Protocol")
                    .one_of(&["tcp", "udp", "icmp", "gre"])
                    .required()
                    .string("subnet", "Source subnet address")
                    .required()
                    .integer("subnet_size", "Source subnet prefix size")
                    .required()
                    .string("port", "Port or range, e.g. 8000:9000")
                    .string("source", "Use \"cloudflare\" to allow only Cloudflare IPs")
                    .string("notes", "Rule notes")
                    .build(),
            ),
            Tool::new("delete_rule", "Delete a firewall rule", rule_schema()),
            Tool::new(
                "setup_web_server_rules",
                "Add the usual web server rules: HTTP and HTTPS from anywhere, SSH from a subnet, and ICMP",
                Schema::new()
                    .string("firewall_group_id", "Firewall group ID or description")
                    .required()
                    .string("allow_ssh_from", "Subnet allowed to reach SSH")
                    .default_value("0.0.0.0/0")
                    .build(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list_groups" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_firewall_groups().await?))
            }
            "get_group" => {
                let args: GroupArgs = parse_args(args)?;
                let id = self.resolve(&args.firewall_group_id).await?;
                Ok(self.client.get_firewall_group(&id).await?)
            }
            "create_group" => {
                let args: CreateGroupArgs = parse_args(args)?;
                Ok(self
                    .client
                    .create_firewall_group(args.description.as_deref())
                    .await?)
            }
            "update_group" => {
                let args: UpdateGroupArgs = parse_args(args)?;
                let id = self.resolve(&args.firewall_group_id).await?;
                self.client.update_firewall_group(&id, &args.description).await?;
                Ok(success(format!("Firewall group {} updated successfully", id)))
            }
            "delete_group" => {
                let args: GroupArgs = parse_args(args)?;
                let id = self.resolve(&args.firewall_group_id).await?;
                self.client.delete_firewall_group(&id).await?;
                Ok(success(format!("Firewall group {} deleted successfully", id)))
            }
            "list_rules" => {
                let args: GroupArgs = parse_args(args)?;
                let id = self.resolve(&args.firewall_group_id).await?;
                Ok(json!(self.client.list_firewall_rules(&id).await?))
            }
            "get_rule" => {
                let args: RuleArgs = parse_args(args)?;
                let id = self.resolve(&args.firewall_group_id).await?;
                Ok(self
                    .client
                    .get_firewall_rule(&id, &args.firewall_rule_id)
                    .await?)
            }
            "create_rule" => {
                let args: CreateRuleArgs = parse_args(args)?;
                let id = self.resolve(&args.firewall_group_id).await?;
                Ok(self.client.create_firewall_rule(&id, &args.rule).await?)
            }
            "delete_rule" => {
                let args: RuleArgs = parse_args(args)?;
                let id = self.resolve(&args.firewall_group_id).await?;
                self.client
                    .delete_firewall_rule(&id, &args.firewall_rule_id)
                    .await?;
                Ok(success(format!(
                    "Firewall rule {} deleted successfully",
                    args.firewall_rule_id
                )))
            }
            "setup_web_server_rules" => self.setup_web_server_rules(parse_args(args)?).await,
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("firewall://groups", "firewall-groups", "All firewall groups"),
            ResourceDef::json(
                "firewall://groups/{firewall_group_id}",
                "firewall-group",
                "One firewall group",
            ),
            ResourceDef::json(
                "firewall://groups/{firewall_group_id}/rules",
                "firewall-rules",
                "Rules of a firewall group",
            ),
            ResourceDef::json(
                "firewall://groups/{firewall_group_id}/rules/{firewall_rule_id}",
                "firewall-rule",
                "One firewall rule",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "firewall://groups" => Ok(json!(self.client.list_firewall_groups().await?)),
            "firewall://groups/{firewall_group_id}" => {
                let id = self.resolve(uri_param(params, "firewall_group_id")?).await?;
                Ok(self.client.get_firewall_group(&id).await?)
            }
            "firewall://groups/{firewall_group_id}/rules" => {
                let id = self.resolve(uri_param(params, "firewall_group_id")?).await?;
                Ok(json!(self.client.list_firewall_rules(&id).await?))
            }
            "firewall://groups/{firewall_group_id}/rules/{firewall_rule_id}" => {
                let id = self.resolve(uri_param(params, "firewall_group_id")?).await?;
                Ok(self
                    .client
                    .get_firewall_rule(&id, uri_param(params, "firewall_rule_id")?)
                    .await?)
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

    const GROUP_ID: &str = "1234abcd-0000-4000-8000-000000000001";

    #[test]
    fn test_parse_subnet() {
        assert_eq!(parse_subnet("10.0.0.0/8").unwrap(), ("10.0.0.0".to_string(), 8));
        assert_eq!(parse_subnet("203.0.113.7").unwrap(), ("203.0.113.7".to_string(), 32));
        assert!(parse_subnet("10.0.0.0/40").is_err());
        assert!(parse_subnet("office").is_err());
    }

    #[tokio::test]
    async fn test_setup_web_server_rules() {
        let mock = Arc::new(MockTransport::new());
        let tools = FirewallTools::new(Arc::new(VultrClient::new(mock.clone())));
        let path = format!("/firewalls/{}/rules", GROUP_ID);
        mock.on(Method::POST, &path, 201, json!({"firewall_rule": {"id": 1}}));

        let created = tools
            .call(
                "setup_web_server_rules",
                json!({"firewall_group_id": GROUP_ID, "allow_ssh_from": "198.51.100.0/24"}),
            )
            .await
            .unwrap();
        assert_eq!(created.as_array().unwrap().len(), 4);

        let bodies: Vec<Value> = mock.requests().into_iter().filter_map(|r| r.body).collect();
        let ports: Vec<&Value> = bodies.iter().map(|b| &b["port"]).collect();
        assert_eq!(ports, vec![&json!("80"), &json!("443"), &json!("22"), &Value::Null]);
        assert_eq!(bodies[2]["subnet"], "198.51.100.0");
        assert_eq!(bodies[2]["subnet_size"], 24);
        assert_eq!(bodies[3]["protocol"], "icmp");
    }

    #[tokio::test]
    async fn test_group_by_description() {
        let mock = Arc::new(MockTransport::new());
        let tools = FirewallTools::new(Arc::new(VultrClient::new(mock.clone())));
        mock.on(
            Method::GET,
            "/firewalls",
            200,
            json!({"firewall_groups": [{"id": GROUP_ID, "description": "web"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on(
            Method::GET,
            &format!("/firewalls/{}/rules", GROUP_ID),
            200,
            json!({"firewall_rules": [{"id": 1}, {"id": 2}], "meta": {"links": {"next": ""}}}),
        );

        let rules = tools
            .call("list_rules", json!({"firewall_group_id": "web"}))
            .await
            .unwrap();
        assert_eq!(rules.as_array().unwrap().len(), 2);
    }
}
