//! Compute instance tools

use super::{parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{CreateInstanceRequest, UpdateInstanceRequest, VultrClient};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Instances are matched by label, then hostname
pub(crate) const INSTANCE: IdentifierResolver =
    IdentifierResolver::new("Instance", &["label", "hostname"]);

/// Resolve an instance ID, label or hostname to its ID
pub(crate) async fn resolve_instance(
    client: &VultrClient,
    identifier: &str,
) -> Result<String, ToolError> {
    Ok(INSTANCE
        .resolve(identifier, || client.list_instances())
        .await?)
}

#[derive(Debug, Deserialize)]
struct InstanceArgs {
    instance_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    instance_id: String,
    #[serde(flatten)]
    update: UpdateInstanceRequest,
}

#[derive(Debug, Deserialize)]
struct ReinstallArgs {
    instance_id: String,
    #[serde(default)]
    hostname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateIpv4Args {
    instance_id: String,
    #[serde(default)]
    reboot: bool,
}

#[derive(Debug, Deserialize)]
struct DeleteIpv4Args {
    instance_id: String,
    ipv4: String,
}

pub struct InstanceTools {
    client: Arc<VultrClient>,
}

impl InstanceTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        resolve_instance(&self.client, identifier).await
    }
}

fn instance_schema() -> Value {
    Schema::new()
        .string("instance_id", "Instance ID, label or hostname")
        .required()
        .build()
}

#[async_trait]
impl ToolModule for InstanceTools {
    fn prefix(&self) -> &'static str {
        "instances"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List all instances", Schema::new().build()),
            Tool::new("get", "Get details of an instance", instance_schema()),
            Tool::new(
                "create",
                "Create an instance",
                Schema::new()
                    .string("region", "Region ID, e.g. ewr")
                    .required()
                    .string("plan", "Plan ID, e.g. vc2-1c-1gb")
                    .required()
                    .string("label", "Instance label")
                    .integer("os_id", "Operating system ID")
                    .string("iso_id", "ISO ID to boot from")
                    .string("script_id", "Startup script ID")
                    .string("snapshot_id", "Snapshot ID to restore")
                    .boolean("enable_ipv6", "Enable IPv6")
                    .string_array("attach_vpc", "VPC IDs to attach")
                    .string_array("ssh_key_ids", "SSH key IDs to install")
                    .string("backups", "Automatic backups")
                    .one_of(&["enabled", "disabled"])
                    .integer("app_id", "Marketplace application ID")
                    .string("user_data", "Base64-encoded cloud-init user data")
                    .boolean("ddos_protection", "Enable DDoS protection")
                    .boolean("activation_email", "Send an activation email")
                    .string("hostname", "Hostname")
                    .string_array("tags", "Tags")
                    .string("firewall_group_id", "Firewall group ID")
                    .string("reserved_ipv4", "Reserved IPv4 address to use")
                    .build(),
            ),
            Tool::new(
                "update",
                "Update an instance",
                Schema::new()
                    .string("instance_id", "Instance ID, label or hostname")
                    .required()
                    .string("label", "New label")
                    .string_array("tags", "Tags")
                    .string("plan", "Plan ID to upgrade to")
                    .boolean("enable_ipv6", "Enable IPv6")
                    .string("backups", "Automatic backups")
                    .one_of(&["enabled", "disabled"])
                    .boolean("ddos_protection", "Enable DDoS protection")
                    .string("firewall_group_id", "Firewall group ID")
                    .string("user_data", "Base64-encoded cloud-init user data")
                    .build(),
            ),
            Tool::new("delete", "Delete an instance", instance_schema()),
            Tool::new("start", "Start a stopped instance", instance_schema()),
            Tool::new("stop", "Stop (halt) an instance", instance_schema()),
            Tool::new("reboot", "Reboot an instance", instance_schema()),
            Tool::new(
                "reinstall",
                "Reinstall the operating system of an instance; all data is lost",
                Schema::new()
                    .string("instance_id", "Instance ID, label or hostname")
                    .required()
                    .string("hostname", "New hostname")
                    .build(),
            ),
            Tool::new("get_bandwidth", "Get bandwidth usage of an instance", instance_schema()),
            Tool::new("list_ipv4", "List IPv4 addresses of an instance", instance_schema()),
            Tool::new(
                "create_ipv4",
                "Add an IPv4 address to an instance",
                Schema::new()
                    .string("instance_id", "Instance ID, label or hostname")
                    .required()
                    .boolean("reboot", "Reboot the instance to apply the address")
                    .default_value(false)
                    .build(),
            ),
            Tool::new(
                "delete_ipv4",
                "Remove an IPv4 address from an instance",
                Schema::new()
                    .string("instance_id", "Instance ID, label or hostname")
                    .required()
                    .string("ipv4", "IPv4 address to remove")
                    .required()
                    .build(),
            ),
            Tool::new("list_ipv6", "List IPv6 addresses of an instance", instance_schema()),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_instances().await?))
            }
            "get" => {
                let args: InstanceArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                Ok(self.client.get_instance(&id).await?)
            }
            "create" => {
                let request: CreateInstanceRequest = parse_args(args)?;
                if request.os_id.is_none()
                    && request.iso_id.is_none()
                    && request.snapshot_id.is_none()
                    && request.app_id.is_none()
                {
                    return Err(ToolError::InvalidArguments(
                        "one of os_id, iso_id, snapshot_id or app_id is required".to_string(),
                    ));
                }
                Ok(self.client.create_instance(&request).await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                self.client.update_instance(&id, &args.update).await?;
                Ok(success(format!("Instance {} updated successfully", id)))
            }
            "delete" => {
                let args: InstanceArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                self.client.delete_instance(&id).await?;
                Ok(success(format!("Instance {} deleted successfully", id)))
            }
            "start" => {
                let args: InstanceArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                self.client.start_instance(&id).await?;
                Ok(success(format!("Instance {} started", id)))
            }
            "stop" => {
                let args: InstanceArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                self.client.stop_instance(&id).await?;
                Ok(success(format!("Instance {} stopped", id)))
            }
            "reboot" => {
                let args: InstanceArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                self.client.reboot_instance(&id).await?;
                Ok(success(format!("Instance {} rebooted", id)))
            }
            "reinstall" => {
                let args: ReinstallArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                Ok(self
                    .client
                    .reinstall_instance(&id, args.hostname.as_deref())
                    .await?)
            }
            "get_bandwidth" => {
                let args: InstanceArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                Ok(self.client.get_instance_bandwidth(&id).await?)
            }
            "list_ipv4" => {
                let args: InstanceArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                Ok(json!(self.client.list_instance_ipv4(&id).await?))
            }
            "create_ipv4" => {
                let args: CreateIpv4Args = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                Ok(self.client.create_instance_ipv4(&id, args.reboot).await?)
            }
            "delete_ipv4" => {
                let args: DeleteIpv4Args = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                self.client.delete_instance_ipv4(&id, &args.ipv4).await?;
                Ok(success(format!("IPv4 {} removed from instance {}", args.ipv4, id)))
            }
            "list_ipv6" => {
                let args: InstanceArgs = parse_args(args)?;
                let id = self.resolve(&args.instance_id).await?;
                Ok(json!(self.client.list_instance_ipv6(&id).await?))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("instances://list", "instances", "All instances"),
            ResourceDef::json("instances://{instance_id}", "instance", "One instance by ID, label or hostname"),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "instances://list" => Ok(json!(self.client.list_instances().await?)),
            "instances://{instance_id}" => {
                let id = self.resolve(uri_param(params, "instance_id")?).await?;
                Ok(self.client.get_instance(&id).await?)
            }
            _ => Err(ToolError::UnknownResource(template.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use crate::router::ResolveError;
    use reqwest::Method;

    const ID: &str = "cb676a46-66fd-4dfb-b839-443f2e6c0b60";

    fn tools() -> (Arc<MockTransport>, InstanceTools) {
        let mock = Arc::new(MockTransport::new());
        let client = Arc::new(VultrClient::new(mock.clone()));
        (mock, InstanceTools::new(client))
    }

    fn with_instances(mock: &MockTransport) {
        mock.on(
            Method::GET,
            "/instances",
            200,
            json!({
                "instances": [
                    {"id": ID, "label": "web-1", "hostname": "web1.example.com"},
                    {"id": "other", "label": "db-1", "hostname": "db1"}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
    }

    #[tokio::test]
    async fn test_uuid_skips_listing() {
        let (mock, tools) = tools();
        mock.on(Method::GET, &format!("/instances/{}", ID), 200, json!({"instance": {"id": ID}}));

        let instance = tools.call("get", json!({"instance_id": ID})).await.unwrap();
        assert_eq!(instance["id"], ID);
        assert_eq!(mock.count(Method::GET, "/instances"), 0);
    }

    #[tokio::test]
    async fn test_resolves_by_hostname() {
        let (mock, tools) = tools();
        with_instances(&mock);
        mock.on(Method::POST, &format!("/instances/{}/halt", ID), 204, Value::Null);

        let result = tools
            .call("stop", json!({"instance_id": "web1.example.com"}))
            .await
            .unwrap();
        assert_eq!(result["status"], "success");
        assert_eq!(mock.count(Method::POST, &format!("/instances/{}/halt", ID)), 1);
    }

    #[tokio::test]
    async fn test_unknown_label_is_not_found() {
        let (mock, tools) = tools();
        with_instances(&mock);

        let err = tools
            .call("reboot", json!({"instance_id": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Resolve(ResolveError::NotFound { .. })));
        assert!(err.to_string().contains("'nope' not found"));
    }

    #[tokio::test]
    async fn test_create_requires_an_image() {
        let (mock, tools) = tools();
        let err = tools
            .call("create", json!({"region": "ewr", "plan": "vc2-1c-1gb"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_sends_only_given_fields() {
        let (mock, tools) = tools();
        with_instances(&mock);
        mock.on(Method::PATCH, &format!("/instances/{}", ID), 202, json!({"instance": {}}));

        tools
            .call("update", json!({"instance_id": "web-1", "label": "web-2"}))
            .await
            .unwrap();

        let patch = mock
            .requests()
            .into_iter()
            .find(|r| r.method == Method::PATCH)
            .unwrap();
        assert_eq!(patch.body.unwrap(), json!({"label": "web-2"}));
    }
}
