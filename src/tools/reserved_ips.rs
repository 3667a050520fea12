//! Reserved IP tools

use super::instances::resolve_instance;
use super::{filter_field, is_attached, parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{CreateReservedIpRequest, VultrClient};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const BY_ADDRESS: IdentifierResolver = IdentifierResolver::new("Reserved IP", &["subnet"]);
const BY_LABEL: IdentifierResolver = IdentifierResolver::new("Reserved IP", &["label"]);

/// Addresses look like IPs; anything else is a label
fn resolver_for(identifier: &str) -> IdentifierResolver {
    if identifier.contains('.') || identifier.contains(':') {
        BY_ADDRESS
    } else {
        BY_LABEL
    }
}

#[derive(Debug, Deserialize)]
struct ReservedIpArgs {
    reserved_ip: String,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    region: String,
    #[serde(default = "v4")]
    ip_type: String,
    #[serde(default)]
    label: Option<String>,
}

fn v4() -> String {
    "v4".to_string()
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    reserved_ip: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct AttachArgs {
    reserved_ip: String,
    instance_id: String,
}

#[derive(Debug, Deserialize)]
struct ConvertArgs {
    ip_address: String,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegionArgs {
    region: String,
}

pub struct ReservedIpTools {
    client: Arc<VultrClient>,
}

impl ReservedIpTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(resolver_for(identifier)
            .resolve(identifier, || self.client.list_reserved_ips())
            .await?)
    }
}

fn reserved_ip_schema() -> Value {
    Schema::new()
        .string("reserved_ip", "Reserved IP ID, address or label")
        .required()
        .build()
}

#[async_trait]
impl ToolModule for ReservedIpTools {
    fn prefix(&self) -> &'static str {
        "reserved_ips"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List all reserved IPs", Schema::new().build()),
            Tool::new("get", "Get a reserved IP", reserved_ip_schema()),
            Tool::new(
                "create",
                "Reserve an IP address in a region",
                Schema::new()
                    .string("region", "Region ID, e.g. ewr")
                    .required()
                    .string("ip_type", "IP version")
                    .one_of(&["v4", "v6"])
                    .default_value("v4")
                    .string("label", "Label")
                    .build(),
            ),
            Tool::new(
                "update",
                "Change the label of a reserved IP",
                Schema::new()
                    .string("reserved_ip", "Reserved IP ID, address or label")
                    .required()
                    .string("label", "New label")
                    .required()
                    .build(),
            ),
            Tool::new("delete", "Release a reserved IP", reserved_ip_schema()),
            Tool::new(
                "attach",
                "Attach a reserved IP to an instance",
                Schema::new()
                    .string("reserved_ip", "Reserved IP ID, address or label")
                    .required()
                    .string("instance_id", "Instance ID, label or hostname")
                    .required()
                    .build(),
            ),
            Tool::new("detach", "Detach a reserved IP from its instance", reserved_ip_schema()),
            Tool::new(
                "convert_instance_ip",
                "Turn an instance's existing IP address into a reserved IP",
                Schema::new()
                    .string("ip_address", "The instance's IP address")
                    .required()
                    .string("label", "Label for the reserved IP")
                    .build(),
            ),
            Tool::new(
                "list_by_region",
                "List the reserved IPs of a region",
                Schema::new()
                    .string("region", "Region ID")
                    .required()
                    .build(),
            ),
            Tool::new("list_unattached", "List reserved IPs not attached to any instance", Schema::new().build()),
            Tool::new("list_attached", "List reserved IPs attached to an instance", Schema::new().build()),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_reserved_ips().await?))
            }
            "get" => {
                let args: ReservedIpArgs = parse_args(args)?;
                let id = self.resolve(&args.reserved_ip).await?;
                Ok(self.client.get_reserved_ip(&id).await?)
            }
            "create" => {
                let args: CreateArgs = parse_args(args)?;
                let request = CreateReservedIpRequest {
                    region: args.region,
                    ip_type: args.ip_type,
                    label: args.label,
                };
                Ok(self.client.create_reserved_ip(&request).await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                let id = self.resolve(&args.reserved_ip).await?;
                self.client.update_reserved_ip(&id, &args.label).await?;
                Ok(success(format!(
                    "Reserved IP {} label updated to: {}",
                    args.reserved_ip, args.label
                )))
            }
            "delete" => {
                let args: ReservedIpArgs = parse_args(args)?;
                let id = self.resolve(&args.reserved_ip).await?;
                self.client.delete_reserved_ip(&id).await?;
                Ok(success(format!("Reserved IP {} deleted successfully", args.reserved_ip)))
            }
            "attach" => {
                let args: AttachArgs = parse_args(args)?;
                let id = self.resolve(&args.reserved_ip).await?;
                let instance_id = resolve_instance(&self.client, &args.instance_id).await?;
                self.client.attach_reserved_ip(&id, &instance_id).await?;
                Ok(success(format!(
                    "Reserved IP {} attached to instance {}",
                    args.reserved_ip, instance_id
                )))
            }
            "detach" => {
                let args: ReservedIpArgs = parse_args(args)?;
                let id = self.resolve(&args.reserved_ip).await?;
                self.client.detach_reserved_ip(&id).await?;
                Ok(success(format!("Reserved IP {} detached from instance", args.reserved_ip)))
            }
            "convert_instance_ip" => {
                let args: ConvertArgs = parse_args(args)?;
                Ok(self
                    .client
                    .convert_instance_ip(&args.ip_address, args.label.as_deref())
                    .await?)
            }
            "list_by_region" => {
                let args: RegionArgs = parse_args(args)?;
                let ips = self.client.list_reserved_ips().await?;
                Ok(json!(filter_field(ips, "region", &args.region)))
            }
            "list_unattached" | "list_attached" => {
                let _: NoArgs = parse_args(args)?;
                let want_attached = name == "list_attached";
                let ips: Vec<Value> = self
                    .client
                    .list_reserved_ips()
                    .await?
                    .into_iter()
                    .filter(|ip| is_attached(ip, "instance_id") == want_attached)
                    .collect();
                Ok(json!(ips))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("reserved-ips://list", "reserved-ips", "All reserved IPs"),
            ResourceDef::json(
                "reserved-ips://{reserved_ip}",
                "reserved-ip",
                "One reserved IP by ID, address or label",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "reserved-ips://list" => Ok(json!(self.client.list_reserved_ips().await?)),
            "reserved-ips://{reserved_ip}" => {
                let id = self.resolve(uri_param(params, "reserved_ip")?).await?;
                Ok(self.client.get_reserved_ip(&id).await?)
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

    fn tools() -> (Arc<MockTransport>, ReservedIpTools) {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/reserved-ips",
            200,
            json!({
                "reserved_ips": [
                    {"id": "r-1", "region": "ewr", "subnet": "192.0.2.10", "label": "web", "instance_id": "i-1"},
                    {"id": "r-2", "region": "ams", "subnet": "2001:db8::1", "label": "spare", "instance_id": ""},
                    {"id": "r-3", "region": "ewr", "subnet": "192.0.2.11", "label": "db", "instance_id": null}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
        let tools = ReservedIpTools::new(Arc::new(VultrClient::new(mock.clone())));
        (mock, tools)
    }

    #[tokio::test]
    async fn test_resolves_by_address_and_label() {
        let (mock, tools) = tools();
        mock.on(Method::GET, "/reserved-ips/r-2", 200, json!({"reserved_ip": {"id": "r-2"}}));
        mock.on(Method::GET, "/reserved-ips/r-3", 200, json!({"reserved_ip": {"id": "r-3"}}));

        let ip = tools.call("get", json!({"reserved_ip": "2001:db8::1"})).await.unwrap();
        assert_eq!(ip["id"], "r-2");
        let ip = tools.call("get", json!({"reserved_ip": "db"})).await.unwrap();
        assert_eq!(ip["id"], "r-3");
    }

    #[tokio::test]
    async fn test_label_is_not_matched_as_address() {
        let (_, tools) = tools();
        let err = tools
            .call("get", json!({"reserved_ip": "192.0.2.99"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("searched by subnet"));
    }

    #[tokio::test]
    async fn test_attachment_filters() {
        let (_, tools) = tools();
        let attached = tools.call("list_attached", json!({})).await.unwrap();
        assert_eq!(attached.as_array().unwrap().len(), 1);
        let unattached = tools.call("list_unattached", json!({})).await.unwrap();
        assert_eq!(unattached.as_array().unwrap().len(), 2);
        let ewr = tools.call("list_by_region", json!({"region": "ewr"})).await.unwrap();
        assert_eq!(ewr.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_defaults_to_v4() {
        let (mock, tools) = tools();
        mock.on(Method::POST, "/reserved-ips", 201, json!({"reserved_ip": {"id": "r-4"}}));

        tools.call("create", json!({"region": "ewr"})).await.unwrap();
        let body = mock.requests().pop().unwrap().body.unwrap();
        assert_eq!(body, json!({"region": "ewr", "ip_type": "v4"}));
    }
}
