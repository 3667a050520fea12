//! VPC and VPC 2.0 network tools

use super::instances::resolve_instance;
use super::{filter_field, parse_args, uri_param, NoArgs, ToolError};
use crate::client::{ApiError, CreateVpc2Request, CreateVpcRequest, VultrClient};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::{IdentifierResolver, ResolveError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const VPC: IdentifierResolver = IdentifierResolver::new("VPC", &["description"]);
const VPC2: IdentifierResolver = IdentifierResolver::new("VPC 2.0", &["description"]);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum VpcType {
    #[default]
    Vpc,
    Vpc2,
}

/// Which network kinds a lookup searches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum NetworkKind {
    #[default]
    Auto,
    Vpc,
    Vpc2,
}

#[derive(Debug, Deserialize)]
struct NetworkInfoArgs {
    identifier: String,
    #[serde(default)]
    vpc_type: NetworkKind,
}

#[derive(Debug, Deserialize)]
struct VpcArgs {
    vpc_identifier: String,
}

#[derive(Debug, Deserialize)]
struct Vpc2Args {
    vpc2_identifier: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    vpc_identifier: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct UpdateVpc2Args {
    vpc2_identifier: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct AttachArgs {
    vpc_identifier: String,
    instance_identifier: String,
    #[serde(default)]
    vpc_type: VpcType,
}

#[derive(Debug, Deserialize)]
struct InstanceArgs {
    instance_identifier: String,
}

#[derive(Debug, Deserialize)]
struct RegionArgs {
    region: String,
}

pub struct VpcTools {
    client: Arc<VultrClient>,
}

impl VpcTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve_vpc(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(VPC.resolve(identifier, || self.client.list_vpcs()).await?)
    }

    async fn resolve_vpc2(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(VPC2.resolve(identifier, || self.client.list_vpc2s()).await?)
    }

    async fn get_vpc(&self, identifier: &str) -> Result<Value, ToolError> {
        let id = self.resolve_vpc(identifier).await?;
        Ok(self.client.get_vpc(&id).await?)
    }

    async fn get_vpc2(&self, identifier: &str) -> Result<Value, ToolError> {
        let id = self.resolve_vpc2(identifier).await?;
        Ok(self.client.get_vpc2(&id).await?)
    }

    /// Look a network up and annotate it with what its kind offers
    async fn network_info(&self, identifier: &str, kind: NetworkKind) -> Result<Value, ToolError> {
        let (mut network, is_vpc2) = match kind {
            NetworkKind::Vpc => (self.get_vpc(identifier).await?, false),
            NetworkKind::Vpc2 => (self.get_vpc2(identifier).await?, true),
            NetworkKind::Auto => match self.get_vpc(identifier).await {
                Ok(vpc) => (vpc, false),
                Err(e) if is_missing(&e) => match self.get_vpc2(identifier).await {
                    Ok(vpc2) => (vpc2, true),
                    Err(e) if is_missing(&e) => {
                        return Err(ToolError::Invalid(format!(
                            "Network '{}' not found in VPCs or VPC 2.0s",
                            identifier
                        )))
                    }
                    Err(e) => return Err(e),
                },
                Err(e) => return Err(e),
            },
        };

        let network_type = if is_vpc2 { "VPC 2.0" } else { "VPC" };
        let capabilities = if is_vpc2 {
            json!({
                "scalability": "High",
                "broadcast_traffic": "Filtered",
                "max_instances": "1000+",
                "performance": "Enhanced",
            })
        } else {
            json!({
                "scalability": "Standard",
                "broadcast_traffic": "Processed",
                "max_instances": "100+",
                "performance": "Standard",
            })
        };
        let recommendations = json!([
            format!("Use {} for your networking needs", network_type),
            if is_vpc2 {
                "VPC 2.0 provides enhanced scalability"
            } else {
                "Consider VPC 2.0 for large-scale deployments"
            },
            "Ensure instances are in the same region for optimal performance",
        ]);

        if let Some(fields) = network.as_object_mut() {
            fields.insert("network_type".to_string(), json!(network_type));
            fields.insert("capabilities".to_string(), capabilities);
            fields.insert("recommendations".to_string(), recommendations);
        }
        Ok(network)
    }

    async fn attach_or_detach(&self, args: AttachArgs, attach: bool) -> Result<Value, ToolError> {
        let instance_id = resolve_instance(&self.client, &args.instance_identifier).await?;
        let action = if attach { "attached to" } else { "detached from" };

        match args.vpc_type {
            VpcType::Vpc => {
                let vpc_id = self.resolve_vpc(&args.vpc_identifier).await?;
                if attach {
                    self.client.attach_vpc_to_instance(&instance_id, &vpc_id).await?;
                } else {
                    self.client.detach_vpc_from_instance(&instance_id, &vpc_id).await?;
                }
                Ok(json!({
                    "success": true,
                    "message": format!("VPC {} instance successfully", action),
                    "vpc_id": vpc_id,
                    "instance_id": instance_id,
                }))
            }
            VpcType::Vpc2 => {
                let vpc2_id = self.resolve_vpc2(&args.vpc_identifier).await?;
                if attach {
                    self.client.attach_vpc2_to_instance(&instance_id, &vpc2_id).await?;
                } else {
                    self.client.detach_vpc2_from_instance(&instance_id, &vpc2_id).await?;
                }
                Ok(json!({
                    "success": true,
                    "message": format!("VPC 2.0 {} instance successfully", action),
                    "vpc2_id": vpc2_id,
                    "instance_id": instance_id,
                }))
            }
        }
    }

    async fn list_instance_networks(&self, identifier: &str) -> Result<Value, ToolError> {
        let instance_id = resolve_instance(&self.client, identifier).await?;
        let vpcs = self.client.list_instance_vpcs(&instance_id).await?;
        let vpc2s = self.client.list_instance_vpc2s(&instance_id).await?;
        Ok(json!({
            "instance_id": instance_id,
            "total_networks": vpcs.len() + vpc2s.len(),
            "vpcs": vpcs,
            "vpc2s": vpc2s,
        }))
    }

    async fn list_by_region(&self, region: &str) -> Result<Value, ToolError> {
        let vpcs = filter_field(self.client.list_vpcs().await?, "region", region);
        let vpc2s = filter_field(self.client.list_vpc2s().await?, "region", region);
        Ok(json!({
            "region": region,
            "total_networks": vpcs.len() + vpc2s.len(),
            "vpcs": vpcs,
            "vpc2s": vpc2s,
        }))
    }
}

fn is_missing(err: &ToolError) -> bool {
    matches!(
        err,
        ToolError::Resolve(ResolveError::NotFound { .. })
            | ToolError::Resolve(ResolveError::Api(ApiError::NotFound))
            | ToolError::Api(ApiError::NotFound)
    )
}

fn updated(kind: &str, id_field: &str, id: String, description: &str) -> Value {
    json!({
        "success": true,
        "message": format!("{} description updated to '{}'", kind, description),
        id_field: id,
    })
}

fn deleted(kind: &str, id_field: &str, id: String) -> Value {
    json!({
        "success": true,
        "message": format!("{} deleted successfully", kind),
        id_field: id,
    })
}

fn vpc_schema() -> Value {
    Schema::new()
        .string("vpc_identifier", "VPC ID or description")
        .required()
        .build()
}

fn vpc2_schema() -> Value {
    Schema::new()
        .string("vpc2_identifier", "VPC 2.0 ID or description")
        .required()
        .build()
}

fn attach_schema() -> Value {
    Schema::new()
        .string("vpc_identifier", "VPC or VPC 2.0 ID or description")
        .required()
        .string("instance_identifier", "Instance ID, label or hostname")
        .required()
        .string("vpc_type", "Network kind")
        .one_of(&["vpc", "vpc2"])
        .default_value("vpc")
        .build()
}

#[async_trait]
impl ToolModule for VpcTools {
    fn prefix(&self) -> &'static str {
        "vpcs"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List all VPCs", Schema::new().build()),
            Tool::new("get", "Get a VPC", vpc_schema()),
            Tool::new(
                "create",
                "Create a VPC",
                Schema::new()
                    .string("region", "Region ID, e.g. ewr")
                    .required()
                    .string("description", "Description")
                    .string("v4_subnet", "IPv4 network address, e.g. 10.99.0.0")
                    .integer("v4_subnet_mask", "IPv4 prefix length, e.g. 24")
                    .build(),
            ),
            Tool::new(
                "update",
                "Change the description of a VPC",
                Schema::new()
                    .string("vpc_identifier", "VPC ID or description")
                    .required()
                    .string("description", "New description")
                    .required()
                    .build(),
            ),
            Tool::new("delete", "Delete a VPC", vpc_schema()),
            Tool::new("list_vpc2", "List all VPC 2.0 networks", Schema::new().build()),
            Tool::new("get_vpc2", "Get a VPC 2.0 network", vpc2_schema()),
            Tool::new(
                "create_vpc2",
                "Create a VPC 2.0 network",
                Schema::new()
                    .string("region", "Region ID, e.g. ewr")
                    .required()
                    .string("description", "Description")
                    .string("ip_block", "IPv4 network address, e.g. 10.99.0.0")
                    .integer("prefix_length", "IPv4 prefix length, e.g. 24")
                    .build(),
            ),
            Tool::new(
                "update_vpc2",
                "Change the description of a VPC 2.0 network",
                Schema::new()
                    .string("vpc2_identifier", "VPC 2.0 ID or description")
                    .required()
                    .string("description", "New description")
                    .required()
                    .build(),
            ),
            Tool::new("delete_vpc2", "Delete a VPC 2.0 network", vpc2_schema()),
            Tool::new("attach_to_instance", "Attach a VPC or VPC 2.0 network to an instance", attach_schema()),
            Tool::new(
                "detach_from_instance",
                "Detach a VPC or VPC 2.0 network from an instance",
                attach_schema(),
            ),
            Tool::new(
                "list_instance_networks",
                "List the VPC and VPC 2.0 networks of an instance",
                Schema::new()
                    .string("instance_identifier", "Instance ID, label or hostname")
                    .required()
                    .build(),
            ),
            Tool::new(
                "get_network_info",
                "Describe a VPC or VPC 2.0 network and what its kind offers",
                Schema::new()
                    .string("identifier", "VPC or VPC 2.0 ID or description")
                    .required()
                    .string("vpc_type", "Network kind to search; auto tries VPC first")
                    .one_of(&["auto", "vpc", "vpc2"])
                    .default_value("auto")
                    .build(),
            ),
            Tool::new(
                "list_by_region",
                "List the VPC and VPC 2.0 networks of a region",
                Schema::new().string("region", "Region ID").required().build(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_vpcs().await?))
            }
            "get" => {
                let args: VpcArgs = parse_args(args)?;
                self.get_vpc(&args.vpc_identifier).await
            }
            "create" => {
                let request: CreateVpcRequest = parse_args(args)?;
                Ok(self.client.create_vpc(&request).await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                let id = self.resolve_vpc(&args.vpc_identifier).await?;
                self.client.update_vpc(&id, &args.description).await?;
                Ok(updated("VPC", "vpc_id", id, &args.description))
            }
            "delete" => {
                let args: VpcArgs = parse_args(args)?;
                let id = self.resolve_vpc(&args.vpc_identifier).await?;
                self.client.delete_vpc(&id).await?;
                Ok(deleted("VPC", "vpc_id", id))
            }
            "list_vpc2" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_vpc2s().await?))
            }
            "get_vpc2" => {
                let args: Vpc2Args = parse_args(args)?;
                self.get_vpc2(&args.vpc2_identifier).await
            }
            "create_vpc2" => {
                let request: CreateVpc2Request = parse_args(args)?;
                Ok(self.client.create_vpc2(&request).await?)
            }
            "update_vpc2" => {
                let args: UpdateVpc2Args = parse_args(args)?;
                let id = self.resolve_vpc2(&args.vpc2_identifier).await?;
                self.client.update_vpc2(&id, &args.description).await?;
                Ok(updated("VPC 2.0", "vpc2_id", id, &args.description))
            }
            "delete_vpc2" => {
                let args: Vpc2Args = parse_args(args)?;
                let id = self.resolve_vpc2(&args.vpc2_identifier).await?;
                self.client.delete_vpc2(&id).await?;
                Ok(deleted("VPC 2.0", "vpc2_id", id))
            }
            "attach_to_instance" => self.attach_or_detach(parse_args(args)?, true).await,
            "detach_from_instance" => self.attach_or_detach(parse_args(args)?, false).await,
            "list_instance_networks" => {
                let args: InstanceArgs = parse_args(args)?;
                self.list_instance_networks(&args.instance_identifier).await
            }
            "get_network_info" => {
                let args: NetworkInfoArgs = parse_args(args)?;
                self.network_info(&args.identifier, args.vpc_type).await
            }
            "list_by_region" => {
                let args: RegionArgs = parse_args(args)?;
                self.list_by_region(&args.region).await
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("vpcs://list", "vpcs", "All VPCs"),
            ResourceDef::json("vpcs://{vpc_identifier}", "vpc", "One VPC by ID or description"),
            ResourceDef::json("vpc2s://list", "vpc2s", "All VPC 2.0 networks"),
            ResourceDef::json(
                "vpc2s://{vpc2_identifier}",
                "vpc2",
                "One VPC 2.0 network by ID or description",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "vpcs://list" => Ok(json!(self.client.list_vpcs().await?)),
            "vpcs://{vpc_identifier}" => {
                let id = self.resolve_vpc(uri_param(params, "vpc_identifier")?).await?;
                Ok(self.client.get_vpc(&id).await?)
            }
            "vpc2s://list" => Ok(json!(self.client.list_vpc2s().await?)),
            "vpc2s://{vpc2_identifier}" => {
                let id = self.resolve_vpc2(uri_param(params, "vpc2_identifier")?).await?;
                Ok(self.client.get_vpc2(&id).await?)
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

    const INSTANCE_ID: &str = "9a1b2c3d-0000-4000-8000-00000000abcd";

    fn tools() -> (Arc<MockTransport>, VpcTools) {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/vpcs",
            200,
            json!({"vpcs": [{"id": "v-1", "description": "private", "region": "ewr"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on(
            Method::GET,
            "/vpc2",
            200,
            json!({"vpcs": [
                {"id": "w-1", "description": "backend", "region": "ewr"},
                {"id": "w-2", "description": "edge", "region": "ams"}
            ], "meta": {"links": {"next": ""}}}),
        );
        let tools = VpcTools::new(Arc::new(VultrClient::new(mock.clone())));
        (mock, tools)
    }

    #[tokio::test]
    async fn test_attach_vpc_patches_instance() {
        let (mock, tools) = tools();
        mock.on(Method::PATCH, &format!("/instances/{}", INSTANCE_ID), 202, json!({"instance": {}}));

        let result = tools
            .call(
                "attach_to_instance",
                json!({"vpc_identifier": "private", "instance_identifier": INSTANCE_ID}),
            )
            .await
            .unwrap();
        assert_eq!(result["vpc_id"], "v-1");

        let body = mock.requests().pop().unwrap().body.unwrap();
        assert_eq!(body, json!({"attach_vpc": ["v-1"]}));
    }

    #[tokio::test]
    async fn test_detach_vpc2() {
        let (mock, tools) = tools();
        let path = format!("/instances/{}/vpc2/detach", INSTANCE_ID);
        mock.on(Method::POST, &path, 202, Value::Null);

        let result = tools
            .call(
                "detach_from_instance",
                json!({"vpc_identifier": "backend", "instance_identifier": INSTANCE_ID, "vpc_type": "vpc2"}),
            )
            .await
            .unwrap();
        assert_eq!(result["vpc2_id"], "w-1");
        assert_eq!(mock.count(Method::POST, &path), 1);
    }

    #[tokio::test]
    async fn test_bad_vpc_type() {
        let (_, tools) = tools();
        let err = tools
            .call(
                "attach_to_instance",
                json!({"vpc_identifier": "x", "instance_identifier": "y", "vpc_type": "vpc3"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_list_by_region() {
        let (_, tools) = tools();
        let networks = tools.call("list_by_region", json!({"region": "ewr"})).await.unwrap();
        assert_eq!(networks["total_networks"], 2);
        assert_eq!(networks["vpc2s"][0]["id"], "w-1");
    }

    #[tokio::test]
    async fn test_network_info_falls_back_to_vpc2() {
        let (mock, tools) = tools();
        mock.on(
            Method::GET,
            "/vpc2/w-1",
            200,
            json!({"vpc": {"id": "w-1", "description": "backend", "region": "ewr"}}),
        );

        let info = tools
            .call("get_network_info", json!({"identifier": "backend"}))
            .await
            .unwrap();
        assert_eq!(info["id"], "w-1");
        assert_eq!(info["network_type"], "VPC 2.0");
        assert_eq!(info["capabilities"]["max_instances"], "1000+");

        let err = tools
            .call("get_network_info", json!({"identifier": "nowhere"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found in VPCs or VPC 2.0s"));

        let err = tools
            .call("get_network_info", json!({"identifier": "backend", "vpc_type": "vpc"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Resolve(ResolveError::NotFound { .. })));
    }
}
