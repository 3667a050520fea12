//! Snapshot tools

use super::instances::resolve_instance;
use super::{parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::VultrClient;
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const SNAPSHOT: IdentifierResolver = IdentifierResolver::new("Snapshot", &["description"]);

#[derive(Debug, Deserialize)]
struct SnapshotArgs {
    snapshot_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    instance_id: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateFromUrlArgs {
    url: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    snapshot_id: String,
    description: String,
}

pub struct SnapshotTools {
    client: Arc<VultrClient>,
}

impl SnapshotTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(SNAPSHOT
            .resolve(identifier, || self.client.list_snapshots())
            .await?)
    }
}

fn snapshot_schema() -> Value {
    Schema::new()
        .string("snapshot_id", "Snapshot ID or description")
        .required()
        .build()
}

#[async_trait]
impl ToolModule for SnapshotTools {
    fn prefix(&self) -> &'static str {
        "snapshots"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List all snapshots", Schema::new().build()),
            Tool::new("get", "Get a snapshot", snapshot_schema()),
            Tool::new(
                "create",
                "Snapshot an instance",
                Schema::new()
                    .string("instance_id", "Instance ID, label or hostname")
                    .required()
                    .string("description", "Snapshot description")
                    .build(),
            ),
            Tool::new(
                "create_from_url",
                "Create a snapshot from a raw disk image URL",
                Schema::new()
                    .string("url", "Public URL of a RAW image")
                    .required()
                    .string("description", "Snapshot description")
                    .build(),
            ),
            Tool::new(
                "update",
                "Change the description of a snapshot",
                Schema::new()
                    .string("snapshot_id", "Snapshot ID or description")
                    .required()
                    .string("description", "New description")
                    .required()
                    .build(),
            ),
            Tool::new("delete", "Delete a snapshot", snapshot_schema()),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_snapshots().await?))
            }
            "get" => {
                let args: SnapshotArgs = parse_args(args)?;
                let id = self.resolve(&args.snapshot_id).await?;
                Ok(self.client.get_snapshot(&id).await?)
            }
            "create" => {
                let args: CreateArgs = parse_args(args)?;
                let instance_id = resolve_instance(&self.client, &args.instance_id).await?;
                Ok(self
                    .client
                    .create_snapshot(&instance_id, args.description)
                    .await?)
            }
            "create_from_url" => {
                let args: CreateFromUrlArgs = parse_args(args)?;
                url::Url::parse(&args.url)
                    .map_err(|e| ToolError::InvalidArguments(format!("invalid url: {}", e)))?;
                Ok(self
                    .client
                    .create_snapshot_from_url(&args.url, args.description)
                    .await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                let id = self.resolve(&args.snapshot_id).await?;
                self.client.update_snapshot(&id, &args.description).await?;
                Ok(success(format!("Snapshot {} updated successfully", id)))
            }
            "delete" => {
                let args: SnapshotArgs = parse_args(args)?;
                let id = self.resolve(&args.snapshot_id).await?;
                self.client.delete_snapshot(&id).await?;
                Ok(success(format!("Snapshot {} deleted successfully", id)))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("snapshots://list", "snapshots", "All snapshots"),
            ResourceDef::json("snapshots://{snapshot_id}", "snapshot", "One snapshot by ID or description"),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "snapshots://list" => Ok(json!(self.client.list_snapshots().await?)),
            "snapshots://{snapshot_id}" => {
                let id = self.resolve(uri_param(params, "snapshot_id")?).await?;
                Ok(self.client.get_snapshot(&id).await?)
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

    #[tokio::test]
    async fn test_create_resolves_instance_label() {
        let mock = Arc::new(MockTransport::new());
        let tools = SnapshotTools::new(Arc::new(VultrClient::new(mock.clone())));
        mock.on(
            Method::GET,
            "/instances",
            200,
            json!({"instances": [{"id": "i-1", "label": "web"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on(Method::POST, "/snapshots", 202, json!({"snapshot": {"id": "s-1", "status": "pending"}}));

        let snapshot = tools
            .call("create", json!({"instance_id": "web", "description": "nightly"}))
            .await
            .unwrap();
        assert_eq!(snapshot["id"], "s-1");

        let body = mock.requests().pop().unwrap().body.unwrap();
        assert_eq!(body, json!({"instance_id": "i-1", "description": "nightly"}));
    }

    #[tokio::test]
    async fn test_create_from_bad_url() {
        let mock = Arc::new(MockTransport::new());
        let tools = SnapshotTools::new(Arc::new(VultrClient::new(mock.clone())));

        let err = tools
            .call("create_from_url", json!({"url": "not a url"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
