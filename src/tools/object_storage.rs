//! Object storage tools

use super::{filter_field, parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{CreateObjectStorageRequest, VultrClient};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

const STORAGE: IdentifierResolver = IdentifierResolver::new("Object storage", &["label"]);

#[derive(Debug, Deserialize)]
struct StorageArgs {
    object_storage_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    object_storage_id: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct TierArgs {
    cluster_id: u64,
}

#[derive(Debug, Deserialize)]
struct RegionArgs {
    region: String,
}

fn text_field<'a>(storage: &'a Value, field: &str) -> &'a str {
    storage.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// Endpoint and credentials in the shapes S3 clients expect
fn s3_config(storage: &Value) -> Value {
    let hostname = text_field(storage, "s3_hostname");
    let endpoint = format!("https://{}", hostname);
    let access_key = text_field(storage, "s3_access_key");
    let secret_key = text_field(storage, "s3_secret_key");
    let region = text_field(storage, "region");

    json!({
        "endpoint": endpoint,
        "access_key": access_key,
        "secret_key": secret_key,
        "region": region,
        "hostname": hostname,
        "bucket_examples": {
            "aws_cli": format!("aws s3 ls --endpoint-url={}", endpoint),
            "boto3_config": {
                "endpoint_url": endpoint,
                "aws_access_key_id": access_key,
                "aws_secret_access_key": secret_key,
                "region_name": region,
            },
        },
    })
}

fn s3_access_report(storage: &Value) -> Value {
    let has_hostname = !text_field(storage, "s3_hostname").is_empty();
    let has_access_key = !text_field(storage, "s3_access_key").is_empty();
    let has_secret_key = !text_field(storage, "s3_secret_key").is_empty();
    let is_active = text_field(storage, "status") == "active";

    let mut suggestions = Vec::new();
    if !is_active {
        suggestions.push("Object storage is not active yet; wait for provisioning to finish");
    }
    if !has_access_key || !has_secret_key {
        suggestions.push("Access keys are missing; regenerate them with regenerate_keys");
    }
    if !has_hostname {
        suggestions.push("S3 hostname is missing; check the storage configuration");
    }

    json!({
        "valid": has_hostname && has_access_key && has_secret_key && is_active,
        "endpoint": has_hostname.then(|| format!("https://{}", text_field(storage, "s3_hostname"))),
        "has_credentials": has_access_key && has_secret_key,
        "status": storage.get("status").cloned().unwrap_or(Value::Null),
        "suggestions": suggestions,
        "details": {
            "has_hostname": has_hostname,
            "has_access_key": has_access_key,
            "has_secret_key": has_secret_key,
            "is_active": is_active,
        },
    })
}

fn count_by(storages: &[Value], field: &str) -> Map<String, Value> {
    let mut counts: Map<String, Value> = Map::new();
    for storage in storages {
        let key = match storage.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "unknown".to_string(),
        };
        let entry = counts.entry(key).or_insert(json!(0));
        *entry = json!(entry.as_u64().unwrap_or(0) + 1);
    }
    counts
}

pub struct ObjectStorageTools {
    client: Arc<VultrClient>,
}

impl ObjectStorageTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(STORAGE
            .resolve(identifier, || self.client.list_object_storages())
            .await?)
    }

    async fn fetch(&self, identifier: &str) -> Result<Value, ToolError> {
        let id = self.resolve(identifier).await?;
        Ok(self.client.get_object_storage(&id).await?)
    }
}

fn storage_schema() -> Value {
    Schema::new()
        .string("object_storage_id", "Object storage ID or label")
        .required()
        .build()
}

#[async_trait]
impl ToolModule for ObjectStorageTools {
    fn prefix(&self) -> &'static str {
        "object_storage"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List object storage subscriptions", Schema::new().build()),
            Tool::new("get", "Get an object storage subscription", storage_schema()),
            Tool::new(
                "create",
                "Create object storage in a cluster",
                Schema::new()
                    .integer("cluster_id", "Cluster ID, see list_clusters")
                    .required()
                    .string("label", "Label")
                    .required()
                    .integer("tier_id", "Tier ID, see list_cluster_tiers")
                    .build(),
            ),
            Tool::new(
                "update",
                "Change the label of an object storage subscription",
                Schema::new()
                    .string("object_storage_id", "Object storage ID or label")
                    .required()
                    .string("label", "New label")
                    .required()
                    .build(),
            ),
            Tool::new("delete", "Delete an object storage subscription", storage_schema()),
            Tool::new("regenerate_keys", "Issue new S3 access keys", storage_schema()),
            Tool::new("list_clusters", "List object storage clusters", Schema::new().build()),
            Tool::new(
                "list_cluster_tiers",
                "List the tiers a cluster offers",
                Schema::new().integer("cluster_id", "Cluster ID").required().build(),
            ),
            Tool::new(
                "get_s3_config",
                "Get the S3 endpoint, keys and client configuration examples",
                storage_schema(),
            ),
            Tool::new(
                "find_by_region",
                "List object storage in a region",
                Schema::new().string("region", "Region ID").required().build(),
            ),
            Tool::new(
                "get_storage_summary",
                "Count object storage by region, status and cluster",
                Schema::new().build(),
            ),
            Tool::new(
                "validate_s3_access",
                "Check that an object storage subscription is active and has credentials",
                storage_schema(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_object_storages().await?))
            }
            "get" => {
                let args: StorageArgs = parse_args(args)?;
                self.fetch(&args.object_storage_id).await
            }
            "create" => {
                let request: CreateObjectStorageRequest = parse_args(args)?;
                Ok(self.client.create_object_storage(&request).await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                let id = self.resolve(&args.object_storage_id).await?;
                self.client.update_object_storage(&id, &args.label).await?;
                Ok(success(format!(
                    "Object storage {} updated successfully",
                    args.object_storage_id
                )))
            }
            "delete" => {
                let args: StorageArgs = parse_args(args)?;
                let id = self.resolve(&args.object_storage_id).await?;
                self.client.delete_object_storage(&id).await?;
                Ok(success(format!(
                    "Object storage {} deleted successfully",
                    args.object_storage_id
                )))
            }
            "regenerate_keys" => {
                let args: StorageArgs = parse_args(args)?;
                let id = self.resolve(&args.object_storage_id).await?;
                Ok(self.client.regenerate_object_storage_keys(&id).await?)
            }
            "list_clusters" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_object_storage_clusters().await?))
            }
            "list_cluster_tiers" => {
                let args: TierArgs = parse_args(args)?;
                Ok(json!(self
                    .client
                    .list_object_storage_cluster_tiers(args.cluster_id)
                    .await?))
            }
            "get_s3_config" => {
                let args: StorageArgs = parse_args(args)?;
                Ok(s3_config(&self.fetch(&args.object_storage_id).await?))
            }
            "find_by_region" => {
                let args: RegionArgs = parse_args(args)?;
                let storages = self.client.list_object_storages().await?;
                Ok(json!(filter_field(storages, "region", &args.region)))
            }
            "get_storage_summary" => {
                let _: NoArgs = parse_args(args)?;
                let storages = self.client.list_object_storages().await?;
                Ok(json!({
                    "total_instances": storages.len(),
                    "regions": count_by(&storages, "region"),
                    "status_breakdown": count_by(&storages, "status"),
                    "cluster_usage": count_by(&storages, "cluster_id"),
                }))
            }
            "validate_s3_access" => {
                let args: StorageArgs = parse_args(args)?;
                Ok(s3_access_report(&self.fetch(&args.object_storage_id).await?))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("object-storage://list", "object-storage", "All object storage"),
            ResourceDef::json("object-storage://clusters", "clusters", "Object storage clusters"),
            ResourceDef::json(
                "object-storage://clusters/{cluster_id}/tiers",
                "cluster-tiers",
                "Tiers offered by a cluster",
            ),
            ResourceDef::json(
                "object-storage://{object_storage_id}",
                "object-storage-item",
                "One object storage subscription by ID or label",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "object-storage://list" => Ok(json!(self.client.list_object_storages().await?)),
            "object-storage://clusters" => {
                Ok(json!(self.client.list_object_storage_clusters().await?))
            }
            "object-storage://clusters/{cluster_id}/tiers" => {
                let cluster_id = uri_param(params, "cluster_id")?
                    .parse::<u64>()
                    .map_err(|_| ToolError::InvalidArguments("cluster_id must be a number".to_string()))?;
                Ok(json!(self
                    .client
                    .list_object_storage_cluster_tiers(cluster_id)
                    .await?))
            }
            "object-storage://{object_storage_id}" => {
                self.fetch(uri_param(params, "object_storage_id")?).await
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

    fn tools() -> (Arc<MockTransport>, ObjectStorageTools) {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/object-storage",
            200,
            json!({
                "object_storages": [
                    {"id": "os-1", "label": "backups", "region": "ewr", "status": "active", "cluster_id": 2},
                    {"id": "os-2", "label": "media", "region": "ams", "status": "pending", "cluster_id": 4}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
        let tools = ObjectStorageTools::new(Arc::new(VultrClient::new(mock.clone())));
        (mock, tools)
    }

    #[tokio::test]
    async fn test_s3_config_by_label() {
        let (mock, tools) = tools();
        mock.on(
            Method::GET,
            "/object-storage/os-1",
            200,
            json!({"object_storage": {
                "id": "os-1",
                "region": "ewr",
                "s3_hostname": "ewr1.vultrobjects.com",
                "s3_access_key": "AK",
                "s3_secret_key": "SK"
            }}),
        );

        let config = tools
            .call("get_s3_config", json!({"object_storage_id": "backups"}))
            .await
            .unwrap();
        assert_eq!(config["endpoint"], "https://ewr1.vultrobjects.com");
        assert_eq!(config["bucket_examples"]["boto3_config"]["aws_access_key_id"], "AK");
        assert_eq!(
            config["bucket_examples"]["aws_cli"],
            "aws s3 ls --endpoint-url=https://ewr1.vultrobjects.com"
        );
    }

    #[tokio::test]
    async fn test_find_by_region_and_summary() {
        let (_, tools) = tools();
        let found = tools.call("find_by_region", json!({"region": "ams"})).await.unwrap();
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["id"], "os-2");

        let summary = tools.call("get_storage_summary", json!({})).await.unwrap();
        assert_eq!(summary["total_instances"], 2);
        assert_eq!(summary["regions"]["ewr"], 1);
        assert_eq!(summary["cluster_usage"]["4"], 1);
    }

    #[test]
    fn test_access_report_flags_missing_keys() {
        let report = s3_access_report(&json!({"status": "active", "s3_hostname": "h"}));
        assert_eq!(report["valid"], false);
        assert_eq!(report["has_credentials"], false);
        assert_eq!(report["suggestions"].as_array().unwrap().len(), 1);
    }
}
