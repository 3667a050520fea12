//! Backup tools

use super::instances::resolve_instance;
use super::{parse_args, uri_param, ToolError};
use crate::client::VultrClient;
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default)]
    instance_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BackupArgs {
    backup_id: String,
}

pub struct BackupTools {
    client: Arc<VultrClient>,
}

impl BackupTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolModule for BackupTools {
    fn prefix(&self) -> &'static str {
        "backups"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "list",
                "List backups, optionally only those of one instance",
                Schema::new()
                    .string("instance_id", "Instance ID, label or hostname")
                    .build(),
            ),
            Tool::new(
                "get",
                "Get a backup",
                Schema::new()
                    .string("backup_id", "Backup ID")
                    .required()
                    .build(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let args: ListArgs = parse_args(args)?;
                let instance_id = match &args.instance_id {
                    Some(identifier) => Some(resolve_instance(&self.client, identifier).await?),
                    None => None,
                };
                Ok(json!(self.client.list_backups(instance_id.as_deref()).await?))
            }
            "get" => {
                let args: BackupArgs = parse_args(args)?;
                Ok(self.client.get_backup(&args.backup_id).await?)
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("backups://list", "backups", "All backups"),
            ResourceDef::json("backups://{backup_id}", "backup", "One backup"),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "backups://list" => Ok(json!(self.client.list_backups(None).await?)),
            "backups://{backup_id}" => {
                Ok(self.client.get_backup(uri_param(params, "backup_id")?).await?)
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
    async fn test_list_filters_by_resolved_instance() {
        let mock = Arc::new(MockTransport::new());
        let tools = BackupTools::new(Arc::new(VultrClient::new(mock.clone())));
        mock.on(
            Method::GET,
            "/instances",
            200,
            json!({"instances": [{"id": "i-1", "label": "web"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on_query(
            Method::GET,
            "/backups",
            &[("instance_id", "i-1")],
            200,
            json!({"backups": [{"id": "b-1"}], "meta": {"links": {"next": ""}}}),
        );

        let backups = tools.call("list", json!({"instance_id": "web"})).await.unwrap();
        assert_eq!(backups, json!([{"id": "b-1"}]));

        let sent = mock.requests().pop().unwrap();
        assert_eq!(sent.query_param("instance_id"), Some("i-1"));
    }
}
