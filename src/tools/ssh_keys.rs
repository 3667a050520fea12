//! SSH key tools

use super::{parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{SshKeyRequest, VultrClient};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const SSH_KEY: IdentifierResolver = IdentifierResolver::new("SSH key", &["name"]);

#[derive(Debug, Deserialize)]
struct KeyArgs {
    ssh_key_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    name: String,
    ssh_key: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    ssh_key_id: String,
    #[serde(flatten)]
    update: SshKeyRequest,
}

pub struct SshKeyTools {
    client: Arc<VultrClient>,
}

impl SshKeyTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(SSH_KEY
            .resolve(identifier, || self.client.list_ssh_keys())
            .await?)
    }
}

fn key_schema() -> Value {
    Schema::new()
        .string("ssh_key_id", "SSH key ID or name")
        .required()
        .build()
}

#[async_trait]
impl ToolModule for SshKeyTools {
    fn prefix(&self) -> &'static str {
        "ssh_keys"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List all SSH keys", Schema::new().build()),
            Tool::new("get", "Get an SSH key", key_schema()),
            Tool::new(
                "create",
                "Add an SSH public key",
                Schema::new()
                    .string("name", "Key name")
                    .required()
                    .string("ssh_key", "Public key, e.g. ssh-ed25519 AAAA...")
                    .required()
                    .build(),
            ),
            Tool::new(
                "update",
                "Rename an SSH key or replace its public key",
                Schema::new()
                    .string("ssh_key_id", "SSH key ID or name")
                    .required()
                    .string("name", "New name")
                    .string("ssh_key", "New public key")
                    .build(),
            ),
            Tool::new("delete", "Delete an SSH key", key_schema()),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_ssh_keys().await?))
            }
            "get" => {
                let args: KeyArgs = parse_args(args)?;
                let id = self.resolve(&args.ssh_key_id).await?;
                Ok(self.client.get_ssh_key(&id).await?)
            }
            "create" => {
                let args: CreateArgs = parse_args(args)?;
                let request = SshKeyRequest {
                    name: Some(args.name),
                    ssh_key: Some(args.ssh_key.trim().to_string()),
                };
                Ok(self.client.create_ssh_key(&request).await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                if args.update.name.is_none() && args.update.ssh_key.is_none() {
                    return Err(ToolError::InvalidArguments(
                        "nothing to update; pass name or ssh_key".to_string(),
                    ));
                }
                let id = self.resolve(&args.ssh_key_id).await?;
                self.client.update_ssh_key(&id, &args.update).await?;
                Ok(success(format!("SSH key {} updated successfully", id)))
            }
            "delete" => {
                let args: KeyArgs = parse_args(args)?;
                let id = self.resolve(&args.ssh_key_id).await?;
                self.client.delete_ssh_key(&id).await?;
                Ok(success(format!("SSH key {} deleted successfully", id)))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("ssh-keys://list", "ssh-keys", "All SSH keys"),
            ResourceDef::json("ssh-keys://{ssh_key_id}", "ssh-key", "One SSH key by ID or name"),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "ssh-keys://list" => Ok(json!(self.client.list_ssh_keys().await?)),
            "ssh-keys://{ssh_key_id}" => {
                let id = self.resolve(uri_param(params, "ssh_key_id")?).await?;
                Ok(self.client.get_ssh_key(&id).await?)
            }
            _ => Err(ToolError::UnknownResource(template.to_string())),
        }
    }
}
