//! ISO image tools

use super::{parse_args, success, NoArgs, ToolError};
use crate::client::VultrClient;
use crate::mcp::{Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const ISO: IdentifierResolver =
    IdentifierResolver::new("ISO", &["name", "filename"]).case_insensitive();

#[derive(Debug, Deserialize)]
struct IsoArgs {
    iso_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct NameArgs {
    name: String,
}

pub struct IsoTools {
    client: Arc<VultrClient>,
}

impl IsoTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }
}

fn iso_schema() -> Value {
    Schema::new().string("iso_id", "ISO ID").required().build()
}

#[async_trait]
impl ToolModule for IsoTools {
    fn prefix(&self) -> &'static str {
        "iso"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list_isos", "List uploaded ISO images", Schema::new().build()),
            Tool::new("get_iso", "Get an ISO image", iso_schema()),
            Tool::new(
                "create_iso",
                "Download an ISO image from a URL into the account",
                Schema::new()
                    .string("url", "Public URL of the ISO")
                    .required()
                    .build(),
            ),
            Tool::new("delete_iso", "Delete an ISO image", iso_schema()),
            Tool::new("list_public_isos", "List the public ISO library", Schema::new().build()),
            Tool::new(
                "list_custom_isos",
                "List ISOs uploaded to the account from a file",
                Schema::new().build(),
            ),
            Tool::new(
                "get_iso_by_name",
                "Find an uploaded ISO by name or filename",
                Schema::new().string("name", "ISO name or filename").required().build(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list_isos" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_isos().await?))
            }
            "get_iso" => {
                let args: IsoArgs = parse_args(args)?;
                Ok(self.client.get_iso(&args.iso_id).await?)
            }
            "create_iso" => {
                let args: CreateArgs = parse_args(args)?;
                url::Url::parse(&args.url)
                    .map_err(|e| ToolError::InvalidArguments(format!("invalid url: {}", e)))?;
                Ok(self.client.create_iso(&args.url).await?)
            }
            "delete_iso" => {
                let args: IsoArgs = parse_args(args)?;
                self.client.delete_iso(&args.iso_id).await?;
                Ok(success(format!("Successfully deleted ISO {}", args.iso_id)))
            }
            "list_public_isos" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_public_isos().await?))
            }
            "list_custom_isos" => {
                let _: NoArgs = parse_args(args)?;
                let custom: Vec<Value> = self
                    .client
                    .list_isos()
                    .await?
                    .into_iter()
                    .filter(|iso| {
                        iso.get("filename")
                            .and_then(Value::as_str)
                            .is_some_and(|f| !f.is_empty())
                    })
                    .collect();
                Ok(json!(custom))
            }
            "get_iso_by_name" => {
                let args: NameArgs = parse_args(args)?;
                let isos = self.client.list_isos().await?;
                ISO.find(&args.name, &isos)
                    .cloned()
                    .ok_or_else(|| ISO.not_found(&args.name).into())
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use reqwest::Method;

    #[tokio::test]
    async fn test_get_iso_by_filename() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/iso",
            200,
            json!({"isos": [{"id": "iso-1", "filename": "alpine-3.20.iso", "name": ""}], "meta": {"links": {"next": ""}}}),
        );
        let tools = IsoTools::new(Arc::new(VultrClient::new(mock)));

        let iso = tools
            .call("get_iso_by_name", json!({"name": "ALPINE-3.20.ISO"}))
            .await
            .unwrap();
        assert_eq!(iso["id"], "iso-1");

        let err = tools
            .call("get_iso_by_name", json!({"name": "debian.iso"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_create_posts_url() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::POST, "/iso", 201, json!({"iso": {"id": "iso-2", "status": "pending"}}));
        let tools = IsoTools::new(Arc::new(VultrClient::new(mock.clone())));

        let iso = tools
            .call("create_iso", json!({"url": "https://example.com/os.iso"}))
            .await
            .unwrap();
        assert_eq!(iso["status"], "pending");
        assert_eq!(
            mock.requests().pop().unwrap().body.unwrap(),
            json!({"url": "https://example.com/os.iso"})
        );
    }

    #[tokio::test]
    async fn test_custom_isos_have_filenames() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/iso",
            200,
            json!({
                "isos": [
                    {"id": "iso-1", "filename": "alpine-3.20.iso"},
                    {"id": "iso-2", "filename": ""},
                    {"id": "iso-3"}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
        let tools = IsoTools::new(Arc::new(VultrClient::new(mock)));

        let custom = tools.call("list_custom_isos", Value::Null).await.unwrap();
        assert_eq!(custom, json!([{"id": "iso-1", "filename": "alpine-3.20.iso"}]));
    }
}
