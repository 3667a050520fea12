//! Operating system image tools

use super::{parse_args, NoArgs, ToolError};
use crate::client::VultrClient;
use crate::mcp::{Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// OS IDs are integers, so every lookup scans the list
const OS: IdentifierResolver = IdentifierResolver::new("Operating system", &["id", "name"])
    .case_insensitive()
    .scan_only();

const LINUX_KEYWORDS: [&str; 8] = [
    "ubuntu", "debian", "centos", "fedora", "arch", "rocky", "alma", "opensuse",
];

#[derive(Debug, Deserialize)]
struct GetArgs {
    /// ID or exact name
    os_id: Value,
}

#[derive(Debug, Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FamilyArgs {
    family: String,
}

fn field_lower(os: &Value, field: &str) -> String {
    os.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
}

fn is_linux(os: &Value) -> bool {
    let name = field_lower(os, "name");
    LINUX_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

pub struct OsTools {
    client: Arc<VultrClient>,
}

impl OsTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn filtered(&self, keep: impl Fn(&Value) -> bool) -> Result<Value, ToolError> {
        let images: Vec<Value> = self
            .client
            .list_operating_systems()
            .await?
            .into_iter()
            .filter(|os| keep(os))
            .collect();
        Ok(json!(images))
    }
}

#[async_trait]
impl ToolModule for OsTools {
    fn prefix(&self) -> &'static str {
        "os"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list_operating_systems", "List all operating system images", Schema::new().build()),
            Tool::new(
                "get_operating_system",
                "Get an operating system by ID or exact name",
                Schema::new()
                    .string("os_id", "OS ID (e.g. 2284) or name")
                    .required()
                    .build(),
            ),
            Tool::new(
                "search_os_by_name",
                "Find operating systems whose name contains a term",
                Schema::new().string("name", "Search term").required().build(),
            ),
            Tool::new(
                "list_os_by_family",
                "List operating systems of a family",
                Schema::new()
                    .string("family", "Family, e.g. ubuntu, windows or application")
                    .required()
                    .build(),
            ),
            Tool::new(
                "get_os_by_name",
                "Get an operating system by exact name, ignoring case",
                Schema::new().string("name", "Full OS name").required().build(),
            ),
            Tool::new(
                "list_application_images",
                "List one-click application images",
                Schema::new().build(),
            ),
            Tool::new("list_linux_os", "List Linux distributions", Schema::new().build()),
            Tool::new("list_windows_os", "List Windows images", Schema::new().build()),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list_operating_systems" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_operating_systems().await?))
            }
            "get_operating_system" => {
                let args: GetArgs = parse_args(args)?;
                let identifier = match &args.os_id {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => {
                        return Err(ToolError::InvalidArguments(
                            "os_id must be a number or a string".to_string(),
                        ))
                    }
                };
                let images = self.client.list_operating_systems().await?;
                OS.find(&identifier, &images)
                    .cloned()
                    .ok_or_else(|| OS.not_found(&identifier).into())
            }
            "search_os_by_name" => {
                let args: NameArgs = parse_args(args)?;
                let term = args.name.to_lowercase();
                self.filtered(|os| field_lower(os, "name").contains(&term)).await
            }
            "list_os_by_family" => {
                let args: FamilyArgs = parse_args(args)?;
                let family = args.family.to_lowercase();
                self.filtered(|os| field_lower(os, "family") == family).await
            }
            "get_os_by_name" => {
                let args: NameArgs = parse_args(args)?;
                let wanted = args.name.to_lowercase();
                self.client
                    .list_operating_systems()
                    .await?
                    .into_iter()
                    .find(|os| field_lower(os, "name") == wanted)
                    .ok_or_else(|| OS.not_found(&args.name).into())
            }
            "list_application_images" => {
                let _: NoArgs = parse_args(args)?;
                self.filtered(|os| field_lower(os, "family") == "application")
                    .await
            }
            "list_linux_os" => {
                let _: NoArgs = parse_args(args)?;
                self.filtered(is_linux).await
            }
            "list_windows_os" => {
                let _: NoArgs = parse_args(args)?;
                self.filtered(|os| field_lower(os, "name").contains("windows"))
                    .await
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

    fn tools() -> OsTools {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/os",
            200,
            json!({
                "os": [
                    {"id": 2284, "name": "Ubuntu 24.04 LTS x64", "family": "ubuntu"},
                    {"id": 2136, "name": "Debian 12 x64 (bookworm)", "family": "debian"},
                    {"id": 501, "name": "Windows 2022 Standard x64", "family": "windows"},
                    {"id": 186, "name": "Application", "family": "application"}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
        OsTools::new(Arc::new(VultrClient::new(mock)))
    }

    #[tokio::test]
    async fn test_get_by_numeric_id_and_name() {
        let os = tools().call("get_operating_system", json!({"os_id": 2284})).await.unwrap();
        assert_eq!(os["family"], "ubuntu");

        let os = tools()
            .call("get_operating_system", json!({"os_id": "debian 12 x64 (bookworm)"}))
            .await
            .unwrap();
        assert_eq!(os["id"], 2136);
    }

    #[tokio::test]
    async fn test_filters() {
        let linux = tools().call("list_linux_os", json!({})).await.unwrap();
        assert_eq!(linux.as_array().unwrap().len(), 2);

        let windows = tools().call("list_windows_os", Value::Null).await.unwrap();
        assert_eq!(windows[0]["id"], 501);

        let apps = tools()
            .call("list_os_by_family", json!({"family": "Application"}))
            .await
            .unwrap();
        assert_eq!(apps[0]["id"], 186);

        let found = tools().call("search_os_by_name", json!({"name": "x64"})).await.unwrap();
        assert_eq!(found.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_exact_name_and_application_images() {
        let os = tools()
            .call("get_os_by_name", json!({"name": "windows 2022 standard x64"}))
            .await
            .unwrap();
        assert_eq!(os["id"], 501);

        let err = tools()
            .call("get_os_by_name", json!({"name": "Ubuntu"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));

        let apps = tools().call("list_application_images", json!({})).await.unwrap();
        assert_eq!(apps.as_array().unwrap().len(), 1);
        assert_eq!(apps[0]["id"], 186);
    }
}
