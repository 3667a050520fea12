//! Startup script tools
//!
//! Scripts are taken and shown as plain text; the API stores them base64
//! encoded.

use super::{parse_args, success, NoArgs, ToolError};
use crate::client::{StartupScriptRequest, VultrClient};
use crate::mcp::{Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const SCRIPT: IdentifierResolver = IdentifierResolver::new("Startup script", &["name"]);

#[derive(Debug, Deserialize)]
struct ScriptArgs {
    script_identifier: String,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    name: String,
    script: String,
    #[serde(default = "boot", alias = "type")]
    script_type: String,
}

fn boot() -> String {
    "boot".to_string()
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    script_identifier: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    script: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Template {
    DockerInstall,
    NodejsInstall,
    SecurityUpdates,
    SshSetup,
}

#[derive(Debug, Deserialize)]
struct CommonArgs {
    #[serde(alias = "script_type")]
    template: Template,
    #[serde(default = "ssh_port")]
    ssh_port: u16,
}

fn ssh_port() -> u16 {
    22
}

const DOCKER_INSTALL: &str = r#"#!/bin/bash
apt-get update
apt-get install -y ca-certificates curl gnupg
install -m 0755 -d /etc/apt/keyrings
curl -fsSL https://download.docker.com/linux/ubuntu/gpg | gpg --dearmor -o /etc/apt/keyrings/docker.gpg
chmod a+r /etc/apt/keyrings/docker.gpg
echo "deb [arch="$(dpkg --print-architecture)" signed-by=/etc/apt/keyrings/docker.gpg] https://download.docker.com/linux/ubuntu "$(. /etc/os-release && echo "$VERSION_CODENAME")" stable" | tee /etc/apt/sources.list.d/docker.list > /dev/null
apt-get update
apt-get install -y docker-ce docker-ce-cli containerd.io docker-buildx-plugin docker-compose-plugin
systemctl enable docker
systemctl start docker
"#;

const NODEJS_INSTALL: &str = r#"#!/bin/bash
curl -fsSL https://deb.nodesource.com/setup_lts.x | bash -
apt-get install -y nodejs
npm install -g pm2
"#;

const SECURITY_UPDATES: &str = r#"#!/bin/bash
apt-get update
apt-get upgrade -y
apt-get install -y unattended-upgrades
dpkg-reconfigure -f noninteractive unattended-upgrades
"#;

impl Template {
    /// Script name and body for a template
    fn render(&self, ssh_port: u16) -> (&'static str, String) {
        match self {
            Template::DockerInstall => ("Docker Installation", DOCKER_INSTALL.to_string()),
            Template::NodejsInstall => ("Node.js Installation", NODEJS_INSTALL.to_string()),
            Template::SecurityUpdates => ("Security Updates", SECURITY_UPDATES.to_string()),
            Template::SshSetup => (
                "SSH Hardening",
                format!(
                    "#!/bin/bash\n\
                     sed -i 's/#PasswordAuthentication yes/PasswordAuthentication no/' /etc/ssh/sshd_config\n\
                     sed -i 's/#PermitRootLogin yes/PermitRootLogin no/' /etc/ssh/sshd_config\n\
                     sed -i 's/#Port 22/Port {}/' /etc/ssh/sshd_config\n\
                     systemctl restart sshd\n",
                    ssh_port
                ),
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

fn check_type(script_type: &str) -> Result<(), ToolError> {
    match script_type {
        "boot" | "pxe" => Ok(()),
        other => Err(ToolError::InvalidArguments(format!(
            "script type must be 'boot' or 'pxe', got '{}'",
            other
        ))),
    }
}

/// Decode a base64 script body; text that is not valid base64 is returned as is
fn decode_script(encoded: &str) -> String {
    STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| encoded.to_string())
}

pub struct StartupScriptTools {
    client: Arc<VultrClient>,
}

impl StartupScriptTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(SCRIPT
            .resolve(identifier, || self.client.list_startup_scripts())
            .await?)
    }

    async fn of_type(&self, script_type: &str) -> Result<Value, ToolError> {
        let scripts: Vec<Value> = self
            .client
            .list_startup_scripts()
            .await?
            .into_iter()
            .filter(|script| {
                script
                    .get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.eq_ignore_ascii_case(script_type))
            })
            .collect();
        Ok(json!(scripts))
    }

    async fn search(&self, query: &str) -> Result<Value, ToolError> {
        let query = query.to_lowercase();
        let scripts: Vec<Value> = self
            .client
            .list_startup_scripts()
            .await?
            .into_iter()
            .filter(|script| {
                let name = script.get("name").and_then(Value::as_str).unwrap_or_default();
                let body = script
                    .get("script")
                    .and_then(Value::as_str)
                    .map(decode_script)
                    .unwrap_or_default();
                name.to_lowercase().contains(&query) || body.to_lowercase().contains(&query)
            })
            .collect();
        Ok(json!(scripts))
    }
}

fn script_schema() -> Value {
    Schema::new()
        .string("script_identifier", "Startup script ID or name")
        .required()
        .build()
}

#[async_trait]
impl ToolModule for StartupScriptTools {
    fn prefix(&self) -> &'static str {
        "startup_scripts"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List all startup scripts", Schema::new().build()),
            Tool::new("get", "Get a startup script", script_schema()),
            Tool::new(
                "create",
                "Create a startup script from plain text",
                Schema::new()
                    .string("name", "Script name")
                    .required()
                    .string("script", "Script contents")
                    .required()
                    .string("script_type", "When the script runs")
                    .one_of(&["boot", "pxe"])
                    .default_value("boot")
                    .build(),
            ),
            Tool::new(
                "update",
                "Rename a startup script or replace its contents",
                Schema::new()
                    .string("script_identifier", "Startup script ID or name")
                    .required()
                    .string("name", "New name")
                    .string("script", "New contents")
                    .build(),
            ),
            Tool::new("delete", "Delete a startup script", script_schema()),
            Tool::new(
                "search",
                "Find startup scripts whose name or contents contain a term",
                Schema::new().string("query", "Search term").required().build(),
            ),
            Tool::new("get_content", "Get the decoded contents of a startup script", script_schema()),
            Tool::new("list_boot", "List boot scripts", Schema::new().build()),
            Tool::new("list_pxe", "List PXE scripts", Schema::new().build()),
            Tool::new(
                "create_common",
                "Create a boot script from a built-in template",
                Schema::new()
                    .string("template", "Template to install")
                    .required()
                    .one_of(&["docker_install", "nodejs_install", "security_updates", "ssh_setup"])
                    .integer("ssh_port", "SSH port for ssh_setup")
                    .default_value(22)
                    .build(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_startup_scripts().await?))
            }
            "get" => {
                let args: ScriptArgs = parse_args(args)?;
                let id = self.resolve(&args.script_identifier).await?;
                Ok(self.client.get_startup_script(&id).await?)
            }
            "create" => {
                let args: CreateArgs = parse_args(args)?;
                check_type(&args.script_type)?;
                let request = StartupScriptRequest {
                    name: Some(args.name),
                    script: Some(STANDARD.encode(args.script)),
                    script_type: Some(args.script_type),
                };
                Ok(self.client.create_startup_script(&request).await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                let id = self.resolve(&args.script_identifier).await?;
                let request = StartupScriptRequest {
                    name: args.name,
                    script: args.script.map(|script| STANDARD.encode(script)),
                    script_type: None,
                };
                self.client.update_startup_script(&id, &request).await?;
                Ok(success(format!("Startup script {} updated successfully", id)))
            }
            "delete" => {
                let args: ScriptArgs = parse_args(args)?;
                let id = self.resolve(&args.script_identifier).await?;
                self.client.delete_startup_script(&id).await?;
                Ok(success(format!(
                    "Successfully deleted startup script {}",
                    args.script_identifier
                )))
            }
            "search" => {
                let args: SearchArgs = parse_args(args)?;
                self.search(&args.query).await
            }
            "get_content" => {
                let args: ScriptArgs = parse_args(args)?;
                let id = self.resolve(&args.script_identifier).await?;
                let script = self.client.get_startup_script(&id).await?;
                let encoded = script.get("script").and_then(Value::as_str).unwrap_or_default();
                Ok(Value::String(decode_script(encoded)))
            }
            "list_boot" => {
                let _: NoArgs = parse_args(args)?;
                self.of_type("boot").await
            }
            "list_pxe" => {
                let _: NoArgs = parse_args(args)?;
                self.of_type("pxe").await
            }
            "create_common" => {
                let args: CommonArgs = parse_args(args)?;
                let (name, script) = args.template.render(args.ssh_port);
                let request = StartupScriptRequest {
                    name: Some(name.to_string()),
                    script: Some(STANDARD.encode(script)),
                    script_type: Some(boot()),
                };
                Ok(self.client.create_startup_script(&request).await?)
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

    const SCRIPT_BODY: &str = "#!/bin/bash\napt-get update\n";

    fn tools() -> (Arc<MockTransport>, StartupScriptTools) {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/startup-scripts",
            200,
            json!({
                "startup_scripts": [
                    {"id": "s-1", "name": "updates", "type": "boot", "script": STANDARD.encode(SCRIPT_BODY)},
                    {"id": "s-2", "name": "netboot", "type": "pxe"}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
        let tools = StartupScriptTools::new(Arc::new(VultrClient::new(mock.clone())));
        (mock, tools)
    }

    #[tokio::test]
    async fn test_create_encodes_script() {
        let (mock, tools) = tools();
        mock.on(Method::POST, "/startup-scripts", 201, json!({"startup_script": {"id": "s-3"}}));

        tools
            .call("create", json!({"name": "hello", "script": "echo hi"}))
            .await
            .unwrap();

        let body = mock.requests().pop().unwrap().body.unwrap();
        assert_eq!(body["script"], STANDARD.encode("echo hi"));
        assert_eq!(body["type"], "boot");
    }

    #[tokio::test]
    async fn test_rejects_unknown_type() {
        let (_, tools) = tools();
        let err = tools
            .call("create", json!({"name": "x", "script": "y", "script_type": "cron"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_get_content_decodes() {
        let (mock, tools) = tools();
        mock.on(
            Method::GET,
            "/startup-scripts/s-1",
            200,
            json!({"startup_script": {"id": "s-1", "script": STANDARD.encode(SCRIPT_BODY)}}),
        );

        let content = tools
            .call("get_content", json!({"script_identifier": "updates"}))
            .await
            .unwrap();
        assert_eq!(content, Value::String(SCRIPT_BODY.to_string()));
    }

    #[tokio::test]
    async fn test_search_matches_decoded_body() {
        let (_, tools) = tools();
        let found = tools.call("search", json!({"query": "APT-GET"})).await.unwrap();
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["id"], "s-1");

        let found = tools.call("search", json!({"query": "net"})).await.unwrap();
        assert_eq!(found[0]["id"], "s-2");
    }

    #[tokio::test]
    async fn test_list_by_type() {
        let (_, tools) = tools();
        let boot = tools.call("list_boot", json!({})).await.unwrap();
        assert_eq!(boot.as_array().unwrap().len(), 1);
        assert_eq!(boot[0]["id"], "s-1");

        let pxe = tools.call("list_pxe", Value::Null).await.unwrap();
        assert_eq!(pxe[0]["name"], "netboot");
    }

    #[tokio::test]
    async fn test_create_common_renders_template() {
        let (mock, tools) = tools();
        mock.on(Method::POST, "/startup-scripts", 201, json!({"startup_script": {"id": "s-4"}}));

        let created = tools
            .call("create_common", json!({"template": "ssh_setup", "ssh_port": 2222}))
            .await
            .unwrap();
        assert_eq!(created["id"], "s-4");

        let body = mock.requests().pop().unwrap().body.unwrap();
        assert_eq!(body["name"], "SSH Hardening");
        assert_eq!(body["type"], "boot");
        let script = decode_script(body["script"].as_str().unwrap());
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("s/#Port 22/Port 2222/"));

        let err = tools
            .call("create_common", json!({"template": "redis_install"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn test_decode_falls_back_to_raw_text() {
        assert_eq!(decode_script("not base64!"), "not base64!");
    }
}
