//! MCP Server implementation
//!
//! Mounts tool modules under their prefixes and serves them over stdio.

use super::module::{ResourceDef, ToolModule, JSON_MIME, TEXT_MIME};
use super::types::*;
use crate::client::VultrClient;
use crate::router::ToolFilter;
use crate::tools::{render_output, ToolError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

const CAPABILITIES_URI: &str = "vultr://capabilities";
const CACHE_STATS_URI: &str = "vultr://cache/stats";

const INSTRUCTIONS: &str = "Manage Vultr infrastructure: DNS domains and records, compute \
instances, block storage, networking, Kubernetes, load balancers, object storage and managed \
databases. Tools accept either a UUID or a human-friendly label, hostname or description \
wherever an existing resource is identified.";

type RpcResult = Result<Value, (i32, String)>;

/// MCP Server for the Vultr API
pub struct McpServer {
    name: String,
    client: Arc<VultrClient>,
    modules: Vec<Arc<dyn ToolModule>>,
    filter: ToolFilter,
    initialized: bool,
}

impl McpServer {
    pub fn new(name: impl Into<String>, client: Arc<VultrClient>) -> Self {
        Self {
            name: name.into(),
            client,
            modules: Vec::new(),
            filter: ToolFilter::new(),
            initialized: false,
        }
    }

    /// Only expose tools whose prefixed names pass the filter
    pub fn with_filter(mut self, filter: ToolFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn mount(mut self, module: Arc<dyn ToolModule>) -> Self {
        debug!(prefix = module.prefix(), "Mounting tool module");
        self.modules.push(module);
        self
    }

    pub fn mount_all(self, modules: impl IntoIterator<Item = Arc<dyn ToolModule>>) -> Self {
        modules.into_iter().fold(self, Self::mount)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Every exposed tool, with its `{prefix}_` name
    pub fn tools(&self) -> Vec<Tool> {
        self.modules
            .iter()
            .flat_map(|module| {
                let prefix = module.prefix();
                module.tools().into_iter().map(move |tool| Tool {
                    name: format!("{}_{}", prefix, tool.name),
                    ..tool
                })
            })
            .filter(|tool| self.filter.allows(&tool.name))
            .collect()
    }

    /// Run the MCP server over stdio
    pub async fn run_stdio(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        info!(
            modules = self.modules.len(),
            tools = self.tools().len(),
            "MCP server starting on stdio"
        );

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                break;
            }

            let message = line.trim();
            if message.is_empty() {
                continue;
            }

            debug!(request = %message, "Received MCP request");

            if let Some(response) = self.handle_message(message).await {
                let response_str = serde_json::to_string(&response)?;
                debug!(response = %response_str, "Sending MCP response");
                stdout.write_all(response_str.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Handle a single JSON-RPC message, returning `None` for notifications
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(message) {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Failed to parse JSON-RPC request");
                return Some(JsonRpcResponse::error(
                    JsonRpcId::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(raw.clone()) {
            Ok(request) => request,
            Err(e) => {
                let id = raw
                    .get("id")
                    .and_then(|id| serde_json::from_value(id.clone()).ok())
                    .unwrap_or_default();
                return Some(JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                "Invalid request: jsonrpc must be \"2.0\"",
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request),
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                info!("MCP client initialized");
                return None;
            }
            method if method.starts_with("notifications/") => {
                debug!(method = %method, "Ignoring notification");
                return None;
            }
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(&request).await,
            "resources/list" => self.handle_resources_list(),
            "resources/templates/list" => self.handle_resource_templates_list(),
            "resources/read" => self.handle_resources_read(&request).await,
            method => {
                warn!(method = %method, "Unknown MCP method");
                Err((METHOD_NOT_FOUND, format!("Method not found: {}", method)))
            }
        };

        match result {
            Ok(value) => Some(JsonRpcResponse::success(request.id, value)),
            Err((code, message)) => Some(JsonRpcResponse::error(request.id, code, message)),
        }
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> RpcResult {
        let params: InitializeParams = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        if let Some(client) = &params.client_info {
            info!(
                client = %client.name,
                client_version = %client.version,
                protocol = params.protocol_version.as_deref().unwrap_or("unknown"),
                "MCP initialize"
            );
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                resources: Some(ResourcesCapability {
                    subscribe: Some(false),
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };

        serde_json::to_value(result).map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }

    fn handle_tools_list(&self) -> RpcResult {
        let result = ToolsListResult { tools: self.tools() };
        serde_json::to_value(result).map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }

    /// The module owning `tool_name` (longest prefix wins) and the unprefixed name
    fn route_tool<'a>(&self, tool_name: &'a str) -> Option<(Arc<dyn ToolModule>, &'a str)> {
        if !self.filter.allows(tool_name) {
            return None;
        }

        self.modules
            .iter()
            .filter_map(|module| {
                let short = tool_name
                    .strip_prefix(module.prefix())
                    .and_then(|rest| rest.strip_prefix('_'))?;
                Some((module, short))
            })
            .max_by_key(|(module, _)| module.prefix().len())
            .filter(|(module, short)| module.tools().iter().any(|t| t.name == *short))
            .map(|(module, short)| (Arc::clone(module), short))
    }

    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> RpcResult {
        let params: ToolCallParams = request
            .params
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .ok_or_else(|| (INVALID_PARAMS, "Missing or invalid params".to_string()))?;

        let (module, short_name) = self
            .route_tool(&params.name)
            .ok_or_else(|| (INVALID_PARAMS, format!("Unknown tool: {}", params.name)))?;

        debug!(tool = %params.name, "Calling tool");

        let result = match module.call(short_name, params.arguments).await {
            Ok(value) => ToolCallResult::text(render_output(&value)),
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool call failed");
                ToolCallResult::error(e.to_string())
            }
        };

        serde_json::to_value(result).map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }

    fn builtin_resources() -> [ResourceDef; 2] {
        [
            ResourceDef::json(
                CAPABILITIES_URI,
                "capabilities",
                "Server capabilities, mounted modules and supported DNS record types",
            ),
            ResourceDef::json(
                CACHE_STATS_URI,
                "cache-stats",
                "Response cache hit/miss counters and sizes",
            ),
        ]
    }

    fn all_resources(&self) -> Vec<(Option<&Arc<dyn ToolModule>>, ResourceDef)> {
        Self::builtin_resources()
            .into_iter()
            .map(|def| (None, def))
            .chain(self.modules.iter().flat_map(|module| {
                module
                    .resources()
                    .into_iter()
                    .map(move |def| (Some(module), def))
            }))
            .collect()
    }

    fn handle_resources_list(&self) -> RpcResult {
        let resources = self
            .all_resources()
            .into_iter()
            .filter(|(_, def)| def.is_concrete())
            .map(|(_, def)| def.to_resource())
            .collect();

        serde_json::to_value(ResourcesListResult { resources })
            .map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }

    fn handle_resource_templates_list(&self) -> RpcResult {
        let resource_templates = self
            .all_resources()
            .into_iter()
            .filter(|(_, def)| !def.is_concrete())
            .map(|(_, def)| def.to_template())
            .collect();

        serde_json::to_value(ResourceTemplatesListResult { resource_templates })
            .map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }

    /// Find the resource serving `uri`; concrete URIs win over templates
    fn match_resource(
        &self,
        uri: &str,
    ) -> Option<(Option<Arc<dyn ToolModule>>, ResourceDef, HashMap<String, String>)> {
        let mut resources = self.all_resources();
        resources.sort_by_key(|(_, def)| !def.is_concrete());

        resources.into_iter().find_map(|(module, def)| {
            let template = match def.template() {
                Ok(template) => template,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed resource template");
                    return None;
                }
            };
            let params = template.matches(uri)?;
            Some((module.cloned(), def, params))
        })
    }

    fn read_builtin(&self, uri: &str) -> Value {
        match uri {
            CACHE_STATS_URI => match self.client.cache_stats() {
                Some(stats) => json!({"enabled": true, "stats": stats}),
                None => json!({"enabled": false}),
            },
            _ => json!({
                "server": self.name,
                "version": env!("CARGO_PKG_VERSION"),
                "protocol_version": PROTOCOL_VERSION,
                "modules": self.modules.iter().map(|m| m.prefix()).collect::<Vec<_>>(),
                "tool_count": self.tools().len(),
                "dns": crate::dns::capabilities(),
            }),
        }
    }

    async fn handle_resources_read(&self, request: &JsonRpcRequest) -> RpcResult {
        let params: ReadResourceParams = request
            .params
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .ok_or_else(|| (INVALID_PARAMS, "Missing or invalid params: uri is required".to_string()))?;

        let (module, def, captured) = self
            .match_resource(&params.uri)
            .ok_or_else(|| (INVALID_PARAMS, format!("Unknown resource: {}", params.uri)))?;

        let value = match module {
            None => self.read_builtin(&params.uri),
            Some(module) => module
                .read_resource(def.uri, &captured)
                .await
                .map_err(|e| match e {
                    ToolError::UnknownResource(_) => {
                        (INVALID_PARAMS, format!("Unknown resource: {}", params.uri))
                    }
                    other => (INTERNAL_ERROR, other.to_string()),
                })?,
        };

        let (mime_type, text) = match (&value, def.mime_type) {
            (Value::String(text), TEXT_MIME) => (TEXT_MIME, text.clone()),
            _ => (JSON_MIME, render_output(&value)),
        };

        let result = ReadResourceResult {
            contents: vec![ResourceContents {
                uri: params.uri,
                mime_type: mime_type.to_string(),
                text,
            }],
        };
        serde_json::to_value(result).map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use crate::mcp::Schema;
    use async_trait::async_trait;

    struct EchoModule;

    #[async_trait]
    impl ToolModule for EchoModule {
        fn prefix(&self) -> &'static str {
            "echo"
        }

        fn tools(&self) -> Vec<Tool> {
            vec![
                Tool::new("say", "Echo text", Schema::new().string("text", "Text").required().build()),
                Tool::new("fail", "Always fails", Schema::new().build()),
            ]
        }

        async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
            match name {
                "say" => Ok(args["text"].clone()),
                "fail" => Err(ToolError::Invalid("nope".to_string())),
                _ => Err(ToolError::UnknownTool(name.to_string())),
            }
        }

        fn resources(&self) -> Vec<ResourceDef> {
            vec![
                ResourceDef::json("echo://list", "list", "All echoes"),
                ResourceDef::json("echo://{word}", "word", "One echo"),
            ]
        }

        async fn read_resource(
            &self,
            template: &str,
            params: &HashMap<String, String>,
        ) -> Result<Value, ToolError> {
            match template {
                "echo://list" => Ok(json!(["a", "b"])),
                "echo://{word}" => Ok(json!({"word": params["word"]})),
                _ => Err(ToolError::UnknownResource(template.to_string())),
            }
        }
    }

    /// Shares the `echo` stem to exercise longest-prefix routing
    struct EchoExtraModule;

    #[async_trait]
    impl ToolModule for EchoExtraModule {
        fn prefix(&self) -> &'static str {
            "echo_extra"
        }

        fn tools(&self) -> Vec<Tool> {
            vec![Tool::new("say", "Echo loudly", Schema::new().build())]
        }

        async fn call(&self, _name: &str, _args: Value) -> Result<Value, ToolError> {
            Ok(json!("LOUD"))
        }
    }

    fn server() -> McpServer {
        let client = Arc::new(VultrClient::new(Arc::new(MockTransport::new())));
        McpServer::new("test", client)
            .mount(Arc::new(EchoModule))
            .mount(Arc::new(EchoExtraModule))
    }

    async fn call(server: &mut McpServer, message: Value) -> Value {
        let response = server.handle_message(&message.to_string()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mut server = server();
        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
        assert_eq!(response.id, JsonRpcId::Null);
    }

    #[tokio::test]
    async fn test_initialize_and_notification() {
        let mut server = server();
        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {
                "protocolVersion": "2024-11-05", "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0"}
            }}),
        )
        .await;
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "test");
        assert!(response["result"]["capabilities"]["resources"].is_object());

        let none = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(none.is_none());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mut server = server();
        let response = call(&mut server, json!({"jsonrpc": "2.0", "id": 2, "method": "nope"})).await;
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_are_prefixed_and_filtered() {
        let server = server().with_filter(ToolFilter::from_patterns(&["echo_*"]).unwrap());
        let names: Vec<String> = server.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo_say", "echo_fail", "echo_extra_say"]);

        let server = server.with_filter(ToolFilter::from_patterns(&["echo_say"]).unwrap());
        let names: Vec<String> = server.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo_say"]);
    }

    #[tokio::test]
    async fn test_tool_call_routes_by_longest_prefix() {
        let mut server = server();
        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "echo_extra_say", "arguments": {}}}),
        )
        .await;
        assert_eq!(response["result"]["content"][0]["text"], "LOUD");

        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "echo_say", "arguments": {"text": "hi"}}}),
        )
        .await;
        assert_eq!(response["result"]["content"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn test_tool_errors_are_results() {
        let mut server = server();
        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call",
                   "params": {"name": "echo_fail"}}),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["content"][0]["text"], "nope");
        assert!(response.get("error").is_none());
    }

    #[tokio::test]
    async fn test_unknown_and_filtered_tools() {
        let mut server = server().with_filter(ToolFilter::from_patterns(&["echo_say"]).unwrap());
        for name in ["echo_missing", "echo_fail", "other_say"] {
            let response = call(
                &mut server,
                json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {"name": name}}),
            )
            .await;
            assert_eq!(response["error"]["code"], INVALID_PARAMS, "{}", name);
        }
    }

    #[tokio::test]
    async fn test_resource_listing() {
        let mut server = server();
        let response = call(&mut server, json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"})).await;
        let uris: Vec<&str> = response["result"]["resources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["uri"].as_str().unwrap())
            .collect();
        assert_eq!(uris, vec![CAPABILITIES_URI, CACHE_STATS_URI, "echo://list"]);

        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 8, "method": "resources/templates/list"}),
        )
        .await;
        assert_eq!(response["result"]["resourceTemplates"][0]["uriTemplate"], "echo://{word}");
    }

    #[tokio::test]
    async fn test_resource_read_prefers_concrete() {
        let mut server = server();
        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 9, "method": "resources/read", "params": {"uri": "echo://list"}}),
        )
        .await;
        let contents = &response["result"]["contents"][0];
        assert_eq!(contents["mimeType"], JSON_MIME);
        let parsed: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
        assert_eq!(parsed, json!(["a", "b"]));

        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 10, "method": "resources/read", "params": {"uri": "echo://hello"}}),
        )
        .await;
        let text = response["result"]["contents"][0]["text"].as_str().unwrap();
        assert!(text.contains("hello"));
    }

    #[tokio::test]
    async fn test_builtin_resources_and_unknown_uri() {
        let mut server = server();
        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 11, "method": "resources/read", "params": {"uri": CACHE_STATS_URI}}),
        )
        .await;
        let text = response["result"]["contents"][0]["text"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), json!({"enabled": false}));

        let response = call(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 12, "method": "resources/read", "params": {"uri": "nope://x"}}),
        )
        .await;
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }
}
