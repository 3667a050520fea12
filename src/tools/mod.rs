//! MCP tool modules, one per Vultr API area
//!
//! Every module wraps an `Arc<VultrClient>`, declares its tools with the
//! [`Schema`](crate::mcp::Schema) builder and deserializes arguments into a
//! per-tool serde struct.

pub mod backups;
pub mod block_storage;
pub mod dns;
pub mod firewall;
pub mod instances;
pub mod iso;
pub mod kubernetes;
pub mod load_balancer;
pub mod managed_databases;
pub mod object_storage;
pub mod os;
pub mod plans;
pub mod regions;
pub mod reserved_ips;
pub mod snapshots;
pub mod ssh_keys;
pub mod startup_scripts;
pub mod vpcs;

use crate::client::{ApiError, VultrClient};
use crate::config::McpConfig;
use crate::mcp::ToolModule;
use crate::router::ResolveError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to the MCP client as `isError` tool results
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// A request the API would accept syntactically but that makes no sense
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Deserialize tool arguments; a missing argument object counts as `{}`
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Render a tool result: strings verbatim, everything else as pretty JSON
pub fn render_output(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// `{"status": "success", "message": ...}`
pub(crate) fn success(message: impl Into<String>) -> Value {
    json!({"status": "success", "message": message.into()})
}

/// Arguments of tools that take nothing
#[derive(Debug, Default, Deserialize)]
pub(crate) struct NoArgs {}

/// Captured URI parameter, or an unknown-resource error
pub(crate) fn uri_param<'a>(
    params: &'a std::collections::HashMap<String, String>,
    name: &str,
) -> Result<&'a str, ToolError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| ToolError::UnknownResource(format!("missing parameter '{}'", name)))
}

/// True when `item[field]` holds a non-empty string (an attachment ID)
pub(crate) fn is_attached(item: &Value, field: &str) -> bool {
    item.get(field)
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty())
}

/// Objects whose `field` equals `value`
pub(crate) fn filter_field(items: Vec<Value>, field: &str, value: &str) -> Vec<Value> {
    items
        .into_iter()
        .filter(|item| item.get(field).and_then(Value::as_str) == Some(value))
        .collect()
}

/// Every tool module, in mount order
pub fn all_modules(client: Arc<VultrClient>) -> Vec<Arc<dyn ToolModule>> {
    vec![
        Arc::new(dns::DnsTools::new(client.clone())),
        Arc::new(instances::InstanceTools::new(client.clone())),
        Arc::new(ssh_keys::SshKeyTools::new(client.clone())),
        Arc::new(backups::BackupTools::new(client.clone())),
        Arc::new(firewall::FirewallTools::new(client.clone())),
        Arc::new(snapshots::SnapshotTools::new(client.clone())),
        Arc::new(regions::RegionTools::new(client.clone())),
        Arc::new(reserved_ips::ReservedIpTools::new(client.clone())),
        Arc::new(block_storage::BlockStorageTools::new(client.clone())),
        Arc::new(vpcs::VpcTools::new(client.clone())),
        Arc::new(plans::PlanTools::new(client.clone())),
        Arc::new(os::OsTools::new(client.clone())),
        Arc::new(startup_scripts::StartupScriptTools::new(client.clone())),
        Arc::new(iso::IsoTools::new(client.clone())),
        Arc::new(kubernetes::KubernetesTools::new(client.clone())),
        Arc::new(load_balancer::LoadBalancerTools::new(client.clone())),
        Arc::new(object_storage::ObjectStorageTools::new(client.clone())),
        Arc::new(managed_databases::DatabaseTools::new(client)),
    ]
}

/// The modules enabled by `[mcp].modules`
pub fn configured_modules(
    config: &McpConfig,
    client: Arc<VultrClient>,
) -> Vec<Arc<dyn ToolModule>> {
    all_modules(client)
        .into_iter()
        .filter(|module| config.module_enabled(module.prefix()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use std::collections::HashSet;

    #[derive(Debug, Deserialize)]
    struct Args {
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn test_parse_args() {
        let args: Args = parse_args(json!({"name": "web"})).unwrap();
        assert_eq!(args.name, "web");
        assert_eq!(args.count, 0);

        let err = parse_args::<Args>(json!({"count": 2})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(err.to_string().contains("missing field `name`"));

        let _: NoArgs = parse_args(Value::Null).unwrap();
    }

    #[test]
    fn test_render_output() {
        assert_eq!(render_output(&json!("$ORIGIN a.com.")), "$ORIGIN a.com.");
        assert_eq!(render_output(&json!({"a": 1})), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_module_prefixes_are_unique() {
        let client = Arc::new(VultrClient::new(Arc::new(MockTransport::new())));
        let modules = all_modules(client);
        let prefixes: HashSet<&str> = modules.iter().map(|m| m.prefix()).collect();
        assert_eq!(prefixes.len(), modules.len());
        assert_eq!(modules.len(), 18);
    }

    #[test]
    fn test_configured_modules() {
        let client = Arc::new(VultrClient::new(Arc::new(MockTransport::new())));
        let config = McpConfig {
            modules: Some(vec!["dns".to_string(), "kubernetes".to_string()]),
            ..Default::default()
        };
        let prefixes: Vec<&str> = configured_modules(&config, client)
            .iter()
            .map(|m| m.prefix())
            .collect();
        assert_eq!(prefixes, vec!["dns", "kubernetes"]);
    }

    #[test]
    fn test_tool_names_unique_within_modules() {
        let client = Arc::new(VultrClient::new(Arc::new(MockTransport::new())));
        for module in all_modules(client) {
            let tools = module.tools();
            let names: HashSet<String> = tools.iter().map(|t| t.name.clone()).collect();
            assert_eq!(names.len(), tools.len(), "duplicate tool in {}", module.prefix());
        }
    }
}
