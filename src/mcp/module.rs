//! Tool modules mounted on the MCP server
//!
//! Each Vultr API area implements [`ToolModule`]. The server prefixes every
//! tool a module declares with `{prefix}_` and routes calls back by prefix.

use super::types::{Resource, ResourceTemplate, Tool};
use crate::router::UriTemplate;
use crate::tools::ToolError;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub const JSON_MIME: &str = "application/json";
pub const TEXT_MIME: &str = "text/plain";

/// A resource a module can serve, concrete or templated
#[derive(Debug, Clone)]
pub struct ResourceDef {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
}

impl ResourceDef {
    pub const fn json(uri: &'static str, name: &'static str, description: &'static str) -> Self {
        Self {
            uri,
            name,
            description,
            mime_type: JSON_MIME,
        }
    }

    /// A plain-text resource such as a zone file
    pub const fn text(uri: &'static str, name: &'static str, description: &'static str) -> Self {
        Self {
            uri,
            name,
            description,
            mime_type: TEXT_MIME,
        }
    }

    /// True when the URI has no `{param}` placeholders
    pub fn is_concrete(&self) -> bool {
        !self.uri.contains('{')
    }

    pub fn template(&self) -> Result<UriTemplate, String> {
        UriTemplate::parse(self.uri)
    }

    pub fn to_resource(&self) -> Resource {
        Resource {
            uri: self.uri.to_string(),
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            mime_type: Some(self.mime_type.to_string()),
        }
    }

    pub fn to_template(&self) -> ResourceTemplate {
        ResourceTemplate {
            uri_template: self.uri.to_string(),
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            mime_type: Some(self.mime_type.to_string()),
        }
    }
}

/// A group of tools and resources for one API area
#[async_trait]
pub trait ToolModule: Send + Sync {
    /// Name prefix for this module's tools, e.g. `dns`
    fn prefix(&self) -> &'static str;

    /// Tool definitions with unprefixed names
    fn tools(&self) -> Vec<Tool>;

    /// Execute a tool by its unprefixed name
    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError>;

    fn resources(&self) -> Vec<ResourceDef> {
        Vec::new()
    }

    /// Read a resource matched by `template` with the captured parameters
    async fn read_resource(
        &self,
        template: &str,
        _params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        Err(ToolError::UnknownResource(template.to_string()))
    }
}

/// Builder for tool `inputSchema` objects
///
/// Modifiers such as [`required`](Self::required) and
/// [`default_value`](Self::default_value) apply to the property added last.
#[derive(Debug, Default)]
pub struct Schema {
    properties: Map<String, Value>,
    required: Vec<String>,
    last: Option<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    fn property(mut self, name: &str, schema: Value) -> Self {
        self.properties.insert(name.to_string(), schema);
        self.last = Some(name.to_string());
        self
    }

    fn last_mut(&mut self) -> Option<&mut Map<String, Value>> {
        let last = self.last.as_ref()?;
        self.properties.get_mut(last)?.as_object_mut()
    }

    pub fn string(self, name: &str, description: &str) -> Self {
        self.property(name, json!({"type": "string", "description": description}))
    }

    pub fn integer(self, name: &str, description: &str) -> Self {
        self.property(name, json!({"type": "integer", "description": description}))
    }

    pub fn number(self, name: &str, description: &str) -> Self {
        self.property(name, json!({"type": "number", "description": description}))
    }

    pub fn boolean(self, name: &str, description: &str) -> Self {
        self.property(name, json!({"type": "boolean", "description": description}))
    }

    pub fn string_array(self, name: &str, description: &str) -> Self {
        self.property(
            name,
            json!({"type": "array", "items": {"type": "string"}, "description": description}),
        )
    }

    pub fn object_array(self, name: &str, description: &str) -> Self {
        self.property(
            name,
            json!({"type": "array", "items": {"type": "object"}, "description": description}),
        )
    }

    pub fn object(self, name: &str, description: &str) -> Self {
        self.property(name, json!({"type": "object", "description": description}))
    }

    pub fn required(mut self) -> Self {
        if let Some(last) = self.last.clone() {
            if !self.required.contains(&last) {
                self.required.push(last);
            }
        }
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if let Some(property) = self.last_mut() {
            property.insert("default".to_string(), value);
        }
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        if let Some(property) = self.last_mut() {
            property.insert("enum".to_string(), json!(values));
        }
        self
    }

    pub fn build(self) -> Value {
        let mut schema = json!({
            "type": "object",
            "properties": Value::Object(self.properties),
        });
        if !self.required.is_empty() {
            schema["required"] = json!(self.required);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder() {
        let schema = Schema::new()
            .string("domain", "Domain name")
            .required()
            .integer("ttl", "Time to live")
            .default_value(300)
            .string("type", "Record type")
            .one_of(&["A", "AAAA"])
            .build();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["domain"]));
        assert_eq!(schema["properties"]["ttl"]["default"], 300);
        assert_eq!(schema["properties"]["type"]["enum"], json!(["A", "AAAA"]));
    }

    #[test]
    fn test_empty_schema_has_no_required() {
        let schema = Schema::new().build();
        assert_eq!(schema, json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn test_resource_def_listing() {
        let def = ResourceDef::json("domains://{domain}", "domain", "A DNS domain");
        assert!(!def.is_concrete());
        assert!(def.template().is_ok());
        assert_eq!(def.to_template().uri_template, "domains://{domain}");
        assert_eq!(def.to_resource().mime_type.as_deref(), Some(JSON_MIME));
    }
}
