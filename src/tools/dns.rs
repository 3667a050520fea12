//! DNS domains, records, validation, analysis and zone files

use super::{parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{CreateDomainRequest, RecordRequest, VultrClient};
use crate::dns::{self, DEFAULT_TTL};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct DomainArgs {
    domain: String,
}

#[derive(Debug, Deserialize)]
struct CreateDomainArgs {
    domain: String,
    ip: String,
    #[serde(default = "dns_sec_disabled")]
    dns_sec: String,
}

fn dns_sec_disabled() -> String {
    "disabled".to_string()
}

#[derive(Debug, Deserialize)]
struct RecordArgs {
    domain: String,
    record_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateRecordArgs {
    domain: String,
    #[serde(alias = "type")]
    record_type: String,
    name: String,
    data: String,
    #[serde(default)]
    ttl: Option<u32>,
    #[serde(default)]
    priority: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct UpdateRecordArgs {
    domain: String,
    record_id: String,
    #[serde(alias = "type")]
    record_type: String,
    name: String,
    data: String,
    #[serde(default)]
    ttl: Option<u32>,
    #[serde(default)]
    priority: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ValidateRecordArgs {
    #[serde(alias = "type")]
    record_type: String,
    name: String,
    data: String,
    #[serde(default)]
    ttl: Option<i64>,
    #[serde(default)]
    priority: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SetupWebsiteArgs {
    domain: String,
    ip: String,
    #[serde(default = "enabled")]
    www_enabled: bool,
    #[serde(default)]
    ttl: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SetupEmailArgs {
    domain: String,
    mail_server: String,
    #[serde(default = "mx_priority")]
    priority: u32,
    #[serde(default)]
    ttl: Option<u32>,
}

fn mx_priority() -> u32 {
    10
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ImportZoneArgs {
    domain: String,
    zone_data: String,
    #[serde(default)]
    dry_run: bool,
}

/// Tools under the `dns_` prefix
pub struct DnsTools {
    client: Arc<VultrClient>,
}

impl DnsTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn analyze(&self, domain: &str) -> Result<Value, ToolError> {
        let records = self.client.list_records(domain).await?;
        Ok(json!(dns::analyze_records(domain, &records)))
    }

    async fn setup_website(&self, args: SetupWebsiteArgs) -> Result<Value, ToolError> {
        let mut created = Vec::new();

        let ttl = Some(args.ttl.unwrap_or(DEFAULT_TTL));
        let root = RecordRequest {
            record_type: "A".to_string(),
            name: "@".to_string(),
            data: args.ip,
            ttl,
            priority: None,
        };
        created.push(self.client.create_record(&args.domain, &root).await?);

        if args.www_enabled {
            let www = RecordRequest {
                record_type: "CNAME".to_string(),
                name: "www".to_string(),
                data: args.domain.clone(),
                ttl,
                priority: None,
            };
            created.push(self.client.create_record(&args.domain, &www).await?);
        }

        Ok(json!(created))
    }

    /// Point the domain's mail at a server with an apex MX record
    async fn setup_email(&self, args: SetupEmailArgs) -> Result<Value, ToolError> {
        let mail_server = args.mail_server.trim_end_matches('.').to_string();
        if mail_server.parse::<IpAddr>().is_ok() {
            return Err(ToolError::InvalidArguments(
                "MX records must point at a hostname, not an IP address".to_string(),
            ));
        }
        let mx = RecordRequest {
            record_type: "MX".to_string(),
            name: "@".to_string(),
            data: mail_server,
            ttl: Some(args.ttl.unwrap_or(DEFAULT_TTL)),
            priority: Some(args.priority),
        };
        Ok(json!([self.client.create_record(&args.domain, &mx).await?]))
    }
}

fn domain_schema() -> Value {
    Schema::new()
        .string("domain", "Domain name, e.g. example.com")
        .required()
        .build()
}

fn record_schema(with_id: bool) -> Value {
    let schema = Schema::new()
        .string("domain", "Domain name")
        .required();
    let schema = if with_id {
        schema.string("record_id", "Record ID").required()
    } else {
        schema
    };
    schema
        .string("record_type", "Record type")
        .one_of(&dns::SUPPORTED_RECORD_TYPES)
        .required()
        .string("name", "Record name; \"@\" for the zone apex")
        .required()
        .string("data", "Record value, e.g. an IP address or hostname")
        .required()
        .integer("ttl", "Time to live in seconds")
        .default_value(DEFAULT_TTL)
        .integer("priority", "Priority for MX and SRV records")
        .build()
}

#[async_trait]
impl ToolModule for DnsTools {
    fn prefix(&self) -> &'static str {
        "dns"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list_domains", "List all DNS domains in the account", Schema::new().build()),
            Tool::new("get_domain", "Get details of a DNS domain", domain_schema()),
            Tool::new(
                "create_domain",
                "Create a DNS domain with a default A record pointing at an IP",
                Schema::new()
                    .string("domain", "Domain name")
                    .required()
                    .string("ip", "IPv4 address for the default A record")
                    .required()
                    .string("dns_sec", "DNSSEC state")
                    .one_of(&["enabled", "disabled"])
                    .default_value("disabled")
                    .build(),
            ),
            Tool::new("delete_domain", "Delete a DNS domain and all of its records", domain_schema()),
            Tool::new("list_records", "List all DNS records of a domain", domain_schema()),
            Tool::new(
                "get_record",
                "Get one DNS record",
                Schema::new()
                    .string("domain", "Domain name")
                    .required()
                    .string("record_id", "Record ID")
                    .required()
                    .build(),
            ),
            Tool::new("create_record", "Create a DNS record", record_schema(false)),
            Tool::new("update_record", "Update a DNS record", record_schema(true)),
            Tool::new(
                "delete_record",
                "Delete a DNS record",
                Schema::new()
                    .string("domain", "Domain name")
                    .required()
                    .string("record_id", "Record ID")
                    .required()
                    .build(),
            ),
            Tool::new(
                "validate_record",
                "Check a DNS record before creating it; reports errors, warnings and suggestions",
                Schema::new()
                    .string("record_type", "Record type")
                    .required()
                    .string("name", "Record name")
                    .required()
                    .string("data", "Record value")
                    .required()
                    .integer("ttl", "Time to live in seconds")
                    .integer("priority", "Priority for MX and SRV records")
                    .build(),
            ),
            Tool::new(
                "analyze_domain",
                "Review a domain's DNS configuration and suggest improvements",
                domain_schema(),
            ),
            Tool::new(
                "setup_website",
                "Create the A record for the apex and a www CNAME for a website",
                Schema::new()
                    .string("domain", "Domain name")
                    .required()
                    .string("ip", "Website IPv4 address")
                    .required()
                    .boolean("www_enabled", "Also create a www CNAME")
                    .default_value(true)
                    .integer("ttl", "Time to live in seconds")
                    .default_value(DEFAULT_TTL)
                    .build(),
            ),
            Tool::new(
                "setup_email",
                "Create the apex MX record that routes a domain's mail to a server",
                Schema::new()
                    .string("domain", "Domain name")
                    .required()
                    .string("mail_server", "Mail server hostname, e.g. mail.example.com")
                    .required()
                    .integer("priority", "MX priority")
                    .default_value(10)
                    .integer("ttl", "Time to live in seconds")
                    .default_value(DEFAULT_TTL)
                    .build(),
            ),
            Tool::new(
                "export_zone_file",
                "Export a domain's records as a BIND zone file",
                domain_schema(),
            ),
            Tool::new(
                "import_zone_file",
                "Import records from BIND zone file text; dry_run only reports what would be created",
                Schema::new()
                    .string("domain", "Domain name")
                    .required()
                    .string("zone_data", "Zone file contents")
                    .required()
                    .boolean("dry_run", "Validate without creating records")
                    .default_value(false)
                    .build(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list_domains" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_domains().await?))
            }
            "get_domain" => {
                let args: DomainArgs = parse_args(args)?;
                Ok(self.client.get_domain(&args.domain).await?)
            }
            "create_domain" => {
                let args: CreateDomainArgs = parse_args(args)?;
                let request = CreateDomainRequest {
                    domain: args.domain,
                    ip: Some(args.ip),
                    dns_sec: Some(args.dns_sec),
                };
                Ok(self.client.create_domain(&request).await?)
            }
            "delete_domain" => {
                let args: DomainArgs = parse_args(args)?;
                self.client.delete_domain(&args.domain).await?;
                Ok(success(format!("Domain {} deleted successfully", args.domain)))
            }
            "list_records" => {
                let args: DomainArgs = parse_args(args)?;
                Ok(json!(self.client.list_records(&args.domain).await?))
            }
            "get_record" => {
                let args: RecordArgs = parse_args(args)?;
                Ok(self.client.get_record(&args.domain, &args.record_id).await?)
            }
            "create_record" => {
                let args: CreateRecordArgs = parse_args(args)?;
                let request = RecordRequest {
                    record_type: args.record_type.to_uppercase(),
                    name: args.name,
                    data: args.data,
                    ttl: Some(args.ttl.unwrap_or(DEFAULT_TTL)),
                    priority: args.priority,
                };
                Ok(self.client.create_record(&args.domain, &request).await?)
            }
            "update_record" => {
                let args: UpdateRecordArgs = parse_args(args)?;
                let request = RecordRequest {
                    record_type: args.record_type.to_uppercase(),
                    name: args.name,
                    data: args.data,
                    ttl: args.ttl,
                    priority: args.priority,
                };
                self.client
                    .update_record(&args.domain, &args.record_id, &request)
                    .await?;
                Ok(success(format!("Record {} updated successfully", args.record_id)))
            }
            "delete_record" => {
                let args: RecordArgs = parse_args(args)?;
                self.client.delete_record(&args.domain, &args.record_id).await?;
                Ok(success(format!("Record {} deleted successfully", args.record_id)))
            }
            "validate_record" => {
                let args: ValidateRecordArgs = parse_args(args)?;
                let report = dns::validate_record(
                    &args.record_type,
                    &args.name,
                    &args.data,
                    args.ttl,
                    args.priority,
                );
                Ok(json!(report))
            }
            "analyze_domain" => {
                let args: DomainArgs = parse_args(args)?;
                self.analyze(&args.domain).await
            }
            "setup_website" => self.setup_website(parse_args(args)?).await,
            "setup_email" => self.setup_email(parse_args(args)?).await,
            "export_zone_file" => {
                let args: DomainArgs = parse_args(args)?;
                Ok(Value::String(self.client.export_zone_file(&args.domain).await?))
            }
            "import_zone_file" => {
                let args: ImportZoneArgs = parse_args(args)?;
                let results = self
                    .client
                    .import_zone_file(&args.domain, &args.zone_data, args.dry_run)
                    .await?;
                Ok(json!(results))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("domains://list", "domains", "All DNS domains"),
            ResourceDef::json("domains://{domain}", "domain", "One DNS domain"),
            ResourceDef::json("domains://{domain}/records", "records", "All records of a domain"),
            ResourceDef::json(
                "domains://{domain}/records/{record_id}",
                "record",
                "One DNS record",
            ),
            ResourceDef::json(
                "domains://{domain}/analysis",
                "analysis",
                "DNS configuration review of a domain",
            ),
            ResourceDef::text(
                "domains://{domain}/zone-file",
                "zone-file",
                "A domain exported as a BIND zone file",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "domains://list" => Ok(json!(self.client.list_domains().await?)),
            "domains://{domain}" => {
                Ok(self.client.get_domain(uri_param(params, "domain")?).await?)
            }
            "domains://{domain}/records" => {
                Ok(json!(self.client.list_records(uri_param(params, "domain")?).await?))
            }
            "domains://{domain}/records/{record_id}" => Ok(self
                .client
                .get_record(uri_param(params, "domain")?, uri_param(params, "record_id")?)
                .await?),
            "domains://{domain}/analysis" => self.analyze(uri_param(params, "domain")?).await,
            "domains://{domain}/zone-file" => Ok(Value::String(
                self.client
                    .export_zone_file(uri_param(params, "domain")?)
                    .await?,
            )),
            _ => Err(ToolError::UnknownResource(template.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use reqwest::Method;

    fn tools() -> (Arc<MockTransport>, DnsTools) {
        let mock = Arc::new(MockTransport::new());
        let client = Arc::new(VultrClient::new(mock.clone()));
        (mock, DnsTools::new(client))
    }

    #[tokio::test]
    async fn test_create_record_defaults_ttl() {
        let (mock, tools) = tools();
        mock.on(
            Method::POST,
            "/domains/example.com/records",
            201,
            json!({"record": {"id": "r1", "type": "A", "name": "www", "data": "192.0.2.1", "ttl": 300}}),
        );

        let result = tools
            .call(
                "create_record",
                json!({"domain": "example.com", "record_type": "a", "name": "www", "data": "192.0.2.1"}),
            )
            .await
            .unwrap();
        assert_eq!(result["id"], "r1");

        let sent = mock.requests().pop().unwrap().body.unwrap();
        assert_eq!(sent["type"], "A");
        assert_eq!(sent["ttl"], 300);
        assert!(sent.get("priority").is_none());
    }

    #[tokio::test]
    async fn test_setup_website_creates_apex_and_www() {
        let (mock, tools) = tools();
        mock.on(Method::POST, "/domains/example.com/records", 201, json!({"record": {"id": "r"}}));

        let result = tools
            .call("setup_website", json!({"domain": "example.com", "ip": "192.0.2.1"}))
            .await
            .unwrap();
        assert_eq!(result.as_array().unwrap().len(), 2);

        let bodies: Vec<Value> = mock.requests().into_iter().filter_map(|r| r.body).collect();
        assert_eq!(bodies[0]["type"], "A");
        assert_eq!(bodies[0]["name"], "@");
        assert_eq!(bodies[1]["type"], "CNAME");
        assert_eq!(bodies[1]["name"], "www");
        assert_eq!(bodies[1]["data"], "example.com");
    }

    #[tokio::test]
    async fn test_setup_website_without_www() {
        let (mock, tools) = tools();
        mock.on(Method::POST, "/domains/example.com/records", 201, json!({"record": {"id": "r"}}));

        tools
            .call(
                "setup_website",
                json!({"domain": "example.com", "ip": "192.0.2.1", "www_enabled": false}),
            )
            .await
            .unwrap();
        assert_eq!(mock.count(Method::POST, "/domains/example.com/records"), 1);
    }

    #[tokio::test]
    async fn test_setup_email_creates_apex_mx() {
        let (mock, tools) = tools();
        mock.on(Method::POST, "/domains/example.com/records", 201, json!({"record": {"id": "r"}}));

        tools
            .call(
                "setup_email",
                json!({"domain": "example.com", "mail_server": "mail.example.com.", "ttl": 600}),
            )
            .await
            .unwrap();

        let body = mock.requests().pop().unwrap().body.unwrap();
        assert_eq!(body["type"], "MX");
        assert_eq!(body["name"], "@");
        assert_eq!(body["data"], "mail.example.com");
        assert_eq!(body["priority"], 10);
        assert_eq!(body["ttl"], 600);

        let err = tools
            .call("setup_email", json!({"domain": "example.com", "mail_server": "192.0.2.25"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert_eq!(mock.count(Method::POST, "/domains/example.com/records"), 1);
    }

    #[tokio::test]
    async fn test_validate_record_is_offline() {
        let (mock, tools) = tools();
        let report = tools
            .call(
                "validate_record",
                json!({"record_type": "MX", "name": "@", "data": "mail.example.com"}),
            )
            .await
            .unwrap();
        assert_eq!(report["validation"]["valid"], false);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_argument_is_invalid() {
        let (_, tools) = tools();
        let err = tools.call("get_domain", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_zone_file_resource_is_text() {
        let (mock, tools) = tools();
        mock.on(Method::GET, "/domains/example.com", 200, json!({"domain": {"domain": "example.com"}}));
        mock.on(
            Method::GET,
            "/domains/example.com/records",
            200,
            json!({"records": [{"type": "A", "name": "@", "data": "192.0.2.1", "ttl": 300}], "meta": {"links": {"next": ""}}}),
        );

        let mut params = HashMap::new();
        params.insert("domain".to_string(), "example.com".to_string());
        let zone = tools
            .read_resource("domains://{domain}/zone-file", &params)
            .await
            .unwrap();
        let text = zone.as_str().unwrap();
        assert!(text.contains("$ORIGIN example.com."));
        assert!(text.contains("192.0.2.1"));
    }
}
