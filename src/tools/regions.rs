//! Region tools

use super::{parse_args, uri_param, NoArgs, ToolError};
use crate::client::VultrClient;
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    region_id: String,
    #[serde(default)]
    plan_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanArgs {
    plan_id: String,
}

#[derive(Debug, Deserialize)]
struct ContinentArgs {
    continent: String,
}

fn has_option(region: &Value, option: &str) -> bool {
    region
        .get("options")
        .and_then(Value::as_array)
        .is_some_and(|options| options.iter().any(|o| o.as_str() == Some(option)))
}

pub struct RegionTools {
    client: Arc<VultrClient>,
}

impl RegionTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn availability(
        &self,
        region_id: &str,
        plan_type: Option<&str>,
    ) -> Result<Value, ToolError> {
        let plans = self
            .client
            .list_region_availability(region_id, plan_type)
            .await?;
        Ok(json!({"available_plans": plans}))
    }

    /// Regions offering a plan; regions whose availability lookup fails are skipped
    async fn find_regions_with_plan(&self, plan_id: &str) -> Result<Vec<Value>, ToolError> {
        let mut found = Vec::new();
        for region in self.client.list_regions().await? {
            let Some(region_id) = region.get("id").and_then(Value::as_str) else {
                continue;
            };
            match self.client.list_region_availability(region_id, None).await {
                Ok(plans) if plans.iter().any(|p| p.as_str() == Some(plan_id)) => {
                    found.push(region)
                }
                Ok(_) => {}
                Err(e) => warn!(region = %region_id, error = %e, "Skipping region"),
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl ToolModule for RegionTools {
    fn prefix(&self) -> &'static str {
        "regions"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List all regions", Schema::new().build()),
            Tool::new(
                "get_availability",
                "List the plan IDs available in a region",
                Schema::new()
                    .string("region_id", "Region ID, e.g. ewr")
                    .required()
                    .string("plan_type", "Only plans of this type, e.g. vc2")
                    .build(),
            ),
            Tool::new(
                "find_regions_with_plan",
                "Find the regions where a plan can be deployed",
                Schema::new()
                    .string("plan_id", "Plan ID, e.g. vc2-1c-1gb")
                    .required()
                    .build(),
            ),
            Tool::new(
                "list_by_continent",
                "List the regions of a continent",
                Schema::new()
                    .string("continent", "Continent, e.g. Europe or North America")
                    .required()
                    .build(),
            ),
            Tool::new(
                "list_with_ddos_protection",
                "List the regions that offer DDoS protection",
                Schema::new().build(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_regions().await?))
            }
            "get_availability" => {
                let args: AvailabilityArgs = parse_args(args)?;
                self.availability(&args.region_id, args.plan_type.as_deref())
                    .await
            }
            "find_regions_with_plan" => {
                let args: PlanArgs = parse_args(args)?;
                Ok(json!(self.find_regions_with_plan(&args.plan_id).await?))
            }
            "list_by_continent" => {
                let args: ContinentArgs = parse_args(args)?;
                let regions: Vec<Value> = self
                    .client
                    .list_regions()
                    .await?
                    .into_iter()
                    .filter(|r| {
                        r.get("continent")
                            .and_then(Value::as_str)
                            .is_some_and(|c| c.eq_ignore_ascii_case(&args.continent))
                    })
                    .collect();
                Ok(json!(regions))
            }
            "list_with_ddos_protection" => {
                let _: NoArgs = parse_args(args)?;
                let regions: Vec<Value> = self
                    .client
                    .list_regions()
                    .await?
                    .into_iter()
                    .filter(|r| has_option(r, "ddos_protection"))
                    .collect();
                Ok(json!(regions))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("regions://list", "regions", "All regions"),
            ResourceDef::json(
                "regions://{region_id}/availability",
                "region-availability",
                "Plans available in a region",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "regions://list" => Ok(json!(self.client.list_regions().await?)),
            "regions://{region_id}/availability" => {
                self.availability(uri_param(params, "region_id")?, None).await
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

    fn tools_with_regions() -> (Arc<MockTransport>, RegionTools) {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/regions",
            200,
            json!({
                "regions": [
                    {"id": "ewr", "city": "New Jersey", "continent": "North America", "options": ["ddos_protection"]},
                    {"id": "ams", "city": "Amsterdam", "continent": "Europe", "options": []},
                    {"id": "fra", "city": "Frankfurt", "continent": "Europe", "options": ["ddos_protection"]}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
        let tools = RegionTools::new(Arc::new(VultrClient::new(mock.clone())));
        (mock, tools)
    }

    fn ids(value: &Value) -> Vec<&str> {
        value
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_list_by_continent_ignores_case() {
        let (_, tools) = tools_with_regions();
        let regions = tools
            .call("list_by_continent", json!({"continent": "europe"}))
            .await
            .unwrap();
        assert_eq!(ids(&regions), vec!["ams", "fra"]);
    }

    #[tokio::test]
    async fn test_list_with_ddos_protection() {
        let (_, tools) = tools_with_regions();
        let regions = tools.call("list_with_ddos_protection", json!({})).await.unwrap();
        assert_eq!(ids(&regions), vec!["ewr", "fra"]);
    }

    #[tokio::test]
    async fn test_find_regions_with_plan_skips_failures() {
        let (mock, tools) = tools_with_regions();
        mock.on(Method::GET, "/regions/ewr/availability", 200, json!({"available_plans": ["vc2-1c-1gb"]}));
        mock.on(Method::GET, "/regions/ams/availability", 500, json!({"error": "boom"}));
        mock.on(Method::GET, "/regions/fra/availability", 200, json!({"available_plans": ["vhf-1c-1gb"]}));

        let regions = tools
            .call("find_regions_with_plan", json!({"plan_id": "vc2-1c-1gb"}))
            .await
            .unwrap();
        assert_eq!(ids(&regions), vec!["ewr"]);
    }
}
