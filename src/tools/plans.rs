//! Plan tools

use super::{parse_args, NoArgs, ToolError};
use crate::client::VultrClient;
use crate::mcp::{Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const PLAN: IdentifierResolver = IdentifierResolver::new("Plan", &["id"])
    .case_insensitive()
    .scan_only();

#[derive(Debug, Default, Deserialize)]
struct ListArgs {
    #[serde(default)]
    plan_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanArgs {
    plan_id: String,
}

/// Minimum specs; unset bounds match everything
#[derive(Debug, Default, Deserialize)]
struct SpecFilter {
    #[serde(default)]
    min_vcpus: Option<u64>,
    #[serde(default)]
    min_ram_mb: Option<u64>,
    #[serde(default)]
    min_disk_gb: Option<u64>,
    #[serde(default)]
    max_monthly_cost: Option<f64>,
    #[serde(default)]
    plan_type: Option<String>,
}

impl SpecFilter {
    fn matches(&self, plan: &Value) -> bool {
        let number = |field: &str| plan.get(field).and_then(Value::as_u64).unwrap_or(0);

        self.min_vcpus.map_or(true, |min| number("vcpu_count") >= min)
            && self.min_ram_mb.map_or(true, |min| number("ram") >= min)
            && self.min_disk_gb.map_or(true, |min| number("disk") >= min)
            && self
                .max_monthly_cost
                .map_or(true, |max| monthly_cost(plan).is_some_and(|cost| cost <= max))
    }
}

#[derive(Debug, Deserialize)]
struct ExactSpecArgs {
    plan_type: String,
    vcpus: u64,
    ram_gb: u64,
}

impl ExactSpecArgs {
    fn matches(&self, plan: &Value) -> bool {
        plan.get("vcpu_count").and_then(Value::as_u64) == Some(self.vcpus)
            && plan.get("ram").and_then(Value::as_u64) == Some(self.ram_gb * 1024)
    }
}

/// Plan families with their own listing tool
const PLAN_FAMILIES: [(&str, &str, &str); 3] = [
    ("list_vc2_plans", "vc2", "List Cloud Compute (vc2) plans"),
    ("list_vhf_plans", "vhf", "List High Frequency (vhf) plans"),
    ("list_voc_plans", "voc", "List Optimized Cloud (voc) plans"),
];

#[derive(Debug, Deserialize)]
struct CompareArgs {
    plan_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RegionArgs {
    region: String,
}

fn monthly_cost(plan: &Value) -> Option<f64> {
    plan.get("monthly_cost").and_then(Value::as_f64)
}

pub struct PlanTools {
    client: Arc<VultrClient>,
}

impl PlanTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn get_plan(&self, plan_id: &str) -> Result<Value, ToolError> {
        let plans = self.client.list_plans(None).await?;
        PLAN.find(plan_id, &plans)
            .cloned()
            .ok_or_else(|| PLAN.not_found(plan_id).into())
    }

    async fn cheapest(&self, plan_type: Option<&str>) -> Result<Value, ToolError> {
        let plans = self.client.list_plans(plan_type).await?;
        plans
            .into_iter()
            .filter(|p| monthly_cost(p).is_some())
            .min_by(|a, b| {
                let (a, b) = (monthly_cost(a).unwrap_or(f64::MAX), monthly_cost(b).unwrap_or(f64::MAX));
                a.total_cmp(&b)
            })
            .ok_or_else(|| ToolError::Invalid("No plans available".to_string()))
    }

    /// Plans side by side; unknown IDs are reported inline
    async fn compare(&self, plan_ids: &[String]) -> Result<Value, ToolError> {
        let plans = self.client.list_plans(None).await?;
        let comparison: Vec<Value> = plan_ids
            .iter()
            .map(|id| match PLAN.find(id, &plans) {
                Some(plan) => plan.clone(),
                None => json!({"id": id, "error": "Plan not found"}),
            })
            .collect();
        Ok(json!(comparison))
    }
}

#[async_trait]
impl ToolModule for PlanTools {
    fn prefix(&self) -> &'static str {
        "plans"
    }

    fn tools(&self) -> Vec<Tool> {
        let families = PLAN_FAMILIES
            .iter()
            .map(|(name, _, description)| Tool::new(*name, *description, Schema::new().build()));

        families
            .chain([
            Tool::new(
                "list_plans",
                "List instance plans",
                Schema::new()
                    .string("plan_type", "Plan type")
                    .one_of(&["all", "vc2", "vhf", "vhp", "vdc", "voc", "vcg"])
                    .build(),
            ),
            Tool::new(
                "get_plan",
                "Get one plan",
                Schema::new()
                    .string("plan_id", "Plan ID, e.g. vc2-1c-1gb")
                    .required()
                    .build(),
            ),
            Tool::new(
                "search_plans_by_specs",
                "Find plans meeting minimum specs and a price ceiling",
                Schema::new()
                    .integer("min_vcpus", "Minimum vCPU count")
                    .integer("min_ram_mb", "Minimum RAM in MB")
                    .integer("min_disk_gb", "Minimum disk in GB")
                    .number("max_monthly_cost", "Maximum monthly cost in USD")
                    .string("plan_type", "Only plans of this type")
                    .build(),
            ),
            Tool::new(
                "get_cheapest_plan",
                "Get the cheapest plan, optionally of one type",
                Schema::new().string("plan_type", "Plan type").build(),
            ),
            Tool::new(
                "compare_plans",
                "Show several plans side by side",
                Schema::new()
                    .string_array("plan_ids", "Plan IDs to compare")
                    .required()
                    .build(),
            ),
            Tool::new(
                "get_plans_by_region_availability",
                "List the plans whose locations include a region",
                Schema::new().string("region", "Region ID").required().build(),
            ),
            Tool::new(
                "get_plan_by_type_and_spec",
                "Find plans of one type with an exact vCPU count and RAM size",
                Schema::new()
                    .string("plan_type", "Plan type, e.g. vc2")
                    .required()
                    .integer("vcpus", "Exact vCPU count")
                    .required()
                    .integer("ram_gb", "Exact RAM in GB")
                    .required()
                    .build(),
            ),
        ])
        .collect()
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list_plans" => {
                let args: ListArgs = parse_args(args)?;
                Ok(json!(self.client.list_plans(args.plan_type.as_deref()).await?))
            }
            "get_plan" => {
                let args: PlanArgs = parse_args(args)?;
                self.get_plan(&args.plan_id).await
            }
            "search_plans_by_specs" => {
                let filter: SpecFilter = parse_args(args)?;
                let plans: Vec<Value> = self
                    .client
                    .list_plans(filter.plan_type.as_deref())
                    .await?
                    .into_iter()
                    .filter(|plan| filter.matches(plan))
                    .collect();
                Ok(json!(plans))
            }
            "get_cheapest_plan" => {
                let args: ListArgs = parse_args(args)?;
                self.cheapest(args.plan_type.as_deref()).await
            }
            "compare_plans" => {
                let args: CompareArgs = parse_args(args)?;
                self.compare(&args.plan_ids).await
            }
            "get_plans_by_region_availability" => {
                let args: RegionArgs = parse_args(args)?;
                let plans: Vec<Value> = self
                    .client
                    .list_plans(None)
                    .await?
                    .into_iter()
                    .filter(|plan| {
                        plan.get("locations")
                            .and_then(Value::as_array)
                            .is_some_and(|l| l.iter().any(|r| r.as_str() == Some(args.region.as_str())))
                    })
                    .collect();
                Ok(json!(plans))
            }
            "get_plan_by_type_and_spec" => {
                let args: ExactSpecArgs = parse_args(args)?;
                let plans: Vec<Value> = self
                    .client
                    .list_plans(Some(&args.plan_type))
                    .await?
                    .into_iter()
                    .filter(|plan| args.matches(plan))
                    .collect();
                Ok(json!(plans))
            }
            _ => match PLAN_FAMILIES.iter().find(|(tool, _, _)| *tool == name) {
                Some((_, plan_type, _)) => {
                    let _: NoArgs = parse_args(args)?;
                    Ok(json!(self.client.list_plans(Some(*plan_type)).await?))
                }
                None => Err(ToolError::UnknownTool(name.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use reqwest::Method;

    fn tools() -> PlanTools {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/plans",
            200,
            json!({
                "plans": [
                    {"id": "vc2-1c-1gb", "vcpu_count": 1, "ram": 1024, "disk": 25, "monthly_cost": 5, "locations": ["ewr", "ams"]},
                    {"id": "vc2-2c-4gb", "vcpu_count": 2, "ram": 4096, "disk": 80, "monthly_cost": 20, "locations": ["ewr"]},
                    {"id": "vc2-4c-8gb", "vcpu_count": 4, "ram": 8192, "disk": 160, "monthly_cost": 40, "locations": []}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
        PlanTools::new(Arc::new(VultrClient::new(mock)))
    }

    fn ids(value: &Value) -> Vec<&str> {
        value
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["id"].as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_get_plan_scans_list() {
        let plan = tools().call("get_plan", json!({"plan_id": "VC2-2C-4GB"})).await.unwrap();
        assert_eq!(plan["ram"], 4096);

        let err = tools().call("get_plan", json!({"plan_id": "nope"})).await.unwrap_err();
        assert!(matches!(err, ToolError::Resolve(_)));
    }

    #[tokio::test]
    async fn test_search_by_specs() {
        let found = tools()
            .call("search_plans_by_specs", json!({"min_ram_mb": 2048, "max_monthly_cost": 30}))
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["vc2-2c-4gb"]);

        let all = tools().call("search_plans_by_specs", json!({})).await.unwrap();
        assert_eq!(ids(&all).len(), 3);
    }

    #[tokio::test]
    async fn test_cheapest_and_compare() {
        let cheapest = tools().call("get_cheapest_plan", json!({})).await.unwrap();
        assert_eq!(cheapest["id"], "vc2-1c-1gb");

        let comparison = tools()
            .call("compare_plans", json!({"plan_ids": ["vc2-4c-8gb", "missing"]}))
            .await
            .unwrap();
        assert_eq!(comparison[0]["vcpu_count"], 4);
        assert_eq!(comparison[1]["error"], "Plan not found");
    }

    #[tokio::test]
    async fn test_plans_by_region() {
        let plans = tools()
            .call("get_plans_by_region_availability", json!({"region": "ams"}))
            .await
            .unwrap();
        assert_eq!(ids(&plans), vec!["vc2-1c-1gb"]);
    }

    #[tokio::test]
    async fn test_family_listing_and_exact_spec() {
        let mock = Arc::new(MockTransport::new());
        mock.on_query(
            Method::GET,
            "/plans",
            &[("type", "vhf")],
            200,
            json!({
                "plans": [
                    {"id": "vhf-1c-1gb", "vcpu_count": 1, "ram": 1024},
                    {"id": "vhf-2c-2gb", "vcpu_count": 2, "ram": 2048},
                    {"id": "vhf-2c-4gb", "vcpu_count": 2, "ram": 4096}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
        let tools = PlanTools::new(Arc::new(VultrClient::new(mock.clone())));

        let vhf = tools.call("list_vhf_plans", json!({})).await.unwrap();
        assert_eq!(ids(&vhf).len(), 3);
        assert_eq!(mock.requests()[0].query_param("type"), Some("vhf"));

        let exact = tools
            .call(
                "get_plan_by_type_and_spec",
                json!({"plan_type": "vhf", "vcpus": 2, "ram_gb": 4}),
            )
            .await
            .unwrap();
        assert_eq!(ids(&exact), vec!["vhf-2c-4gb"]);

        let err = tools.call("list_vdc_plans", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }
}
