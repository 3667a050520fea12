//! Vultr Kubernetes Engine tools
//!
//! Clusters, node pools and nodes all resolve by ID or label. Pools are
//! looked up inside their cluster and nodes inside their pool.

use super::{parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{CreateClusterRequest, NodePoolSpec, UpdateNodePoolRequest, VultrClient};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

const CLUSTER: IdentifierResolver = IdentifierResolver::new("Kubernetes cluster", &["label"]);
const NODE_POOL: IdentifierResolver = IdentifierResolver::new("Node pool", &["label"]);
const NODE: IdentifierResolver = IdentifierResolver::new("Node", &["label"]);

#[derive(Debug, Deserialize)]
struct ClusterArgs {
    cluster_identifier: String,
}

#[derive(Debug, Deserialize)]
struct UpdateClusterArgs {
    cluster_identifier: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct UpgradeArgs {
    cluster_identifier: String,
    upgrade_version: String,
}

#[derive(Debug, Deserialize)]
struct PoolArgs {
    cluster_identifier: String,
    nodepool_identifier: String,
}

#[derive(Debug, Deserialize)]
struct CreatePoolArgs {
    cluster_identifier: String,
    #[serde(flatten)]
    pool: NodePoolSpec,
}

#[derive(Debug, Deserialize)]
struct UpdatePoolArgs {
    cluster_identifier: String,
    nodepool_identifier: String,
    #[serde(flatten)]
    update: UpdateNodePoolRequest,
}

#[derive(Debug, Deserialize)]
struct NodeArgs {
    cluster_identifier: String,
    nodepool_identifier: String,
    node_identifier: String,
}

#[derive(Debug, Deserialize)]
struct WorkloadArgs {
    label: String,
    region: String,
    #[serde(default = "default_workload")]
    workload_type: Workload,
    #[serde(default = "default_environment")]
    environment: Environment,
    #[serde(default = "yes")]
    auto_scaling: bool,
}

fn default_workload() -> Workload {
    Workload::Web
}

fn default_environment() -> Environment {
    Environment::Production
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Workload {
    Web,
    Api,
    Data,
    Development,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Environment {
    Production,
    Staging,
    Development,
}

impl Workload {
    fn as_str(self) -> &'static str {
        match self {
            Workload::Web => "web",
            Workload::Api => "api",
            Workload::Data => "data",
            Workload::Development => "development",
        }
    }

    /// Node pool sized for this workload. Production gets the larger plan
    /// and three nodes.
    fn node_pool(self, environment: Environment, auto_scaling: bool) -> NodePoolSpec {
        let (label, prod_plan, plan, min, max) = match self {
            Workload::Web => ("web-workers", "vc2-2c-4gb", "vc2-1c-2gb", 2, 6),
            Workload::Api => ("api-workers", "vc2-4c-8gb", "vc2-2c-4gb", 2, 8),
            Workload::Data => ("data-workers", "vc2-8c-16gb", "vc2-4c-8gb", 3, 10),
            Workload::Development => {
                return NodePoolSpec {
                    node_quantity: 1,
                    plan: "vc2-1c-1gb".to_string(),
                    label: "dev-workers".to_string(),
                    tag: None,
                    auto_scaler: Some(false),
                    min_nodes: None,
                    max_nodes: None,
                    labels: None,
                }
            }
        };
        let production = environment == Environment::Production;

        NodePoolSpec {
            node_quantity: if production { 3 } else { 2 },
            plan: if production { prod_plan } else { plan }.to_string(),
            label: label.to_string(),
            tag: None,
            auto_scaler: Some(auto_scaling),
            min_nodes: auto_scaling.then_some(min),
            max_nodes: auto_scaling.then_some(max),
            labels: None,
        }
    }

    fn tips(self) -> &'static [&'static str] {
        match self {
            Workload::Web => &[
                "Set up horizontal pod autoscaling",
                "Use an ingress controller for load balancing",
                "Serve static assets through a CDN",
            ],
            Workload::Api => &[
                "Configure API rate limiting",
                "Consider a service mesh for service-to-service traffic",
                "Put authentication and authorization in front of every endpoint",
            ],
            Workload::Data => &[
                "Use persistent volumes for data",
                "Run databases as StatefulSets",
                "Back up persistent volumes on a schedule",
            ],
            Workload::Development => &[
                "Separate environments with namespaces",
                "Automate deployments with a CI/CD pipeline",
            ],
        }
    }
}

impl Environment {
    fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScaleArgs {
    cluster_identifier: String,
    nodepool_identifier: String,
    target_node_count: i64,
}

fn is_active(item: &Value) -> bool {
    item.get("status").and_then(Value::as_str) == Some("active")
}

fn node_count(pool: &Value) -> i64 {
    pool.get("node_quantity").and_then(Value::as_i64).unwrap_or(0)
}

/// Cluster health from its status and the status of every node
fn health_status(cluster: &Value, total_nodes: usize, healthy_nodes: usize) -> &'static str {
    if total_nodes == 0 {
        "no_nodes"
    } else if healthy_nodes < total_nodes {
        "degraded"
    } else if !is_active(cluster) {
        "unhealthy"
    } else {
        "healthy"
    }
}

/// Monthly cost estimate of a cluster's node pools from plan prices.
///
/// Pools whose plan is not in `plans` are listed without a cost and left out
/// of the total.
fn cost_analysis(cluster: &Value, pools: &[Value], plans: &[Value]) -> Value {
    let price = |plan_id: &str| {
        plans
            .iter()
            .find(|p| p.get("id").and_then(Value::as_str) == Some(plan_id))
            .and_then(|p| p.get("monthly_cost"))
            .and_then(Value::as_f64)
    };

    let mut total_nodes = 0;
    let mut total = 0.0;
    let mut unpriced = Vec::new();
    let breakdown: Vec<Value> = pools
        .iter()
        .map(|pool| {
            let nodes = node_count(pool);
            let plan = pool.get("plan").and_then(Value::as_str).unwrap_or("unknown");
            let per_node = price(plan);
            let pool_cost = per_node.map(|cost| cost * nodes as f64);
            total_nodes += nodes;
            match pool_cost {
                Some(cost) => total += cost,
                None => unpriced.push(plan.to_string()),
            }
            json!({
                "node_pool_label": pool.get("label").cloned().unwrap_or(Value::Null),
                "plan": plan,
                "node_count": nodes,
                "cost_per_node": per_node,
                "monthly_cost": pool_cost,
            })
        })
        .collect();

    json!({
        "cluster_label": cluster.get("label").cloned().unwrap_or(Value::Null),
        "total_nodes": total_nodes,
        "ha_control_plane": cluster.get("ha_controlplanes").and_then(Value::as_bool).unwrap_or(false),
        "cost_breakdown": {
            "node_pools": breakdown,
            "total_monthly_estimate": total,
            "unpriced_plans": unpriced,
        },
        "cost_optimization_tips": [
            "Use smaller plans for development clusters",
            "Enable the autoscaler so pools follow demand",
            "Scale down pools with unused capacity",
        ],
        "note": "Node costs come from current plan prices; control plane and bandwidth charges are not included.",
    })
}

pub struct KubernetesTools {
    client: Arc<VultrClient>,
}

impl KubernetesTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn cluster_id(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(CLUSTER
            .resolve(identifier, || self.client.list_kubernetes_clusters())
            .await?)
    }

    async fn pool_ids(&self, cluster: &str, pool: &str) -> Result<(String, String), ToolError> {
        let cluster_id = self.cluster_id(cluster).await?;
        let pool_id = NODE_POOL
            .resolve(pool, || self.client.list_kubernetes_node_pools(&cluster_id))
            .await?;
        Ok((cluster_id, pool_id))
    }

    async fn node_ids(&self, args: &NodeArgs) -> Result<(String, String, String), ToolError> {
        let (cluster_id, pool_id) = self
            .pool_ids(&args.cluster_identifier, &args.nodepool_identifier)
            .await?;
        let node_id = NODE
            .resolve(&args.node_identifier, || {
                self.client.list_kubernetes_nodes(&cluster_id, &pool_id)
            })
            .await?;
        Ok((cluster_id, pool_id, node_id))
    }

    async fn cluster_status(&self, identifier: &str) -> Result<Value, ToolError> {
        let cluster_id = self.cluster_id(identifier).await?;
        let cluster = self.client.get_kubernetes_cluster(&cluster_id).await?;
        let pools = self.client.list_kubernetes_node_pools(&cluster_id).await?;

        let resources = match self.client.get_kubernetes_cluster_resources(&cluster_id).await {
            Ok(resources) => resources,
            Err(e) => {
                warn!(cluster = %cluster_id, error = %e, "Cluster resources unavailable");
                json!({"error": "Resources unavailable"})
            }
        };

        let mut total_nodes = 0;
        let mut healthy_nodes = 0;
        let mut pool_status = Vec::with_capacity(pools.len());
        for pool in &pools {
            let nodes = pool
                .get("nodes")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let healthy = nodes.iter().filter(|n| is_active(n)).count();
            total_nodes += nodes.len();
            healthy_nodes += healthy;
            pool_status.push(json!({
                "pool": pool,
                "node_count": nodes.len(),
                "healthy_nodes": healthy,
                "nodes": nodes,
            }));
        }

        let field = |name: &str| cluster.get(name).cloned().unwrap_or(Value::Null);
        Ok(json!({
            "summary": {
                "cluster_id": cluster_id,
                "label": field("label"),
                "version": field("version"),
                "region": field("region"),
                "status": field("status"),
                "ip": field("ip"),
                "node_pool_count": pools.len(),
            },
            "health_status": health_status(&cluster, total_nodes, healthy_nodes),
            "total_nodes": total_nodes,
            "healthy_nodes": healthy_nodes,
            "node_pools": pool_status,
            "resources": resources,
            "cluster_info": cluster,
        }))
    }

    async fn analyze_costs(&self, identifier: &str) -> Result<Value, ToolError> {
        let cluster_id = self.cluster_id(identifier).await?;
        let cluster = self.client.get_kubernetes_cluster(&cluster_id).await?;
        let pools = self.client.list_kubernetes_node_pools(&cluster_id).await?;
        let plans = self.client.list_plans(None).await?;
        Ok(cost_analysis(&cluster, &pools, &plans))
    }

    async fn setup_for_workload(&self, args: WorkloadArgs) -> Result<Value, ToolError> {
        let version = self
            .client
            .get_kubernetes_versions()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::Invalid("No Kubernetes versions available".to_string()))?;
        let production = args.environment == Environment::Production;

        let request = CreateClusterRequest {
            label: args.label,
            region: args.region,
            version,
            node_pools: vec![args.workload_type.node_pool(args.environment, args.auto_scaling)],
            enable_firewall: production,
            ha_controlplanes: production,
        };
        let cluster = self.client.create_kubernetes_cluster(&request).await?;

        let security: &[&str] = if production {
            &[
                "Enable network policies for pod-to-pod traffic",
                "Use RBAC for access control",
                "Keep cluster and node versions up to date",
                "Scan container images for vulnerabilities",
            ]
        } else {
            &["Set up basic RBAC", "Use namespaces for isolation"]
        };

        Ok(json!({
            "cluster": cluster,
            "configuration": {
                "workload_type": args.workload_type.as_str(),
                "environment": args.environment.as_str(),
                "kubernetes_version": request.version,
                "node_pool": request.node_pools[0],
                "auto_scaling_enabled": args.auto_scaling && args.workload_type != Workload::Development,
                "ha_control_plane": production,
                "firewall_enabled": production,
            },
            "recommendations": {
                "next_steps": [
                    "Download the kubeconfig with get_cluster_config",
                    "Configure kubectl access",
                    "Install an ingress controller for external traffic",
                    "Set up monitoring and logging",
                ],
                "workload_specific_tips": args.workload_type.tips(),
                "security_recommendations": security,
            },
        }))
    }

    async fn scale_node_pool(&self, args: ScaleArgs) -> Result<Value, ToolError> {
        if args.target_node_count < 1 {
            return Err(ToolError::InvalidArguments(
                "target_node_count must be at least 1".to_string(),
            ));
        }
        let target = u32::try_from(args.target_node_count).map_err(|_| {
            ToolError::InvalidArguments("target_node_count is too large".to_string())
        })?;

        let (cluster_id, pool_id) = self
            .pool_ids(&args.cluster_identifier, &args.nodepool_identifier)
            .await?;
        let pool = self
            .client
            .get_kubernetes_node_pool(&cluster_id, &pool_id)
            .await?;
        let current = node_count(&pool);
        let label = pool
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(&pool_id)
            .to_string();

        if current == args.target_node_count {
            return Ok(json!({
                "status": "no_change",
                "message": format!("Node pool {} already has {} nodes", label, current),
                "current_nodes": current,
                "target_nodes": args.target_node_count,
            }));
        }

        let request = UpdateNodePoolRequest {
            node_quantity: Some(target),
            ..Default::default()
        };
        self.client
            .update_kubernetes_node_pool(&cluster_id, &pool_id, &request)
            .await?;

        let direction = if args.target_node_count > current { "up" } else { "down" };
        Ok(json!({
            "status": "scaling_initiated",
            "message": format!(
                "Scaling node pool {} {} from {} to {} nodes",
                label, direction, current, args.target_node_count
            ),
            "current_nodes": current,
            "target_nodes": args.target_node_count,
            "scaling_direction": direction,
        }))
    }
}

fn cluster_schema() -> Value {
    Schema::new()
        .string("cluster_identifier", "Cluster ID or label")
        .required()
        .build()
}

fn pool_schema() -> Schema {
    Schema::new()
        .string("cluster_identifier", "Cluster ID or label")
        .required()
        .string("nodepool_identifier", "Node pool ID or label")
        .required()
}

fn node_schema() -> Value {
    pool_schema()
        .string("node_identifier", "Node ID or label")
        .required()
        .build()
}

#[async_trait]
impl ToolModule for KubernetesTools {
    fn prefix(&self) -> &'static str {
        "kubernetes"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list_clusters", "List all Kubernetes clusters", Schema::new().build()),
            Tool::new("get_cluster", "Get a Kubernetes cluster", cluster_schema()),
            Tool::new(
                "create_cluster",
                "Create a Kubernetes cluster with one or more node pools",
                Schema::new()
                    .string("label", "Cluster label")
                    .required()
                    .string("region", "Region ID, e.g. ewr")
                    .required()
                    .string("version", "Kubernetes version, see get_versions")
                    .required()
                    .object_array(
                        "node_pools",
                        "Node pools: node_quantity, plan, label, and optionally tag, auto_scaler, min_nodes, max_nodes, labels",
                    )
                    .required()
                    .boolean("enable_firewall", "Create a managed firewall for the cluster")
                    .default_value(false)
                    .boolean("ha_controlplanes", "Run highly available control planes")
                    .default_value(false)
                    .build(),
            ),
            Tool::new(
                "update_cluster",
                "Change the label of a cluster",
                Schema::new()
                    .string("cluster_identifier", "Cluster ID or label")
                    .required()
                    .string("label", "New label")
                    .required()
                    .build(),
            ),
            Tool::new("delete_cluster", "Delete a cluster", cluster_schema()),
            Tool::new(
                "delete_cluster_with_resources",
                "Delete a cluster together with its load balancers and volumes",
                cluster_schema(),
            ),
            Tool::new("get_cluster_config", "Get the kubeconfig of a cluster", cluster_schema()),
            Tool::new(
                "get_cluster_resources",
                "List the block storage and load balancers a cluster uses",
                cluster_schema(),
            ),
            Tool::new(
                "get_available_upgrades",
                "List the Kubernetes versions a cluster can upgrade to",
                cluster_schema(),
            ),
            Tool::new(
                "upgrade_cluster",
                "Start a Kubernetes version upgrade",
                Schema::new()
                    .string("cluster_identifier", "Cluster ID or label")
                    .required()
                    .string("upgrade_version", "Target version")
                    .required()
                    .build(),
            ),
            Tool::new("list_node_pools", "List the node pools of a cluster", cluster_schema()),
            Tool::new("get_node_pool", "Get a node pool", pool_schema().build()),
            Tool::new(
                "create_node_pool",
                "Add a node pool to a cluster",
                Schema::new()
                    .string("cluster_identifier", "Cluster ID or label")
                    .required()
                    .integer("node_quantity", "Number of nodes")
                    .required()
                    .string("plan", "Plan ID for the nodes")
                    .required()
                    .string("label", "Node pool label")
                    .required()
                    .string("tag", "Tag")
                    .boolean("auto_scaler", "Enable autoscaling")
                    .integer("min_nodes", "Autoscaler minimum")
                    .integer("max_nodes", "Autoscaler maximum")
                    .object("labels", "Kubernetes node labels")
                    .build(),
            ),
            Tool::new(
                "update_node_pool",
                "Change a node pool's size, tag, autoscaler or labels",
                pool_schema()
                    .integer("node_quantity", "Number of nodes")
                    .string("tag", "Tag")
                    .boolean("auto_scaler", "Enable autoscaling")
                    .integer("min_nodes", "Autoscaler minimum")
                    .integer("max_nodes", "Autoscaler maximum")
                    .object("labels", "Kubernetes node labels")
                    .build(),
            ),
            Tool::new("delete_node_pool", "Delete a node pool", pool_schema().build()),
            Tool::new("list_nodes", "List the nodes of a node pool", pool_schema().build()),
            Tool::new("get_node", "Get a node", node_schema()),
            Tool::new("delete_node", "Delete a node", node_schema()),
            Tool::new("recycle_node", "Delete and replace a node", node_schema()),
            Tool::new("get_versions", "List supported Kubernetes versions", Schema::new().build()),
            Tool::new(
                "get_cluster_status",
                "Summarize cluster health from node status across all pools",
                cluster_schema(),
            ),
            Tool::new(
                "scale_node_pool",
                "Set the node count of a node pool",
                pool_schema()
                    .integer("target_node_count", "Desired number of nodes (at least 1)")
                    .required()
                    .build(),
            ),
            Tool::new(
                "analyze_cluster_costs",
                "Estimate the monthly node cost of a cluster from plan prices",
                cluster_schema(),
            ),
            Tool::new(
                "setup_cluster_for_workload",
                "Create a cluster sized for a workload type and environment on the newest Kubernetes version",
                Schema::new()
                    .string("label", "Cluster label")
                    .required()
                    .string("region", "Region ID, e.g. ewr")
                    .required()
                    .string("workload_type", "Workload the cluster runs")
                    .one_of(&["web", "api", "data", "development"])
                    .default_value("web")
                    .string("environment", "Environment; production enables HA control planes and a firewall")
                    .one_of(&["production", "staging", "development"])
                    .default_value("production")
                    .boolean("auto_scaling", "Enable the node pool autoscaler")
                    .default_value(true)
                    .build(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list_clusters" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_kubernetes_clusters().await?))
            }
            "get_cluster" => {
                let args: ClusterArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                Ok(self.client.get_kubernetes_cluster(&id).await?)
            }
            "create_cluster" => {
                let request: CreateClusterRequest = parse_args(args)?;
                if request.node_pools.is_empty() {
                    return Err(ToolError::InvalidArguments(
                        "at least one node pool is required".to_string(),
                    ));
                }
                Ok(self.client.create_kubernetes_cluster(&request).await?)
            }
            "update_cluster" => {
                let args: UpdateClusterArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                self.client.update_kubernetes_cluster(&id, &args.label).await?;
                Ok(success(format!("Cluster {} updated successfully", args.cluster_identifier)))
            }
            "delete_cluster" => {
                let args: ClusterArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                self.client.delete_kubernetes_cluster(&id).await?;
                Ok(success(format!("Cluster {} deleted successfully", args.cluster_identifier)))
            }
            "delete_cluster_with_resources" => {
                let args: ClusterArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                self.client.delete_kubernetes_cluster_with_resources(&id).await?;
                Ok(success(format!(
                    "Cluster {} and all related resources deleted successfully",
                    args.cluster_identifier
                )))
            }
            "get_cluster_config" => {
                let args: ClusterArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                Ok(self.client.get_kubernetes_cluster_config(&id).await?)
            }
            "get_cluster_resources" => {
                let args: ClusterArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                Ok(self.client.get_kubernetes_cluster_resources(&id).await?)
            }
            "get_available_upgrades" => {
                let args: ClusterArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                Ok(json!(self.client.get_kubernetes_available_upgrades(&id).await?))
            }
            "upgrade_cluster" => {
                let args: UpgradeArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                self.client
                    .upgrade_kubernetes_cluster(&id, &args.upgrade_version)
                    .await?;
                Ok(success(format!(
                    "Cluster {} upgrade to version {} initiated",
                    args.cluster_identifier, args.upgrade_version
                )))
            }
            "list_node_pools" => {
                let args: ClusterArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                Ok(json!(self.client.list_kubernetes_node_pools(&id).await?))
            }
            "get_node_pool" => {
                let args: PoolArgs = parse_args(args)?;
                let (cluster_id, pool_id) = self
                    .pool_ids(&args.cluster_identifier, &args.nodepool_identifier)
                    .await?;
                Ok(self.client.get_kubernetes_node_pool(&cluster_id, &pool_id).await?)
            }
            "create_node_pool" => {
                let args: CreatePoolArgs = parse_args(args)?;
                let id = self.cluster_id(&args.cluster_identifier).await?;
                Ok(self.client.create_kubernetes_node_pool(&id, &args.pool).await?)
            }
            "update_node_pool" => {
                let args: UpdatePoolArgs = parse_args(args)?;
                let (cluster_id, pool_id) = self
                    .pool_ids(&args.cluster_identifier, &args.nodepool_identifier)
                    .await?;
                Ok(self
                    .client
                    .update_kubernetes_node_pool(&cluster_id, &pool_id, &args.update)
                    .await?)
            }
            "delete_node_pool" => {
                let args: PoolArgs = parse_args(args)?;
                let (cluster_id, pool_id) = self
                    .pool_ids(&args.cluster_identifier, &args.nodepool_identifier)
                    .await?;
                self.client
                    .delete_kubernetes_node_pool(&cluster_id, &pool_id)
                    .await?;
                Ok(success(format!(
                    "Node pool {} deleted successfully",
                    args.nodepool_identifier
                )))
            }
            "list_nodes" => {
                let args: PoolArgs = parse_args(args)?;
                let (cluster_id, pool_id) = self
                    .pool_ids(&args.cluster_identifier, &args.nodepool_identifier)
                    .await?;
                Ok(json!(self.client.list_kubernetes_nodes(&cluster_id, &pool_id).await?))
            }
            "get_node" => {
                let args: NodeArgs = parse_args(args)?;
                let (cluster_id, pool_id, node_id) = self.node_ids(&args).await?;
                Ok(self
                    .client
                    .get_kubernetes_node(&cluster_id, &pool_id, &node_id)
                    .await?)
            }
            "delete_node" => {
                let args: NodeArgs = parse_args(args)?;
                let (cluster_id, pool_id, node_id) = self.node_ids(&args).await?;
                self.client
                    .delete_kubernetes_node(&cluster_id, &pool_id, &node_id)
                    .await?;
                Ok(success(format!("Node {} deleted successfully", args.node_identifier)))
            }
            "recycle_node" => {
                let args: NodeArgs = parse_args(args)?;
                let (cluster_id, pool_id, node_id) = self.node_ids(&args).await?;
                self.client
                    .recycle_kubernetes_node(&cluster_id, &pool_id, &node_id)
                    .await?;
                Ok(success(format!("Node {} recycled successfully", args.node_identifier)))
            }
            "get_versions" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.get_kubernetes_versions().await?))
            }
            "get_cluster_status" => {
                let args: ClusterArgs = parse_args(args)?;
                self.cluster_status(&args.cluster_identifier).await
            }
            "scale_node_pool" => self.scale_node_pool(parse_args(args)?).await,
            "analyze_cluster_costs" => {
                let args: ClusterArgs = parse_args(args)?;
                self.analyze_costs(&args.cluster_identifier).await
            }
            "setup_cluster_for_workload" => self.setup_for_workload(parse_args(args)?).await,
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("kubernetes://clusters", "clusters", "All Kubernetes clusters"),
            ResourceDef::json(
                "kubernetes://cluster/{cluster_id}",
                "cluster",
                "One Kubernetes cluster by ID or label",
            ),
            ResourceDef::json(
                "kubernetes://cluster/{cluster_id}/node-pools",
                "node-pools",
                "Node pools of a cluster",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "kubernetes://clusters" => Ok(json!(self.client.list_kubernetes_clusters().await?)),
            "kubernetes://cluster/{cluster_id}" => {
                let id = self.cluster_id(uri_param(params, "cluster_id")?).await?;
                Ok(self.client.get_kubernetes_cluster(&id).await?)
            }
            "kubernetes://cluster/{cluster_id}/node-pools" => {
                let id = self.cluster_id(uri_param(params, "cluster_id")?).await?;
                Ok(json!(self.client.list_kubernetes_node_pools(&id).await?))
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

    const CLUSTERS: &str = "/kubernetes/clusters";

    fn tools() -> (Arc<MockTransport>, KubernetesTools) {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            CLUSTERS,
            200,
            json!({"vke_clusters": [{"id": "c-1", "label": "prod"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on(
            Method::GET,
            "/kubernetes/clusters/c-1/node-pools",
            200,
            json!({
                "node_pools": [{
                    "id": "p-1",
                    "label": "workers",
                    "node_quantity": 2,
                    "nodes": [
                        {"id": "n-1", "label": "workers-a", "status": "active"},
                        {"id": "n-2", "label": "workers-b", "status": "pending"}
                    ]
                }],
                "meta": {"links": {"next": ""}}
            }),
        );
        let tools = KubernetesTools::new(Arc::new(VultrClient::new(mock.clone())));
        (mock, tools)
    }

    #[test]
    fn test_health_status() {
        let active = json!({"status": "active"});
        assert_eq!(health_status(&active, 0, 0), "no_nodes");
        assert_eq!(health_status(&active, 3, 3), "healthy");
        assert_eq!(health_status(&active, 3, 2), "degraded");
        assert_eq!(health_status(&json!({"status": "pending"}), 3, 3), "unhealthy");
        assert_eq!(health_status(&json!({"status": "pending"}), 3, 1), "degraded");
    }

    #[tokio::test]
    async fn test_cluster_status() {
        let (mock, tools) = tools();
        mock.on(
            Method::GET,
            "/kubernetes/clusters/c-1",
            200,
            json!({"vke_cluster": {"id": "c-1", "label": "prod", "status": "active", "version": "v1.30.0"}}),
        );

        let status = tools
            .call("get_cluster_status", json!({"cluster_identifier": "prod"}))
            .await
            .unwrap();
        assert_eq!(status["health_status"], "degraded");
        assert_eq!(status["total_nodes"], 2);
        assert_eq!(status["healthy_nodes"], 1);
        assert_eq!(status["summary"]["node_pool_count"], 1);
        assert_eq!(status["resources"]["error"], "Resources unavailable");
    }

    #[tokio::test]
    async fn test_scale_node_pool() {
        let (mock, tools) = tools();
        let pool_path = "/kubernetes/clusters/c-1/node-pools/p-1";
        mock.on(
            Method::GET,
            pool_path,
            200,
            json!({"node_pool": {"id": "p-1", "label": "workers", "node_quantity": 2}}),
        );
        mock.on(Method::PATCH, pool_path, 202, json!({"node_pool": {"id": "p-1"}}));

        let result = tools
            .call(
                "scale_node_pool",
                json!({"cluster_identifier": "prod", "nodepool_identifier": "workers", "target_node_count": 5}),
            )
            .await
            .unwrap();
        assert_eq!(result["status"], "scaling_initiated");
        assert_eq!(result["scaling_direction"], "up");
        assert_eq!(result["message"], "Scaling node pool workers up from 2 to 5 nodes");

        let patch = mock
            .requests()
            .into_iter()
            .find(|r| r.method == Method::PATCH)
            .unwrap();
        assert_eq!(patch.body.unwrap(), json!({"node_quantity": 5}));

        let unchanged = tools
            .call(
                "scale_node_pool",
                json!({"cluster_identifier": "prod", "nodepool_identifier": "workers", "target_node_count": 2}),
            )
            .await
            .unwrap();
        assert_eq!(unchanged["status"], "no_change");
    }

    #[tokio::test]
    async fn test_scale_rejects_zero() {
        let (mock, tools) = tools();
        let err = tools
            .call(
                "scale_node_pool",
                json!({"cluster_identifier": "prod", "nodepool_identifier": "workers", "target_node_count": 0}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_node_resolves_through_pool() {
        let (mock, tools) = tools();
        mock.on(
            Method::GET,
            "/kubernetes/clusters/c-1/node-pools/p-1",
            200,
            json!({"node_pool": {"id": "p-1", "nodes": [{"id": "n-2", "label": "workers-b"}]}}),
        );
        mock.on(
            Method::POST,
            "/kubernetes/clusters/c-1/node-pools/p-1/nodes/n-2/recycle",
            204,
            Value::Null,
        );

        let result = tools
            .call(
                "recycle_node",
                json!({"cluster_identifier": "prod", "nodepool_identifier": "workers", "node_identifier": "workers-b"}),
            )
            .await
            .unwrap();
        assert_eq!(result["status"], "success");
    }

    #[tokio::test]
    async fn test_cost_analysis_uses_plan_prices() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            CLUSTERS,
            200,
            json!({"vke_clusters": [{"id": "c-1", "label": "prod"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on(
            Method::GET,
            "/kubernetes/clusters/c-1",
            200,
            json!({"vke_cluster": {"id": "c-1", "label": "prod", "ha_controlplanes": true}}),
        );
        mock.on(
            Method::GET,
            "/kubernetes/clusters/c-1/node-pools",
            200,
            json!({
                "node_pools": [
                    {"id": "p-1", "label": "workers", "plan": "vc2-2c-4gb", "node_quantity": 3},
                    {"id": "p-2", "label": "gpu", "plan": "vcg-a100", "node_quantity": 1}
                ],
                "meta": {"links": {"next": ""}}
            }),
        );
        mock.on(
            Method::GET,
            "/plans",
            200,
            json!({"plans": [{"id": "vc2-2c-4gb", "monthly_cost": 20.0}], "meta": {"links": {"next": ""}}}),
        );

        let tools = KubernetesTools::new(Arc::new(VultrClient::new(mock.clone())));
        let report = tools
            .call("analyze_cluster_costs", json!({"cluster_identifier": "prod"}))
            .await
            .unwrap();
        assert_eq!(report["total_nodes"], 4);
        assert_eq!(report["ha_control_plane"], true);
        assert_eq!(report["cost_breakdown"]["total_monthly_estimate"], 60.0);
        assert_eq!(report["cost_breakdown"]["node_pools"][0]["monthly_cost"], 60.0);
        assert!(report["cost_breakdown"]["node_pools"][1]["monthly_cost"].is_null());
        assert_eq!(report["cost_breakdown"]["unpriced_plans"], json!(["vcg-a100"]));
    }

    #[tokio::test]
    async fn test_setup_cluster_for_workload() {
        let (mock, tools) = tools();
        mock.on(
            Method::GET,
            "/kubernetes/versions",
            200,
            json!({"versions": ["v1.31.2+1", "v1.30.6+1"]}),
        );
        mock.on(
            Method::POST,
            CLUSTERS,
            201,
            json!({"vke_cluster": {"id": "c-9", "label": "api"}}),
        );

        let result = tools
            .call(
                "setup_cluster_for_workload",
                json!({"label": "api", "region": "ewr", "workload_type": "api", "environment": "staging"}),
            )
            .await
            .unwrap();
        assert_eq!(result["cluster"]["id"], "c-9");
        assert_eq!(result["configuration"]["ha_control_plane"], false);

        let body = mock
            .requests()
            .into_iter()
            .find(|r| r.method == Method::POST)
            .and_then(|r| r.body)
            .unwrap();
        assert_eq!(body["version"], "v1.31.2+1");
        assert_eq!(body["enable_firewall"], false);
        assert_eq!(body["node_pools"][0]["plan"], "vc2-2c-4gb");
        assert_eq!(body["node_pools"][0]["node_quantity"], 2);
        assert_eq!(body["node_pools"][0]["max_nodes"], 8);
    }

    #[tokio::test]
    async fn test_setup_rejects_unknown_workload() {
        let (mock, tools) = tools();
        let err = tools
            .call(
                "setup_cluster_for_workload",
                json!({"label": "x", "region": "ewr", "workload_type": "batch"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(mock.requests().is_empty());
    }
}
