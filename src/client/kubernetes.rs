//! Vultr Kubernetes Engine (VKE)
//!
//! Nodes are not listed through their own collection: a node pool carries its
//! nodes inline, so [`VultrClient::list_kubernetes_nodes`] reads them from the pool.

use super::{ApiError, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A node pool as sent on cluster or pool creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePoolSpec {
    pub node_quantity: u32,
    pub plan: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaler: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_nodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Body for `POST /kubernetes/clusters`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClusterRequest {
    pub label: String,
    pub region: String,
    pub version: String,
    pub node_pools: Vec<NodePoolSpec>,
    #[serde(default)]
    pub enable_firewall: bool,
    #[serde(default)]
    pub ha_controlplanes: bool,
}

/// Body for `PATCH /kubernetes/clusters/{id}/node-pools/{pool}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNodePoolRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaler: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_nodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

fn cluster_path(cluster_id: &str) -> String {
    format!("/kubernetes/clusters/{}", cluster_id)
}

fn pool_path(cluster_id: &str, pool_id: &str) -> String {
    format!("/kubernetes/clusters/{}/node-pools/{}", cluster_id, pool_id)
}

fn string_list(body: &Value, key: &str) -> Vec<String> {
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

impl VultrClient {
    pub async fn list_kubernetes_clusters(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/kubernetes/clusters", "vke_clusters").await
    }

    pub async fn get_kubernetes_cluster(&self, cluster_id: &str) -> Result<Value, ApiError> {
        self.get_object(&cluster_path(cluster_id), "vke_cluster")
            .await
    }

    pub async fn create_kubernetes_cluster(
        &self,
        request: &CreateClusterRequest,
    ) -> Result<Value, ApiError> {
        let body = self.post("/kubernetes/clusters", request).await?;
        Ok(super::unwrap_envelope(body, "vke_cluster"))
    }

    pub async fn update_kubernetes_cluster(
        &self,
        cluster_id: &str,
        label: &str,
    ) -> Result<Value, ApiError> {
        self.put(&cluster_path(cluster_id), &json!({ "label": label }))
            .await
    }

    pub async fn delete_kubernetes_cluster(&self, cluster_id: &str) -> Result<Value, ApiError> {
        self.delete(&cluster_path(cluster_id)).await
    }

    /// Delete a cluster along with its block storage and load balancers
    pub async fn delete_kubernetes_cluster_with_resources(
        &self,
        cluster_id: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&format!(
            "{}/delete-with-linked-resources",
            cluster_path(cluster_id)
        ))
        .await
    }

    /// The base64-encoded kubeconfig, wrapped as `{"kube_config": ...}`
    pub async fn get_kubernetes_cluster_config(&self, cluster_id: &str) -> Result<Value, ApiError> {
        self.get(&format!("{}/config", cluster_path(cluster_id)))
            .await
    }

    pub async fn get_kubernetes_cluster_resources(
        &self,
        cluster_id: &str,
    ) -> Result<Value, ApiError> {
        self.get_object(
            &format!("{}/resources", cluster_path(cluster_id)),
            "resources",
        )
        .await
    }

    pub async fn get_kubernetes_available_upgrades(
        &self,
        cluster_id: &str,
    ) -> Result<Vec<String>, ApiError> {
        let body = self
            .get(&format!("{}/available-upgrades", cluster_path(cluster_id)))
            .await?;
        Ok(string_list(&body, "available_upgrades"))
    }

    pub async fn upgrade_kubernetes_cluster(
        &self,
        cluster_id: &str,
        upgrade_version: &str,
    ) -> Result<Value, ApiError> {
        self.post(
            &format!("{}/upgrades", cluster_path(cluster_id)),
            &json!({ "upgrade_version": upgrade_version }),
        )
        .await
    }

    pub async fn list_kubernetes_node_pools(
        &self,
        cluster_id: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.list_all(
            &format!("{}/node-pools", cluster_path(cluster_id)),
            "node_pools",
        )
        .await
    }

    pub async fn get_kubernetes_node_pool(
        &self,
        cluster_id: &str,
        pool_id: &str,
    ) -> Result<Value, ApiError> {
        self.get_object(&pool_path(cluster_id, pool_id), "node_pool")
            .await
    }

    pub async fn create_kubernetes_node_pool(
        &self,
        cluster_id: &str,
        pool: &NodePoolSpec,
    ) -> Result<Value, ApiError> {
        let body = self
            .post(&format!("{}/node-pools", cluster_path(cluster_id)), pool)
            .await?;
        Ok(super::unwrap_envelope(body, "node_pool"))
    }

    pub async fn update_kubernetes_node_pool(
        &self,
        cluster_id: &str,
        pool_id: &str,
        request: &UpdateNodePoolRequest,
    ) -> Result<Value, ApiError> {
        let body = self.patch(&pool_path(cluster_id, pool_id), request).await?;
        Ok(super::unwrap_envelope(body, "node_pool"))
    }

    pub async fn delete_kubernetes_node_pool(
        &self,
        cluster_id: &str,
        pool_id: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&pool_path(cluster_id, pool_id)).await
    }

    pub async fn list_kubernetes_nodes(
        &self,
        cluster_id: &str,
        pool_id: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let pool = self.get_kubernetes_node_pool(cluster_id, pool_id).await?;
        Ok(pool
            .get("nodes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn get_kubernetes_node(
        &self,
        cluster_id: &str,
        pool_id: &str,
        node_id: &str,
    ) -> Result<Value, ApiError> {
        self.get_object(
            &format!("{}/nodes/{}", pool_path(cluster_id, pool_id), node_id),
            "node",
        )
        .await
    }

    pub async fn delete_kubernetes_node(
        &self,
        cluster_id: &str,
        pool_id: &str,
        node_id: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&format!("{}/nodes/{}", pool_path(cluster_id, pool_id), node_id))
            .await
    }

    pub async fn recycle_kubernetes_node(
        &self,
        cluster_id: &str,
        pool_id: &str,
        node_id: &str,
    ) -> Result<Value, ApiError> {
        self.post_empty(&format!(
            "{}/nodes/{}/recycle",
            pool_path(cluster_id, pool_id),
            node_id
        ))
        .await
    }

    pub async fn get_kubernetes_versions(&self) -> Result<Vec<String>, ApiError> {
        let body = self.get("/kubernetes/versions").await?;
        Ok(string_list(&body, "versions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use reqwest::Method;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_nodes_come_from_pool() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/kubernetes/clusters/c1/node-pools/p1",
            200,
            json!({"node_pool": {"id": "p1", "nodes": [{"id": "n1"}, {"id": "n2"}]}}),
        );
        let client = VultrClient::new(mock.clone());

        let nodes = client.list_kubernetes_nodes("c1", "p1").await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1]["id"], "n2");
    }

    #[tokio::test]
    async fn test_versions_are_strings() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::GET,
            "/kubernetes/versions",
            200,
            json!({"versions": ["v1.31.0+1", "v1.30.4+1"]}),
        );
        let client = VultrClient::new(mock);

        let versions = client.get_kubernetes_versions().await.unwrap();
        assert_eq!(versions, vec!["v1.31.0+1", "v1.30.4+1"]);
    }

    #[test]
    fn test_create_request_omits_unset_pool_fields() {
        let pool = NodePoolSpec {
            node_quantity: 3,
            plan: "vc2-2c-4gb".into(),
            label: "workers".into(),
            tag: None,
            auto_scaler: None,
            min_nodes: None,
            max_nodes: None,
            labels: None,
        };
        let value = serde_json::to_value(&pool).unwrap();
        assert_eq!(
            value,
            json!({"node_quantity": 3, "plan": "vc2-2c-4gb", "label": "workers"})
        );
    }
}
