//! Object storage (S3-compatible)

use super::{ApiError, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body for `POST /object-storage`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateObjectStorageRequest {
    pub cluster_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_id: Option<u64>,
    pub label: String,
}

impl VultrClient {
    pub async fn list_object_storages(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/object-storage", "object_storages").await
    }

    pub async fn get_object_storage(&self, storage_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/object-storage/{}", storage_id), "object_storage")
            .await
    }

    pub async fn create_object_storage(
        &self,
        request: &CreateObjectStorageRequest,
    ) -> Result<Value, ApiError> {
        let body = self.post("/object-storage", request).await?;
        Ok(super::unwrap_envelope(body, "object_storage"))
    }

    pub async fn update_object_storage(
        &self,
        storage_id: &str,
        label: &str,
    ) -> Result<Value, ApiError> {
        self.put(
            &format!("/object-storage/{}", storage_id),
            &json!({ "label": label }),
        )
        .await
    }

    pub async fn delete_object_storage(&self, storage_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/object-storage/{}", storage_id)).await
    }

    /// Issue fresh S3 credentials; the old keys stop working
    pub async fn regenerate_object_storage_keys(
        &self,
        storage_id: &str,
    ) -> Result<Value, ApiError> {
        let body = self
            .post_empty(&format!("/object-storage/{}/regenerate-keys", storage_id))
            .await?;
        Ok(super::unwrap_envelope(body, "s3_credentials"))
    }

    pub async fn list_object_storage_clusters(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/object-storage/clusters", "clusters").await
    }

    pub async fn list_object_storage_cluster_tiers(
        &self,
        cluster_id: u64,
    ) -> Result<Vec<Value>, ApiError> {
        self.list_all(
            &format!("/object-storage/clusters/{}/tiers", cluster_id),
            "tiers",
        )
        .await
    }
}
