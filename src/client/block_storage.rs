//! Block storage volumes

use super::{ApiError, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body for `POST /blocks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockRequest {
    pub region: String,
    pub size_gb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// "high_perf" or "storage_opt"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
}

/// Body for `PATCH /blocks/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBlockRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl VultrClient {
    pub async fn list_blocks(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/blocks", "blocks").await
    }

    pub async fn get_block(&self, block_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/blocks/{}", block_id), "block")
            .await
    }

    pub async fn create_block(&self, request: &CreateBlockRequest) -> Result<Value, ApiError> {
        let body = self.post("/blocks", request).await?;
        Ok(super::unwrap_envelope(body, "block"))
    }

    pub async fn update_block(
        &self,
        block_id: &str,
        request: &UpdateBlockRequest,
    ) -> Result<Value, ApiError> {
        self.patch(&format!("/blocks/{}", block_id), request).await
    }

    pub async fn delete_block(&self, block_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/blocks/{}", block_id)).await
    }

    pub async fn attach_block(
        &self,
        block_id: &str,
        instance_id: &str,
        live: bool,
    ) -> Result<Value, ApiError> {
        self.post(
            &format!("/blocks/{}/attach", block_id),
            &json!({ "instance_id": instance_id, "live": live }),
        )
        .await
    }

    pub async fn detach_block(&self, block_id: &str, live: bool) -> Result<Value, ApiError> {
        self.post(
            &format!("/blocks/{}/detach", block_id),
            &json!({ "live": live }),
        )
        .await
    }
}
