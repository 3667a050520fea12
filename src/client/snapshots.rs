//! Snapshots

use super::{ApiError, VultrClient};
use serde::Serialize;
use serde_json::{json, Value};

/// Body for `POST /snapshots` and `POST /snapshots/create-from-url`
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateSnapshotRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VultrClient {
    pub async fn list_snapshots(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/snapshots", "snapshots").await
    }

    pub async fn get_snapshot(&self, snapshot_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/snapshots/{}", snapshot_id), "snapshot")
            .await
    }

    pub async fn create_snapshot(
        &self,
        instance_id: &str,
        description: Option<String>,
    ) -> Result<Value, ApiError> {
        let request = CreateSnapshotRequest {
            instance_id: Some(instance_id.to_string()),
            description,
            ..Default::default()
        };
        let body = self.post("/snapshots", &request).await?;
        Ok(super::unwrap_envelope(body, "snapshot"))
    }

    pub async fn create_snapshot_from_url(
        &self,
        url: &str,
        description: Option<String>,
    ) -> Result<Value, ApiError> {
        let request = CreateSnapshotRequest {
            url: Some(url.to_string()),
            description,
            ..Default::default()
        };
        let body = self.post("/snapshots/create-from-url", &request).await?;
        Ok(super::unwrap_envelope(body, "snapshot"))
    }

    pub async fn update_snapshot(
        &self,
        snapshot_id: &str,
        description: &str,
    ) -> Result<Value, ApiError> {
        self.put(
            &format!("/snapshots/{}", snapshot_id),
            &json!({ "description": description }),
        )
        .await
    }

    pub async fn delete_snapshot(&self, snapshot_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/snapshots/{}", snapshot_id)).await
    }
}
