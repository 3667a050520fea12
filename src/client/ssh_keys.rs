//! SSH keys

use super::{ApiError, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body for creating or updating an SSH key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SshKeyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
}

impl VultrClient {
    pub async fn list_ssh_keys(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/ssh-keys", "ssh_keys").await
    }

    pub async fn get_ssh_key(&self, ssh_key_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/ssh-keys/{}", ssh_key_id), "ssh_key")
            .await
    }

    pub async fn create_ssh_key(&self, request: &SshKeyRequest) -> Result<Value, ApiError> {
        let body = self.post("/ssh-keys", request).await?;
        Ok(super::unwrap_envelope(body, "ssh_key"))
    }

    pub async fn update_ssh_key(
        &self,
        ssh_key_id: &str,
        request: &SshKeyRequest,
    ) -> Result<Value, ApiError> {
        self.patch(&format!("/ssh-keys/{}", ssh_key_id), request)
            .await
    }

    pub async fn delete_ssh_key(&self, ssh_key_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/ssh-keys/{}", ssh_key_id)).await
    }
}
