//! Compute instances

use super::{ApiError, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body for `POST /instances`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInstanceRequest {
    pub region: String,
    pub plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_ipv6: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_vpc: Option<Vec<String>>,
    #[serde(default, rename = "sshkey_id", alias = "ssh_key_ids", skip_serializing_if = "Option::is_none")]
    pub ssh_key_ids: Option<Vec<String>>,
    /// "enabled" or "disabled"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backups: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddos_protection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_ipv4: Option<String>,
}

/// Body for `PATCH /instances/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInstanceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_ipv6: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backups: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddos_protection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_vpc: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detach_vpc: Option<Vec<String>>,
}

impl VultrClient {
    pub async fn list_instances(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/instances", "instances").await
    }

    pub async fn get_instance(&self, instance_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/instances/{}", instance_id), "instance")
            .await
    }

    pub async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<Value, ApiError> {
        let body = self.post("/instances", request).await?;
        Ok(super::unwrap_envelope(body, "instance"))
    }

    pub async fn update_instance(
        &self,
        instance_id: &str,
        request: &UpdateInstanceRequest,
    ) -> Result<Value, ApiError> {
        self.patch(&format!("/instances/{}", instance_id), request)
            .await
    }

    pub async fn delete_instance(&self, instance_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/instances/{}", instance_id)).await
    }

    pub async fn start_instance(&self, instance_id: &str) -> Result<Value, ApiError> {
        self.post_empty(&format!("/instances/{}/start", instance_id))
            .await
    }

    pub async fn stop_instance(&self, instance_id: &str) -> Result<Value, ApiError> {
        self.post_empty(&format!("/instances/{}/halt", instance_id))
            .await
    }

    pub async fn reboot_instance(&self, instance_id: &str) -> Result<Value, ApiError> {
        self.post_empty(&format!("/instances/{}/reboot", instance_id))
            .await
    }

    pub async fn reinstall_instance(
        &self,
        instance_id: &str,
        hostname: Option<&str>,
    ) -> Result<Value, ApiError> {
        let body = match hostname {
            Some(hostname) => json!({ "hostname": hostname }),
            None => json!({}),
        };
        let body = self
            .post(&format!("/instances/{}/reinstall", instance_id), &body)
            .await?;
        Ok(super::unwrap_envelope(body, "instance"))
    }

    pub async fn get_instance_bandwidth(&self, instance_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/instances/{}/bandwidth", instance_id), "bandwidth")
            .await
    }

    pub async fn list_instance_ipv4(&self, instance_id: &str) -> Result<Vec<Value>, ApiError> {
        self.list_all(&format!("/instances/{}/ipv4", instance_id), "ipv4s")
            .await
    }

    pub async fn create_instance_ipv4(
        &self,
        instance_id: &str,
        reboot: bool,
    ) -> Result<Value, ApiError> {
        let body = self
            .post(
                &format!("/instances/{}/ipv4", instance_id),
                &json!({ "reboot": reboot }),
            )
            .await?;
        Ok(super::unwrap_envelope(body, "ipv4"))
    }

    pub async fn delete_instance_ipv4(
        &self,
        instance_id: &str,
        ipv4: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&format!("/instances/{}/ipv4/{}", instance_id, ipv4))
            .await
    }

    pub async fn list_instance_ipv6(&self, instance_id: &str) -> Result<Vec<Value>, ApiError> {
        self.list_all(&format!("/instances/{}/ipv6", instance_id), "ipv6s")
            .await
    }
}
