//! Reserved IP addresses

use super::{ApiError, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body for `POST /reserved-ips`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservedIpRequest {
    pub region: String,
    /// "v4" or "v6"
    pub ip_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Serialize)]
struct ConvertIpRequest<'a> {
    ip_address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
}

impl VultrClient {
    pub async fn list_reserved_ips(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/reserved-ips", "reserved_ips").await
    }

    pub async fn get_reserved_ip(&self, reserved_ip: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/reserved-ips/{}", reserved_ip), "reserved_ip")
            .await
    }

    pub async fn create_reserved_ip(
        &self,
        request: &CreateReservedIpRequest,
    ) -> Result<Value, ApiError> {
        let body = self.post("/reserved-ips", request).await?;
        Ok(super::unwrap_envelope(body, "reserved_ip"))
    }

    pub async fn update_reserved_ip(
        &self,
        reserved_ip: &str,
        label: &str,
    ) -> Result<Value, ApiError> {
        self.patch(
            &format!("/reserved-ips/{}", reserved_ip),
            &json!({ "label": label }),
        )
        .await
    }

    pub async fn delete_reserved_ip(&self, reserved_ip: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/reserved-ips/{}", reserved_ip)).await
    }

    pub async fn attach_reserved_ip(
        &self,
        reserved_ip: &str,
        instance_id: &str,
    ) -> Result<Value, ApiError> {
        self.post(
            &format!("/reserved-ips/{}/attach", reserved_ip),
            &json!({ "instance_id": instance_id }),
        )
        .await
    }

    pub async fn detach_reserved_ip(&self, reserved_ip: &str) -> Result<Value, ApiError> {
        self.post_empty(&format!("/reserved-ips/{}/detach", reserved_ip))
            .await
    }

    /// Turn an instance's current IP into a reserved IP
    pub async fn convert_instance_ip(
        &self,
        ip_address: &str,
        label: Option<&str>,
    ) -> Result<Value, ApiError> {
        let body = self
            .post(
                "/reserved-ips/convert",
                &ConvertIpRequest { ip_address, label },
            )
            .await?;
        Ok(super::unwrap_envelope(body, "reserved_ip"))
    }
}
