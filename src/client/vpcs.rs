//! VPC and VPC 2.0 networks

use super::{ApiError, UpdateInstanceRequest, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body for `POST /vpcs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVpcRequest {
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v4_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v4_subnet_mask: Option<u8>,
}

/// Body for `POST /vpc2`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVpc2Request {
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<u8>,
}

impl VultrClient {
    pub async fn list_vpcs(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/vpcs", "vpcs").await
    }

    pub async fn get_vpc(&self, vpc_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/vpcs/{}", vpc_id), "vpc").await
    }

    pub async fn create_vpc(&self, request: &CreateVpcRequest) -> Result<Value, ApiError> {
        let body = self.post("/vpcs", request).await?;
        Ok(super::unwrap_envelope(body, "vpc"))
    }

    pub async fn update_vpc(&self, vpc_id: &str, description: &str) -> Result<Value, ApiError> {
        self.put(
            &format!("/vpcs/{}", vpc_id),
            &json!({ "description": description }),
        )
        .await
    }

    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/vpcs/{}", vpc_id)).await
    }

    pub async fn list_vpc2s(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/vpc2", "vpcs").await
    }

    pub async fn get_vpc2(&self, vpc2_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/vpc2/{}", vpc2_id), "vpc").await
    }

    pub async fn create_vpc2(&self, request: &CreateVpc2Request) -> Result<Value, ApiError> {
        let body = self.post("/vpc2", request).await?;
        Ok(super::unwrap_envelope(body, "vpc"))
    }

    pub async fn update_vpc2(&self, vpc2_id: &str, description: &str) -> Result<Value, ApiError> {
        self.put(
            &format!("/vpc2/{}", vpc2_id),
            &json!({ "description": description }),
        )
        .await
    }

    pub async fn delete_vpc2(&self, vpc2_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/vpc2/{}", vpc2_id)).await
    }

    pub async fn attach_vpc_to_instance(
        &self,
        instance_id: &str,
        vpc_id: &str,
    ) -> Result<Value, ApiError> {
        let request = UpdateInstanceRequest {
            attach_vpc: Some(vec![vpc_id.to_string()]),
            ..Default::default()
        };
        self.update_instance(instance_id, &request).await
    }

    pub async fn detach_vpc_from_instance(
        &self,
        instance_id: &str,
        vpc_id: &str,
    ) -> Result<Value, ApiError> {
        let request = UpdateInstanceRequest {
            detach_vpc: Some(vec![vpc_id.to_string()]),
            ..Default::default()
        };
        self.update_instance(instance_id, &request).await
    }

    pub async fn attach_vpc2_to_instance(
        &self,
        instance_id: &str,
        vpc2_id: &str,
    ) -> Result<Value, ApiError> {
        self.post(
            &format!("/instances/{}/vpc2/attach", instance_id),
            &json!({ "vpc_id": vpc2_id }),
        )
        .await
    }

    pub async fn detach_vpc2_from_instance(
        &self,
        instance_id: &str,
        vpc2_id: &str,
    ) -> Result<Value, ApiError> {
        self.post(
            &format!("/instances/{}/vpc2/detach", instance_id),
            &json!({ "vpc_id": vpc2_id }),
        )
        .await
    }

    pub async fn list_instance_vpcs(&self, instance_id: &str) -> Result<Vec<Value>, ApiError> {
        self.list_all(&format!("/instances/{}/vpcs", instance_id), "vpcs")
            .await
    }

    pub async fn list_instance_vpc2s(&self, instance_id: &str) -> Result<Vec<Value>, ApiError> {
        self.list_all(&format!("/instances/{}/vpc2", instance_id), "vpcs")
            .await
    }
}
