use super::{ApiError, VultrClient};
use serde_json::{json, Value};

impl VultrClient {
    pub async fn list_isos(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/iso", "isos").await
    }

    pub async fn get_iso(&self, iso_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/iso/{}", iso_id), "iso").await
    }

    /// Start downloading an ISO from a URL
    pub async fn create_iso(&self, url: &str) -> Result<Value, ApiError> {
        let body = self.post("/iso", &json!({ "url": url })).await?;
        Ok(super::unwrap_envelope(body, "iso"))
    }

    pub async fn delete_iso(&self, iso_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/iso/{}", iso_id)).await
    }

    pub async fn list_public_isos(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/iso-public", "public_isos").await
    }
}
