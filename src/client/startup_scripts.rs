//! Startup scripts
//!
//! Script bodies travel base64-encoded; these methods take and return them
//! encoded, callers do the conversion.

use super::{ApiError, VultrClient};
use serde::Serialize;
use serde_json::Value;

/// Body for creating or updating a startup script
#[derive(Debug, Clone, Default, Serialize)]
pub struct StartupScriptRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Base64-encoded script body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// "boot" or "pxe"
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub script_type: Option<String>,
}

impl VultrClient {
    pub async fn list_startup_scripts(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/startup-scripts", "startup_scripts").await
    }

    pub async fn get_startup_script(&self, script_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/startup-scripts/{}", script_id), "startup_script")
            .await
    }

    pub async fn create_startup_script(
        &self,
        request: &StartupScriptRequest,
    ) -> Result<Value, ApiError> {
        let body = self.post("/startup-scripts", request).await?;
        Ok(super::unwrap_envelope(body, "startup_script"))
    }

    pub async fn update_startup_script(
        &self,
        script_id: &str,
        request: &StartupScriptRequest,
    ) -> Result<Value, ApiError> {
        self.patch(&format!("/startup-scripts/{}", script_id), request)
            .await
    }

    pub async fn delete_startup_script(&self, script_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/startup-scripts/{}", script_id)).await
    }
}
