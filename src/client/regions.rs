use super::{query, ApiError, VultrClient};
use serde_json::Value;

impl VultrClient {
    pub async fn list_regions(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/regions", "regions").await
    }

    /// Plan IDs available in a region, optionally filtered by plan type
    pub async fn list_region_availability(
        &self,
        region_id: &str,
        plan_type: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let filter = match plan_type {
            Some(plan_type) => query(&[("type", plan_type)]),
            None => Vec::new(),
        };
        let body = self
            .get_with_query(&format!("/regions/{}/availability", region_id), filter)
            .await?;

        Ok(body
            .get("available_plans")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}
