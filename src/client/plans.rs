use super::{query, ApiError, VultrClient};
use serde_json::Value;

impl VultrClient {
    /// List plans, optionally of one type ("vc2", "vhf", "voc", ...)
    pub async fn list_plans(&self, plan_type: Option<&str>) -> Result<Vec<Value>, ApiError> {
        let filter = match plan_type {
            Some(plan_type) => query(&[("type", plan_type)]),
            None => Vec::new(),
        };
        self.list_all_with_query("/plans", "plans", filter).await
    }
}
