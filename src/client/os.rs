use super::{ApiError, VultrClient};
use serde_json::Value;

impl VultrClient {
    pub async fn list_operating_systems(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/os", "os").await
    }
}
