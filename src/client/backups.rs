use super::{query, ApiError, VultrClient};
use serde_json::Value;

impl VultrClient {
    /// List backups, optionally only those of one instance
    pub async fn list_backups(&self, instance_id: Option<&str>) -> Result<Vec<Value>, ApiError> {
        let filter = match instance_id {
            Some(id) => query(&[("instance_id", id)]),
            None => Vec::new(),
        };
        self.list_all_with_query("/backups", "backups", filter).await
    }

    pub async fn get_backup(&self, backup_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/backups/{}", backup_id), "backup")
            .await
    }
}
