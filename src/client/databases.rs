//! Managed databases
//!
//! Users and logical databases are addressed by name, not by UUID.

use super::{ApiError, VultrClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body for `POST /databases` and `PUT /databases/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseRequest {
    /// "mysql", "pg", "valkey" or "kafka"; create only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_engine_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_ips: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql_sql_modes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql_require_primary_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql_slow_query_log: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valkey_eviction_policy: Option<String>,
}

/// Body for creating or updating a database user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<String>,
}

/// Valkey ACL rules for `PUT /databases/{id}/users/{username}/access-control`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControlRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_channels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_commands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_keys: Option<Vec<String>>,
}

impl AccessControlRequest {
    pub fn is_empty(&self) -> bool {
        self.acl_categories.is_none()
            && self.acl_channels.is_none()
            && self.acl_commands.is_none()
            && self.acl_keys.is_none()
    }
}

/// Body for `POST /databases/{id}/restore`
///
/// `restore_type` is "basebackup" (latest backup) or "pitr", which also
/// needs `date` (YYYY-MM-DD) and `time` (HH:MM:SS).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreRequest {
    pub label: String,
    #[serde(rename = "type")]
    pub restore_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Body for `POST /databases/{id}/fork`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkRequest {
    pub label: String,
    pub region: String,
    pub plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

fn db_path(database_id: &str) -> String {
    format!("/databases/{}", database_id)
}

impl VultrClient {
    pub async fn list_managed_databases(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/databases", "databases").await
    }

    pub async fn get_managed_database(&self, database_id: &str) -> Result<Value, ApiError> {
        self.get_object(&db_path(database_id), "database").await
    }

    pub async fn create_managed_database(
        &self,
        request: &DatabaseRequest,
    ) -> Result<Value, ApiError> {
        let body = self.post("/databases", request).await?;
        Ok(super::unwrap_envelope(body, "database"))
    }

    pub async fn update_managed_database(
        &self,
        database_id: &str,
        request: &DatabaseRequest,
    ) -> Result<Value, ApiError> {
        let body = self.put(&db_path(database_id), request).await?;
        Ok(super::unwrap_envelope(body, "database"))
    }

    pub async fn delete_managed_database(&self, database_id: &str) -> Result<Value, ApiError> {
        self.delete(&db_path(database_id)).await
    }

    pub async fn get_database_usage(&self, database_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("{}/usage", db_path(database_id)), "usage")
            .await
    }

    pub async fn list_database_users(&self, database_id: &str) -> Result<Vec<Value>, ApiError> {
        self.list_all(&format!("{}/users", db_path(database_id)), "users")
            .await
    }

    pub async fn create_database_user(
        &self,
        database_id: &str,
        request: &DatabaseUserRequest,
    ) -> Result<Value, ApiError> {
        let body = self
            .post(&format!("{}/users", db_path(database_id)), request)
            .await?;
        Ok(super::unwrap_envelope(body, "user"))
    }

    pub async fn get_database_user(
        &self,
        database_id: &str,
        username: &str,
    ) -> Result<Value, ApiError> {
        self.get_object(
            &format!("{}/users/{}", db_path(database_id), username),
            "user",
        )
        .await
    }

    pub async fn update_database_user(
        &self,
        database_id: &str,
        username: &str,
        request: &DatabaseUserRequest,
    ) -> Result<Value, ApiError> {
        let body = self
            .put(
                &format!("{}/users/{}", db_path(database_id), username),
                request,
            )
            .await?;
        Ok(super::unwrap_envelope(body, "user"))
    }

    pub async fn delete_database_user(
        &self,
        database_id: &str,
        username: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&format!("{}/users/{}", db_path(database_id), username))
            .await
    }

    pub async fn list_logical_databases(&self, database_id: &str) -> Result<Vec<Value>, ApiError> {
        self.list_all(&format!("{}/dbs", db_path(database_id)), "dbs")
            .await
    }

    pub async fn create_logical_database(
        &self,
        database_id: &str,
        name: &str,
    ) -> Result<Value, ApiError> {
        let body = self
            .post(
                &format!("{}/dbs", db_path(database_id)),
                &json!({ "name": name }),
            )
            .await?;
        Ok(super::unwrap_envelope(body, "db"))
    }

    pub async fn delete_logical_database(
        &self,
        database_id: &str,
        name: &str,
    ) -> Result<Value, ApiError> {
        self.delete(&format!("{}/dbs/{}", db_path(database_id), name))
            .await
    }

    /// Backup schedule and latest/oldest backup info, returned as-is
    pub async fn list_database_backups(&self, database_id: &str) -> Result<Value, ApiError> {
        self.get(&format!("{}/backups", db_path(database_id))).await
    }

    pub async fn list_database_plans(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/databases/plans", "plans").await
    }

    pub async fn list_database_versions(&self, database_id: &str) -> Result<Vec<Value>, ApiError> {
        let body = self
            .get(&format!("{}/version-upgrade", db_path(database_id)))
            .await?;
        Ok(body
            .get("available_versions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn update_database_user_access_control(
        &self,
        database_id: &str,
        username: &str,
        request: &AccessControlRequest,
    ) -> Result<Value, ApiError> {
        let body = self
            .put(
                &format!("{}/users/{}/access-control", db_path(database_id), username),
                request,
            )
            .await?;
        Ok(super::unwrap_envelope(body, "user"))
    }

    pub async fn get_logical_database(
        &self,
        database_id: &str,
        name: &str,
    ) -> Result<Value, ApiError> {
        self.get_object(&format!("{}/dbs/{}", db_path(database_id), name), "db")
            .await
    }

    /// Restore a backup into a new database
    pub async fn restore_managed_database(
        &self,
        database_id: &str,
        request: &RestoreRequest,
    ) -> Result<Value, ApiError> {
        let body = self
            .post(&format!("{}/restore", db_path(database_id)), request)
            .await?;
        Ok(super::unwrap_envelope(body, "database"))
    }

    pub async fn fork_managed_database(
        &self,
        database_id: &str,
        request: &ForkRequest,
    ) -> Result<Value, ApiError> {
        let body = self
            .post(&format!("{}/fork", db_path(database_id)), request)
            .await?;
        Ok(super::unwrap_envelope(body, "database"))
    }

    pub async fn start_database_version_upgrade(
        &self,
        database_id: &str,
        version: &str,
    ) -> Result<Value, ApiError> {
        self.post(
            &format!("{}/version-upgrade", db_path(database_id)),
            &json!({ "version": version }),
        )
        .await
    }

    pub async fn list_database_maintenance_updates(
        &self,
        database_id: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let body = self
            .get(&format!("{}/maintenance", db_path(database_id)))
            .await?;
        Ok(body
            .get("available_updates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn start_database_maintenance(&self, database_id: &str) -> Result<Value, ApiError> {
        self.post_empty(&format!("{}/maintenance", db_path(database_id)))
            .await
    }
}
