//! Managed database tools
//!
//! Databases resolve by ID or label. Users and logical databases are
//! addressed by name.

use super::{parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{
    AccessControlRequest, DatabaseRequest, DatabaseUserRequest, ForkRequest, RestoreRequest,
    VultrClient,
};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

const DATABASE: IdentifierResolver = IdentifierResolver::new("Database", &["label"]);

const ENGINES: [&str; 4] = ["mysql", "pg", "valkey", "kafka"];

#[derive(Debug, Deserialize)]
struct DatabaseArgs {
    database_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    database_id: String,
    #[serde(flatten)]
    request: DatabaseRequest,
}

#[derive(Debug, Deserialize)]
struct UserArgs {
    database_id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct CreateUserArgs {
    database_id: String,
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    encryption: Option<String>,
    #[serde(default)]
    access_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateUserArgs {
    database_id: String,
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    access_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogicalDatabaseArgs {
    database_id: String,
    #[serde(alias = "name")]
    db_name: String,
}

#[derive(Debug, Deserialize)]
struct AccessControlArgs {
    database_id: String,
    username: String,
    #[serde(flatten)]
    rules: AccessControlRequest,
}

#[derive(Debug, Deserialize)]
struct RestoreArgs {
    database_id: String,
    #[serde(alias = "database_label")]
    label: String,
    #[serde(default = "basebackup")]
    restore_type: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    time: Option<String>,
}

fn basebackup() -> String {
    "basebackup".to_string()
}

impl RestoreArgs {
    fn into_request(self) -> Result<RestoreRequest, ToolError> {
        match self.restore_type.as_str() {
            "basebackup" => {}
            "pitr" if self.date.is_some() && self.time.is_some() => {}
            "pitr" => {
                return Err(ToolError::InvalidArguments(
                    "point-in-time restore needs date and time".to_string(),
                ))
            }
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "restore_type must be 'basebackup' or 'pitr', got '{}'",
                    other
                )))
            }
        }
        Ok(RestoreRequest {
            label: self.label,
            restore_type: self.restore_type,
            date: self.date,
            time: self.time,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ForkArgs {
    database_id: String,
    #[serde(flatten)]
    request: ForkRequest,
}

#[derive(Debug, Deserialize)]
struct UpgradeArgs {
    database_id: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct SetupArgs {
    region: String,
    plan: String,
    label: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default = "app_user")]
    app_user: String,
    #[serde(default)]
    app_password: Option<String>,
    #[serde(default = "app_database")]
    app_database: String,
}

fn app_user() -> String {
    "appuser".to_string()
}

fn app_database() -> String {
    "appdb".to_string()
}

/// Engine presets for the quick setup tools
#[derive(Debug, Clone, Copy)]
enum Engine {
    Mysql,
    Postgres,
}

impl Engine {
    fn request(self, args: &SetupArgs) -> DatabaseRequest {
        let base = DatabaseRequest {
            region: Some(args.region.clone()),
            plan: Some(args.plan.clone()),
            label: Some(args.label.clone()),
            ..Default::default()
        };
        match self {
            Engine::Mysql => DatabaseRequest {
                database_engine: Some("mysql".to_string()),
                database_engine_version: Some(args.version.clone().unwrap_or_else(|| "8".to_string())),
                mysql_require_primary_key: Some(true),
                mysql_slow_query_log: Some(true),
                ..base
            },
            Engine::Postgres => DatabaseRequest {
                database_engine: Some("pg".to_string()),
                database_engine_version: Some(args.version.clone().unwrap_or_else(|| "17".to_string())),
                ..base
            },
        }
    }

    fn encryption(self) -> Option<String> {
        match self {
            Engine::Mysql => Some("caching_sha2_password".to_string()),
            Engine::Postgres => None,
        }
    }
}

fn check_create(request: &DatabaseRequest) -> Result<(), ToolError> {
    for (field, value) in [
        ("database_engine", &request.database_engine),
        ("database_engine_version", &request.database_engine_version),
        ("region", &request.region),
        ("plan", &request.plan),
        ("label", &request.label),
    ] {
        if value.as_deref().map_or(true, str::is_empty) {
            return Err(ToolError::InvalidArguments(format!("{} is required", field)));
        }
    }
    match request.database_engine.as_deref() {
        Some(engine) if ENGINES.contains(&engine) => Ok(()),
        Some(engine) => Err(ToolError::InvalidArguments(format!(
            "database_engine must be one of {}, got '{}'",
            ENGINES.join(", "),
            engine
        ))),
        None => Ok(()),
    }
}

pub struct DatabaseTools {
    client: Arc<VultrClient>,
}

impl DatabaseTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(DATABASE
            .resolve(identifier, || self.client.list_managed_databases())
            .await?)
    }

    /// Create a database, an application user and a logical database
    async fn quick_setup(&self, engine: Engine, args: SetupArgs) -> Result<Value, ToolError> {
        let database = self.client.create_managed_database(&engine.request(&args)).await?;
        let database_id = database
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Invalid("created database has no id".to_string()))?
            .to_string();
        info!(database = %database_id, engine = ?engine, "Created managed database");

        let user_request = DatabaseUserRequest {
            username: Some(args.app_user.clone()),
            password: args.app_password.clone(),
            encryption: engine.encryption(),
            access_level: None,
        };
        let user = self
            .client
            .create_database_user(&database_id, &user_request)
            .await?;
        let logical_database = self
            .client
            .create_logical_database(&database_id, &args.app_database)
            .await?;

        Ok(json!({
            "connection_info": {
                "host": database.get("host").cloned().unwrap_or(Value::Null),
                "port": database.get("port").cloned().unwrap_or(Value::Null),
                "username": args.app_user,
                "database": args.app_database,
                "ssl_required": true,
            },
            "database": database,
            "user": user,
            "logical_database": logical_database,
        }))
    }
}

fn database_schema() -> Schema {
    Schema::new()
        .string("database_id", "Database ID or label")
        .required()
}

fn user_schema() -> Schema {
    database_schema().string("username", "Username").required()
}

fn logical_schema() -> Value {
    database_schema()
        .string("db_name", "Logical database name")
        .required()
        .build()
}

fn settings(schema: Schema) -> Schema {
    schema
        .string("region", "Region ID")
        .string("plan", "Database plan ID, see list_plans")
        .string("label", "Label")
        .string("tag", "Tag")
        .string("vpc_id", "VPC ID")
        .string_array("trusted_ips", "IPs or subnets allowed to connect")
        .string_array("mysql_sql_modes", "MySQL SQL modes")
        .boolean("mysql_require_primary_key", "Require primary keys (MySQL)")
        .boolean("mysql_slow_query_log", "Enable the slow query log (MySQL)")
        .string("valkey_eviction_policy", "Eviction policy (Valkey)")
}

fn setup_schema(default_version: &str) -> Value {
    Schema::new()
        .string("region", "Region ID")
        .required()
        .string("plan", "Database plan ID")
        .required()
        .string("label", "Label")
        .required()
        .string("version", "Engine version")
        .default_value(default_version)
        .string("app_user", "Application username")
        .default_value("appuser")
        .string("app_password", "Application password, generated when omitted")
        .string("app_database", "Application database name")
        .default_value("appdb")
        .build()
}

#[async_trait]
impl ToolModule for DatabaseTools {
    fn prefix(&self) -> &'static str {
        "managed_databases"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List managed databases", Schema::new().build()),
            Tool::new("get", "Get a managed database", database_schema().build()),
            Tool::new(
                "create",
                "Create a managed database",
                settings(
                    Schema::new()
                        .string("database_engine", "Engine")
                        .required()
                        .one_of(&ENGINES)
                        .string("database_engine_version", "Engine version, e.g. 8 for MySQL")
                        .required(),
                )
                .build(),
            ),
            Tool::new(
                "update",
                "Change database settings",
                settings(database_schema())
                    .string("timezone", "Database timezone")
                    .build(),
            ),
            Tool::new("delete", "Delete a managed database", database_schema().build()),
            Tool::new("get_usage", "Get disk, memory and CPU usage", database_schema().build()),
            Tool::new("list_users", "List database users", database_schema().build()),
            Tool::new(
                "create_user",
                "Create a database user",
                user_schema()
                    .string("password", "Password, generated when omitted")
                    .string("encryption", "Password encryption (MySQL)")
                    .one_of(&["caching_sha2_password", "mysql_native_password"])
                    .string("access_level", "Permission level (Kafka)")
                    .build(),
            ),
            Tool::new("get_user", "Get a database user", user_schema().build()),
            Tool::new(
                "update_user",
                "Change a user's password or access level",
                user_schema()
                    .string("password", "New password")
                    .string("access_level", "New permission level (Kafka)")
                    .build(),
            ),
            Tool::new("delete_user", "Delete a database user", user_schema().build()),
            Tool::new("list_databases", "List logical databases", database_schema().build()),
            Tool::new(
                "create_logical_database",
                "Create a logical database",
                database_schema()
                    .string("name", "Logical database name")
                    .required()
                    .build(),
            ),
            Tool::new("get_logical_database", "Get a logical database", logical_schema()),
            Tool::new("delete_logical_database", "Delete a logical database", logical_schema()),
            Tool::new(
                "update_user_access_control",
                "Set the ACL rules of a Valkey user",
                user_schema()
                    .string_array("acl_categories", "Command categories, e.g. +@all")
                    .string_array("acl_channels", "Pub/sub channel patterns")
                    .string_array("acl_commands", "Individual commands")
                    .string_array("acl_keys", "Key patterns")
                    .build(),
            ),
            Tool::new("list_backups", "Get backup information", database_schema().build()),
            Tool::new("list_plans", "List managed database plans", Schema::new().build()),
            Tool::new(
                "list_available_versions",
                "List engine versions the database can upgrade to",
                database_schema().build(),
            ),
            Tool::new(
                "restore_from_backup",
                "Restore a backup into a new database",
                database_schema()
                    .string("label", "Label of the restored database")
                    .required()
                    .string("restore_type", "Latest backup or a point in time")
                    .one_of(&["basebackup", "pitr"])
                    .default_value("basebackup")
                    .string("date", "Point-in-time date, YYYY-MM-DD")
                    .string("time", "Point-in-time time, HH:MM:SS")
                    .build(),
            ),
            Tool::new(
                "fork_database",
                "Copy a database into a new one",
                database_schema()
                    .string("label", "Label of the fork")
                    .required()
                    .string("region", "Region ID")
                    .required()
                    .string("plan", "Database plan ID")
                    .required()
                    .string("vpc_id", "VPC ID")
                    .build(),
            ),
            Tool::new(
                "start_version_upgrade",
                "Upgrade the database engine to a newer version",
                database_schema()
                    .string("version", "Target version, see list_available_versions")
                    .required()
                    .build(),
            ),
            Tool::new(
                "get_maintenance_updates",
                "List pending maintenance updates",
                database_schema().build(),
            ),
            Tool::new(
                "start_maintenance",
                "Apply pending maintenance updates now",
                database_schema().build(),
            ),
            Tool::new(
                "setup_mysql_database",
                "Create a MySQL database with an application user and database",
                setup_schema("8"),
            ),
            Tool::new(
                "setup_postgresql_database",
                "Create a PostgreSQL database with an application user and database",
                setup_schema("17"),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_managed_databases().await?))
            }
            "get" => {
                let args: DatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(self.client.get_managed_database(&id).await?)
            }
            "create" => {
                let request: DatabaseRequest = parse_args(args)?;
                check_create(&request)?;
                Ok(self.client.create_managed_database(&request).await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                let request = DatabaseRequest {
                    database_engine: None,
                    database_engine_version: None,
                    ..args.request
                };
                Ok(self.client.update_managed_database(&id, &request).await?)
            }
            "delete" => {
                let args: DatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                self.client.delete_managed_database(&id).await?;
                Ok(success(format!("Database {} deleted successfully", args.database_id)))
            }
            "get_usage" => {
                let args: DatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(self.client.get_database_usage(&id).await?)
            }
            "list_users" => {
                let args: DatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(json!(self.client.list_database_users(&id).await?))
            }
            "create_user" => {
                let args: CreateUserArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                let request = DatabaseUserRequest {
                    username: Some(args.username),
                    password: args.password,
                    encryption: args.encryption,
                    access_level: args.access_level,
                };
                Ok(self.client.create_database_user(&id, &request).await?)
            }
            "get_user" => {
                let args: UserArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(self.client.get_database_user(&id, &args.username).await?)
            }
            "update_user" => {
                let args: UpdateUserArgs = parse_args(args)?;
                if args.password.is_none() && args.access_level.is_none() {
                    return Err(ToolError::InvalidArguments(
                        "nothing to update: set password or access_level".to_string(),
                    ));
                }
                let id = self.resolve(&args.database_id).await?;
                let request = DatabaseUserRequest {
                    password: args.password,
                    access_level: args.access_level,
                    ..Default::default()
                };
                Ok(self
                    .client
                    .update_database_user(&id, &args.username, &request)
                    .await?)
            }
            "delete_user" => {
                let args: UserArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                self.client.delete_database_user(&id, &args.username).await?;
                Ok(success(format!("User {} deleted successfully", args.username)))
            }
            "list_databases" => {
                let args: DatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(json!(self.client.list_logical_databases(&id).await?))
            }
            "create_logical_database" => {
                let args: LogicalDatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(self.client.create_logical_database(&id, &args.db_name).await?)
            }
            "get_logical_database" => {
                let args: LogicalDatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(self.client.get_logical_database(&id, &args.db_name).await?)
            }
            "update_user_access_control" => {
                let args: AccessControlArgs = parse_args(args)?;
                if args.rules.is_empty() {
                    return Err(ToolError::InvalidArguments(
                        "nothing to update: set at least one acl_* list".to_string(),
                    ));
                }
                let id = self.resolve(&args.database_id).await?;
                self.client
                    .update_database_user_access_control(&id, &args.username, &args.rules)
                    .await?;
                Ok(success(format!("Access control updated for user {}", args.username)))
            }
            "delete_logical_database" => {
                let args: LogicalDatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                self.client.delete_logical_database(&id, &args.db_name).await?;
                Ok(success(format!(
                    "Logical database {} deleted successfully",
                    args.db_name
                )))
            }
            "list_backups" => {
                let args: DatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(self.client.list_database_backups(&id).await?)
            }
            "list_plans" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_database_plans().await?))
            }
            "list_available_versions" => {
                let args: DatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(json!(self.client.list_database_versions(&id).await?))
            }
            "restore_from_backup" => {
                let args: RestoreArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                let request = args.into_request()?;
                info!(
                    database = %id,
                    restore_type = %request.restore_type,
                    "Restoring database backup"
                );
                Ok(self.client.restore_managed_database(&id, &request).await?)
            }
            "fork_database" => {
                let args: ForkArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(self.client.fork_managed_database(&id, &args.request).await?)
            }
            "start_version_upgrade" => {
                let args: UpgradeArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                self.client.start_database_version_upgrade(&id, &args.version).await?;
                Ok(success(format!(
                    "Version upgrade to {} started for {}",
                    args.version, args.database_id
                )))
            }
            "get_maintenance_updates" => {
                let args: DatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                Ok(json!(self.client.list_database_maintenance_updates(&id).await?))
            }
            "start_maintenance" => {
                let args: DatabaseArgs = parse_args(args)?;
                let id = self.resolve(&args.database_id).await?;
                self.client.start_database_maintenance(&id).await?;
                Ok(success(format!("Maintenance started for {}", args.database_id)))
            }
            "setup_mysql_database" => self.quick_setup(Engine::Mysql, parse_args(args)?).await,
            "setup_postgresql_database" => {
                self.quick_setup(Engine::Postgres, parse_args(args)?).await
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("databases://list", "databases", "All managed databases"),
            ResourceDef::json("databases://plans", "database-plans", "Managed database plans"),
            ResourceDef::json(
                "databases://{database_id}",
                "database",
                "One managed database by ID or label",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "databases://list" => Ok(json!(self.client.list_managed_databases().await?)),
            "databases://plans" => Ok(json!(self.client.list_database_plans().await?)),
            "databases://{database_id}" => {
                let id = self.resolve(uri_param(params, "database_id")?).await?;
                Ok(self.client.get_managed_database(&id).await?)
            }
            _ => Err(ToolError::UnknownResource(template.to_string())),
        }
    }
}
