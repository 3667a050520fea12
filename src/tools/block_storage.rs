//! Block storage tools

use super::instances::resolve_instance;
use super::{filter_field, is_attached, parse_args, success, uri_param, NoArgs, ToolError};
use crate::client::{CreateBlockRequest, UpdateBlockRequest, VultrClient};
use crate::mcp::{ResourceDef, Schema, Tool, ToolModule};
use crate::router::IdentifierResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const VOLUME: IdentifierResolver = IdentifierResolver::new("Block storage volume", &["label"]);

const MIN_SIZE_GB: u32 = 10;
const MAX_SIZE_GB: u32 = 40_000;

/// Device name of the first attached volume on Vultr Linux images
const DEVICE: &str = "/dev/vdb";

#[derive(Debug, Deserialize)]
struct VolumeArgs {
    volume_identifier: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    volume_identifier: String,
    #[serde(flatten)]
    update: UpdateBlockRequest,
}

#[derive(Debug, Deserialize)]
struct AttachArgs {
    volume_identifier: String,
    instance_identifier: String,
    #[serde(default = "live")]
    live: bool,
}

#[derive(Debug, Deserialize)]
struct DetachArgs {
    volume_identifier: String,
    #[serde(default = "live")]
    live: bool,
}

fn live() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RegionArgs {
    region: String,
}

fn check_size(size_gb: u32) -> Result<(), ToolError> {
    if (MIN_SIZE_GB..=MAX_SIZE_GB).contains(&size_gb) {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments(format!(
            "size_gb must be between {} and {}",
            MIN_SIZE_GB, MAX_SIZE_GB
        )))
    }
}

/// Volume details plus attachment, size and cost summaries
fn volume_status(mut volume: Value) -> Value {
    let attached = is_attached(&volume, "attached_to_instance");
    let size_gb = volume.get("size_gb").and_then(Value::as_u64).unwrap_or(0);
    let monthly = volume
        .get("cost")
        .or_else(|| volume.get("cost_per_month"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    if let Some(fields) = volume.as_object_mut() {
        fields.insert("is_attached".to_string(), json!(attached));
        fields.insert(
            "attachment_status".to_string(),
            json!(if attached { "attached" } else { "detached" }),
        );
        fields.insert(
            "size_info".to_string(),
            json!({"current_gb": size_gb, "can_expand": true, "max_size_gb": MAX_SIZE_GB}),
        );
        fields.insert(
            "cost_info".to_string(),
            json!({"monthly_cost": monthly, "yearly_cost": monthly * 12.0}),
        );
    }
    volume
}

/// Shell steps to format and mount a volume as ext4
fn mounting_instructions(volume_id: &str, volume: &Value) -> Value {
    let label = volume
        .get("label")
        .and_then(Value::as_str)
        .filter(|l| !l.is_empty());
    let mount_point = format!("/mnt/{}", label.unwrap_or("block-storage"));
    let device_short = DEVICE.trim_start_matches("/dev/");
    let fstab = format!("{} {} ext4 defaults 0 0", DEVICE, mount_point);
    let attached = is_attached(volume, "attached_to_instance");

    let full_script = [
        format!("# Mount {} at {}", label.unwrap_or("block-storage"), mount_point),
        format!("sudo lsblk | grep {}", device_short),
        format!("sudo mkfs.ext4 {}", DEVICE),
        format!("sudo mkdir -p {}", mount_point),
        format!("sudo mount {} {}", DEVICE, mount_point),
        format!("sudo df -h {}", mount_point),
        format!("echo '{}' | sudo tee -a /etc/fstab", fstab),
    ]
    .join("\n");

    let mut instructions = json!({
        "volume_info": {
            "id": volume_id,
            "label": label.unwrap_or("unlabeled"),
            "size_gb": volume.get("size_gb").cloned().unwrap_or(json!(0)),
            "attached": attached,
        },
        "prerequisites": [
            "Volume must be attached to an instance",
            "Run commands as root or with sudo",
            "Backup any existing data before formatting",
        ],
        "commands": {
            "check_device": format!("lsblk | grep {}", device_short),
            "format_ext4": format!("mkfs.ext4 {}", DEVICE),
            "create_mount_point": format!("mkdir -p {}", mount_point),
            "mount_volume": format!("mount {} {}", DEVICE, mount_point),
            "verify_mount": format!("df -h {}", mount_point),
            "auto_mount": format!("echo '{}' >> /etc/fstab", fstab),
        },
        "full_script": full_script,
    });

    if !attached {
        instructions["warning"] =
            json!("Volume is not attached to any instance. Attach it first before mounting.");
    }
    instructions
}

pub struct BlockStorageTools {
    client: Arc<VultrClient>,
}

impl BlockStorageTools {
    pub fn new(client: Arc<VultrClient>) -> Self {
        Self { client }
    }

    async fn resolve(&self, identifier: &str) -> Result<String, ToolError> {
        Ok(VOLUME
            .resolve(identifier, || self.client.list_blocks())
            .await?)
    }

    async fn get(&self, identifier: &str) -> Result<(String, Value), ToolError> {
        let id = self.resolve(identifier).await?;
        let volume = self.client.get_block(&id).await?;
        Ok((id, volume))
    }
}

fn volume_schema() -> Value {
    Schema::new()
        .string("volume_identifier", "Volume ID or label")
        .required()
        .build()
}

#[async_trait]
impl ToolModule for BlockStorageTools {
    fn prefix(&self) -> &'static str {
        "block_storage"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list", "List all block storage volumes", Schema::new().build()),
            Tool::new("get", "Get a block storage volume", volume_schema()),
            Tool::new(
                "create",
                "Create a block storage volume",
                Schema::new()
                    .string("region", "Region ID, e.g. ewr")
                    .required()
                    .integer("size_gb", "Size in GB (10 to 40000)")
                    .required()
                    .string("label", "Label")
                    .string("block_type", "Storage type")
                    .one_of(&["high_perf", "storage_opt"])
                    .build(),
            ),
            Tool::new(
                "update",
                "Resize or relabel a volume; volumes can only grow",
                Schema::new()
                    .string("volume_identifier", "Volume ID or label")
                    .required()
                    .integer("size_gb", "New size in GB")
                    .string("label", "New label")
                    .build(),
            ),
            Tool::new("delete", "Delete a block storage volume", volume_schema()),
            Tool::new(
                "attach",
                "Attach a volume to an instance",
                Schema::new()
                    .string("volume_identifier", "Volume ID or label")
                    .required()
                    .string("instance_identifier", "Instance ID, label or hostname")
                    .required()
                    .boolean("live", "Attach without restarting the instance")
                    .default_value(true)
                    .build(),
            ),
            Tool::new(
                "detach",
                "Detach a volume from its instance",
                Schema::new()
                    .string("volume_identifier", "Volume ID or label")
                    .required()
                    .boolean("live", "Detach without restarting the instance")
                    .default_value(true)
                    .build(),
            ),
            Tool::new(
                "list_by_region",
                "List the volumes of a region",
                Schema::new().string("region", "Region ID").required().build(),
            ),
            Tool::new("list_unattached", "List volumes not attached to any instance", Schema::new().build()),
            Tool::new("list_attached", "List volumes attached to an instance", Schema::new().build()),
            Tool::new(
                "get_volume_status",
                "Get a volume with attachment, size and cost summaries",
                volume_schema(),
            ),
            Tool::new(
                "get_mounting_instructions",
                "Get Linux commands to format and mount a volume",
                volume_schema(),
            ),
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "list" => {
                let _: NoArgs = parse_args(args)?;
                Ok(json!(self.client.list_blocks().await?))
            }
            "get" => {
                let args: VolumeArgs = parse_args(args)?;
                Ok(self.get(&args.volume_identifier).await?.1)
            }
            "create" => {
                let request: CreateBlockRequest = parse_args(args)?;
                check_size(request.size_gb)?;
                Ok(self.client.create_block(&request).await?)
            }
            "update" => {
                let args: UpdateArgs = parse_args(args)?;
                if let Some(size_gb) = args.update.size_gb {
                    check_size(size_gb)?;
                }
                let id = self.resolve(&args.volume_identifier).await?;
                self.client.update_block(&id, &args.update).await?;
                Ok(success(format!("Volume {} updated successfully", id)))
            }
            "delete" => {
                let args: VolumeArgs = parse_args(args)?;
                let id = self.resolve(&args.volume_identifier).await?;
                self.client.delete_block(&id).await?;
                Ok(success(format!("Volume {} deleted successfully", id)))
            }
            "attach" => {
                let args: AttachArgs = parse_args(args)?;
                let id = self.resolve(&args.volume_identifier).await?;
                let instance_id = resolve_instance(&self.client, &args.instance_identifier).await?;
                self.client.attach_block(&id, &instance_id, args.live).await?;
                Ok(success(format!(
                    "Volume {} attached to instance {}",
                    id, instance_id
                )))
            }
            "detach" => {
                let args: DetachArgs = parse_args(args)?;
                let id = self.resolve(&args.volume_identifier).await?;
                self.client.detach_block(&id, args.live).await?;
                Ok(success(format!("Volume {} detached", id)))
            }
            "list_by_region" => {
                let args: RegionArgs = parse_args(args)?;
                let volumes = self.client.list_blocks().await?;
                Ok(json!(filter_field(volumes, "region", &args.region)))
            }
            "list_unattached" | "list_attached" => {
                let _: NoArgs = parse_args(args)?;
                let want_attached = name == "list_attached";
                let volumes: Vec<Value> = self
                    .client
                    .list_blocks()
                    .await?
                    .into_iter()
                    .filter(|v| is_attached(v, "attached_to_instance") == want_attached)
                    .collect();
                Ok(json!(volumes))
            }
            "get_volume_status" => {
                let args: VolumeArgs = parse_args(args)?;
                let (_, volume) = self.get(&args.volume_identifier).await?;
                Ok(volume_status(volume))
            }
            "get_mounting_instructions" => {
                let args: VolumeArgs = parse_args(args)?;
                let (id, volume) = self.get(&args.volume_identifier).await?;
                Ok(mounting_instructions(&id, &volume))
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![
            ResourceDef::json("block-storage://list", "block-storage", "All block storage volumes"),
            ResourceDef::json(
                "block-storage://{volume_identifier}",
                "volume",
                "One volume by ID or label",
            ),
        ]
    }

    async fn read_resource(
        &self,
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, ToolError> {
        match template {
            "block-storage://list" => Ok(json!(self.client.list_blocks().await?)),
            "block-storage://{volume_identifier}" => {
                Ok(self.get(uri_param(params, "volume_identifier")?).await?.1)
            }
            _ => Err(ToolError::UnknownResource(template.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use reqwest::Method;

    #[test]
    fn test_volume_status() {
        let status = volume_status(json!({
            "id": "v-1",
            "size_gb": 50,
            "cost": 5.0,
            "attached_to_instance": ""
        }));
        assert_eq!(status["is_attached"], false);
        assert_eq!(status["attachment_status"], "detached");
        assert_eq!(status["size_info"]["max_size_gb"], 40000);
        assert_eq!(status["cost_info"]["yearly_cost"], 60.0);
        assert_eq!(status["id"], "v-1");
    }

    #[test]
    fn test_mounting_instructions() {
        let volume = json!({"label": "data", "size_gb": 50, "attached_to_instance": "i-1"});
        let steps = mounting_instructions("v-1", &volume);
        assert_eq!(steps["commands"]["mount_volume"], "mount /dev/vdb /mnt/data");
        assert!(steps["full_script"].as_str().unwrap().contains("sudo mkfs.ext4 /dev/vdb"));
        assert!(steps.get("warning").is_none());

        let detached = mounting_instructions("v-2", &json!({"size_gb": 10}));
        assert_eq!(detached["commands"]["create_mount_point"], "mkdir -p /mnt/block-storage");
        assert!(detached.get("warning").is_some());
    }

    #[tokio::test]
    async fn test_create_checks_size() {
        let mock = Arc::new(MockTransport::new());
        let tools = BlockStorageTools::new(Arc::new(VultrClient::new(mock.clone())));
        let err = tools
            .call("create", json!({"region": "ewr", "size_gb": 5}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_attach_resolves_both_sides() {
        let mock = Arc::new(MockTransport::new());
        let tools = BlockStorageTools::new(Arc::new(VultrClient::new(mock.clone())));
        mock.on(
            Method::GET,
            "/blocks",
            200,
            json!({"blocks": [{"id": "v-1", "label": "data"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on(
            Method::GET,
            "/instances",
            200,
            json!({"instances": [{"id": "i-1", "label": "web", "hostname": "web"}], "meta": {"links": {"next": ""}}}),
        );
        mock.on(Method::POST, "/blocks/v-1/attach", 204, Value::Null);

        tools
            .call("attach", json!({"volume_identifier": "data", "instance_identifier": "web"}))
            .await
            .unwrap();

        let body = mock.requests().pop().unwrap().body.unwrap();
        assert_eq!(body, json!({"instance_id": "i-1", "live": true}));
    }
}
