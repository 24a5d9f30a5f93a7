//! `proxmox_zfs_storage_class`

use pve_client::{ContentType, ZfsStorage};
use serde::{Deserialize, Serialize};

use super::{BLOCK_CONTENT, StorageClass};
use crate::schema::{Attribute, AttributeType};
use crate::value::{Value, known_list};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZfsModel {
    pub id: String,
    pub pool: String,
    /// Dataset mount point, `/<pool>` unless the server says otherwise.
    #[serde(default)]
    pub mount: Value<String>,
    #[serde(default)]
    pub nodes: Value<Vec<String>>,
    #[serde(default)]
    pub content_types: Value<Vec<ContentType>>,
}

pub struct Zfs;

impl StorageClass for Zfs {
    type Entity = ZfsStorage;
    type Model = ZfsModel;

    const TYPE_NAME: &'static str = "proxmox_zfs_storage_class";
    const DATA_SOURCE_NAME: &'static str = "proxmox_zfs_storage_classes";
    const DISPLAY_NAME: &'static str = "ZFS storage class";
    const DESCRIPTION: &'static str = "Storage backed by a ZFS pool";
    const DEFAULT_CONTENT: &'static [ContentType] = BLOCK_CONTENT;
    const ALLOWED_CONTENT: &'static [ContentType] = BLOCK_CONTENT;

    fn kind_attributes() -> Vec<Attribute> {
        vec![
            Attribute::required("pool", AttributeType::String)
                .describe("ZFS pool or dataset")
                .replace(),
            Attribute::computed("mount", AttributeType::String).describe("Mount point"),
        ]
    }

    fn id(model: &ZfsModel) -> &str {
        &model.id
    }

    fn nodes(model: &ZfsModel) -> &Value<Vec<String>> {
        &model.nodes
    }

    fn content_types(model: &ZfsModel) -> &Value<Vec<ContentType>> {
        &model.content_types
    }

    fn build_entity(model: &ZfsModel, nodes: Vec<String>, content: Vec<ContentType>) -> ZfsStorage {
        ZfsStorage {
            id: model.id.clone(),
            pool: model.pool.clone(),
            mount: None,
            nodes: Some(nodes),
            content,
        }
    }

    fn to_model(entity: ZfsStorage, nodes: Vec<String>, content: Vec<ContentType>) -> ZfsModel {
        let mount = entity
            .mount
            .unwrap_or_else(|| format!("/{}", entity.pool));
        ZfsModel {
            id: entity.id,
            pool: entity.pool,
            mount: Value::Known(mount),
            nodes: known_list(nodes),
            content_types: known_list(content),
        }
    }

    fn with_resolved(
        plan: ZfsModel,
        prior: &ZfsModel,
        nodes: Vec<String>,
        content: Vec<ContentType>,
    ) -> ZfsModel {
        ZfsModel {
            mount: prior.mount.clone(),
            nodes: known_list(nodes),
            content_types: known_list(content),
            ..plan
        }
    }
}
