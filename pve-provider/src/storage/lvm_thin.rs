//! `proxmox_lvm_thinpool_storage_class`

use pve_client::{ContentType, LvmThinStorage};
use serde::{Deserialize, Serialize};

use super::{BLOCK_CONTENT, StorageClass};
use crate::schema::{Attribute, AttributeType};
use crate::value::{Value, known_list};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LvmThinModel {
    pub id: String,
    pub volume_group: String,
    pub thinpool: String,
    #[serde(default)]
    pub nodes: Value<Vec<String>>,
    #[serde(default)]
    pub content_types: Value<Vec<ContentType>>,
}

pub struct LvmThin;

impl StorageClass for LvmThin {
    type Entity = LvmThinStorage;
    type Model = LvmThinModel;

    const TYPE_NAME: &'static str = "proxmox_lvm_thinpool_storage_class";
    const DATA_SOURCE_NAME: &'static str = "proxmox_lvm_thinpool_storage_classes";
    const DISPLAY_NAME: &'static str = "LVM-thin storage class";
    const DESCRIPTION: &'static str = "Storage backed by an LVM thin pool";
    const DEFAULT_CONTENT: &'static [ContentType] = BLOCK_CONTENT;
    const ALLOWED_CONTENT: &'static [ContentType] = BLOCK_CONTENT;

    fn kind_attributes() -> Vec<Attribute> {
        vec![
            Attribute::required("volume_group", AttributeType::String)
                .describe("Volume group holding the thin pool")
                .replace(),
            // Updatable in the schema, but modify only sends nodes and content.
            Attribute::required("thinpool", AttributeType::String).describe("Thin pool name"),
        ]
    }

    fn id(model: &LvmThinModel) -> &str {
        &model.id
    }

    fn nodes(model: &LvmThinModel) -> &Value<Vec<String>> {
        &model.nodes
    }

    fn content_types(model: &LvmThinModel) -> &Value<Vec<ContentType>> {
        &model.content_types
    }

    fn build_entity(
        model: &LvmThinModel,
        nodes: Vec<String>,
        content: Vec<ContentType>,
    ) -> LvmThinStorage {
        LvmThinStorage {
            id: model.id.clone(),
            volume_group: model.volume_group.clone(),
            thinpool: model.thinpool.clone(),
            nodes: Some(nodes),
            content,
        }
    }

    fn to_model(
        entity: LvmThinStorage,
        nodes: Vec<String>,
        content: Vec<ContentType>,
    ) -> LvmThinModel {
        LvmThinModel {
            id: entity.id,
            volume_group: entity.volume_group,
            thinpool: entity.thinpool,
            nodes: known_list(nodes),
            content_types: known_list(content),
        }
    }

    fn with_resolved(
        plan: LvmThinModel,
        _prior: &LvmThinModel,
        nodes: Vec<String>,
        content: Vec<ContentType>,
    ) -> LvmThinModel {
        LvmThinModel {
            nodes: known_list(nodes),
            content_types: known_list(content),
            ..plan
        }
    }
}
