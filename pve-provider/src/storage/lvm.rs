//! `proxmox_lvm_storage_class`

use pve_client::{ContentType, LvmStorage};
use serde::{Deserialize, Serialize};

use super::{BLOCK_CONTENT, StorageClass};
use crate::schema::{Attribute, AttributeType};
use crate::value::{Value, known_list};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LvmModel {
    pub id: String,
    pub volume_group: String,
    #[serde(default)]
    pub nodes: Value<Vec<String>>,
    #[serde(default)]
    pub content_types: Value<Vec<ContentType>>,
}

pub struct Lvm;

impl StorageClass for Lvm {
    type Entity = LvmStorage;
    type Model = LvmModel;

    const TYPE_NAME: &'static str = "proxmox_lvm_storage_class";
    const DATA_SOURCE_NAME: &'static str = "proxmox_lvm_storage_classes";
    const DISPLAY_NAME: &'static str = "LVM storage class";
    const DESCRIPTION: &'static str = "Storage backed by an LVM volume group";
    const DEFAULT_CONTENT: &'static [ContentType] = BLOCK_CONTENT;
    const ALLOWED_CONTENT: &'static [ContentType] = BLOCK_CONTENT;

    fn kind_attributes() -> Vec<Attribute> {
        vec![
            Attribute::required("volume_group", AttributeType::String)
                .describe("Volume group name")
                .replace(),
        ]
    }

    fn id(model: &LvmModel) -> &str {
        &model.id
    }

    fn nodes(model: &LvmModel) -> &Value<Vec<String>> {
        &model.nodes
    }

    fn content_types(model: &LvmModel) -> &Value<Vec<ContentType>> {
        &model.content_types
    }

    fn build_entity(model: &LvmModel, nodes: Vec<String>, content: Vec<ContentType>) -> LvmStorage {
        LvmStorage {
            id: model.id.clone(),
            volume_group: model.volume_group.clone(),
            nodes: Some(nodes),
            content,
        }
    }

    fn to_model(entity: LvmStorage, nodes: Vec<String>, content: Vec<ContentType>) -> LvmModel {
        LvmModel {
            id: entity.id,
            volume_group: entity.volume_group,
            nodes: known_list(nodes),
            content_types: known_list(content),
        }
    }

    fn with_resolved(
        plan: LvmModel,
        _prior: &LvmModel,
        nodes: Vec<String>,
        content: Vec<ContentType>,
    ) -> LvmModel {
        LvmModel {
            nodes: known_list(nodes),
            content_types: known_list(content),
            ..plan
        }
    }
}
