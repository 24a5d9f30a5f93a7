//! `proxmox_nfs_storage_class`

use pve_client::{ContentType, NfsStorage};
use serde::{Deserialize, Serialize};

use super::StorageClass;
use crate::schema::{Attribute, AttributeType};
use crate::value::{Value, known_list};

const DEFAULT_CONTENT: &[ContentType] = &[ContentType::Iso, ContentType::Images, ContentType::Rootdir];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfsModel {
    pub id: String,
    pub server: String,
    pub export: String,
    /// Assigned by the server.
    #[serde(default)]
    pub mount: Value<String>,
    #[serde(default)]
    pub nodes: Value<Vec<String>>,
    #[serde(default)]
    pub content_types: Value<Vec<ContentType>>,
}

pub struct Nfs;

impl StorageClass for Nfs {
    type Entity = NfsStorage;
    type Model = NfsModel;

    const TYPE_NAME: &'static str = "proxmox_nfs_storage_class";
    const DATA_SOURCE_NAME: &'static str = "proxmox_nfs_storage_classes";
    const DISPLAY_NAME: &'static str = "NFS storage class";
    const DESCRIPTION: &'static str = "Storage backed by an NFS export";
    const DEFAULT_CONTENT: &'static [ContentType] = DEFAULT_CONTENT;
    const ALLOWED_CONTENT: &'static [ContentType] = &ContentType::ALL;

    fn kind_attributes() -> Vec<Attribute> {
        vec![
            Attribute::required("server", AttributeType::String)
                .describe("NFS server address")
                .replace(),
            Attribute::required("export", AttributeType::String)
                .describe("Exported path on the server")
                .replace(),
            Attribute::computed("mount", AttributeType::String)
                .describe("Local mount point on each node"),
        ]
    }

    fn id(model: &NfsModel) -> &str {
        &model.id
    }

    fn nodes(model: &NfsModel) -> &Value<Vec<String>> {
        &model.nodes
    }

    fn content_types(model: &NfsModel) -> &Value<Vec<ContentType>> {
        &model.content_types
    }

    fn build_entity(model: &NfsModel, nodes: Vec<String>, content: Vec<ContentType>) -> NfsStorage {
        NfsStorage {
            id: model.id.clone(),
            server: model.server.clone(),
            export: model.export.clone(),
            mount: None,
            nodes: Some(nodes),
            content,
        }
    }

    fn to_model(entity: NfsStorage, nodes: Vec<String>, content: Vec<ContentType>) -> NfsModel {
        NfsModel {
            mount: Value::Known(
                entity
                    .mount
                    .unwrap_or_else(|| format!("/mnt/pve/{}", entity.id)),
            ),
            id: entity.id,
            server: entity.server,
            export: entity.export,
            nodes: known_list(nodes),
            content_types: known_list(content),
        }
    }

    fn with_resolved(
        plan: NfsModel,
        prior: &NfsModel,
        nodes: Vec<String>,
        content: Vec<ContentType>,
    ) -> NfsModel {
        NfsModel {
            mount: prior.mount.clone(),
            server: prior.server.clone(),
            export: prior.export.clone(),
            nodes: known_list(nodes),
            content_types: known_list(content),
            ..plan
        }
    }
}
