//! JSON shapes of the Proxmox REST API and their conversion to domain types.
//!
//! Proxmox encodes lists as comma separated strings and booleans as 0/1,
//! so nothing here is exposed outside the crate.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::types::{
    ContentType, LvmStorage, LvmThinStorage, ModifyStorageRequest, NfsStorage, PoolInfo,
    PoolMemberInfo, PoolSummary, StorageConfig, StorageDescription, StorageKind,
    UpdatePoolRequest, ZfsStorage,
};

/// Every response is wrapped in `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Split a comma separated list, dropping empty entries.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn join_list<T: AsRef<str>>(items: &[T]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a content list, skipping types this facade does not model.
pub(crate) fn parse_content(raw: &str) -> Vec<ContentType> {
    split_list(raw)
        .into_iter()
        .filter_map(|c| match c.parse() {
            Ok(content) => Some(content),
            Err(_) => {
                debug!(content = %c, "Ignoring unsupported content type");
                None
            }
        })
        .collect()
}

fn content_list(content: &[ContentType]) -> String {
    content
        .iter()
        .map(ContentType::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Accept `0`/`1`, `true`/`false` or `"0"`/`"1"`.
fn int_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => Some(n.as_u64().unwrap_or(0) != 0),
        Some(Value::String(s)) => Some(s == "1" || s == "true"),
        _ => None,
    })
}

// =============================================================================
// Pools
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct PoolRecord {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub members: Vec<PoolMemberInfo>,
}

impl PoolRecord {
    pub fn into_info(self, id: &str) -> PoolInfo {
        PoolInfo {
            id: id.to_string(),
            comment: self.comment.filter(|c| !c.is_empty()),
            members: self.members,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PoolListRecord {
    pub poolid: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl From<PoolListRecord> for PoolSummary {
    fn from(record: PoolListRecord) -> Self {
        PoolSummary {
            id: record.poolid,
            comment: record.comment.filter(|c| !c.is_empty()),
        }
    }
}

pub(crate) fn update_pool_body(req: &UpdatePoolRequest) -> Value {
    let mut body = Map::new();
    if let Some(comment) = &req.comment {
        body.insert("comment".into(), json!(comment));
    }
    if !req.vms.is_empty() {
        let vms: Vec<String> = req.vms.iter().map(u32::to_string).collect();
        body.insert("vms".into(), json!(join_list(&vms)));
    }
    if !req.storage.is_empty() {
        body.insert("storage".into(), json!(join_list(&req.storage)));
    }
    if req.delete {
        body.insert("delete".into(), json!(1));
    }
    Value::Object(body)
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct NodeRecord {
    pub node: String,
}

// =============================================================================
// Storage
// =============================================================================

/// One `/storage` entry, of any plugin type.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StorageRecord {
    pub storage: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub nodes: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "int_bool")]
    pub shared: Option<bool>,
    #[serde(default)]
    pub vgname: Option<String>,
    #[serde(default)]
    pub thinpool: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub export: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default)]
    pub mountpoint: Option<String>,
}

impl StorageRecord {
    fn node_list(&self) -> Option<Vec<String>> {
        self.nodes
            .as_deref()
            .map(split_list)
            .filter(|nodes| !nodes.is_empty())
    }

    fn content_list(&self) -> Vec<ContentType> {
        self.content.as_deref().map(parse_content).unwrap_or_default()
    }

    /// Convert to a managed storage class, or `None` for other plugin types.
    pub fn into_config(self) -> Option<StorageConfig> {
        let kind: StorageKind = self.kind.parse().ok()?;
        let nodes = self.node_list();
        let content = self.content_list();
        let config = match kind {
            StorageKind::Lvm => StorageConfig::Lvm(LvmStorage {
                id: self.storage,
                volume_group: self.vgname.unwrap_or_default(),
                nodes,
                content,
            }),
            StorageKind::LvmThin => StorageConfig::LvmThin(LvmThinStorage {
                id: self.storage,
                volume_group: self.vgname.unwrap_or_default(),
                thinpool: self.thinpool.unwrap_or_default(),
                nodes,
                content,
            }),
            StorageKind::Nfs => StorageConfig::Nfs(NfsStorage {
                id: self.storage,
                server: self.server.unwrap_or_default(),
                export: self.export.unwrap_or_default(),
                mount: self.path,
                nodes,
                content,
            }),
            StorageKind::Zfs => StorageConfig::Zfs(ZfsStorage {
                id: self.storage,
                pool: self.pool.unwrap_or_default(),
                mount: self.mountpoint,
                nodes,
                content,
            }),
        };
        Some(config)
    }

    /// Human readable backing location.
    pub fn source(&self) -> String {
        match self.kind.as_str() {
            "lvm" => self.vgname.clone().unwrap_or_default(),
            "lvmthin" => format!(
                "{}/{}",
                self.vgname.as_deref().unwrap_or_default(),
                self.thinpool.as_deref().unwrap_or_default()
            ),
            "nfs" | "cifs" => format!(
                "{}:{}",
                self.server.as_deref().unwrap_or_default(),
                self.export.as_deref().unwrap_or_default()
            ),
            "zfspool" => self.pool.clone().unwrap_or_default(),
            _ => self.path.clone().unwrap_or_default(),
        }
    }
}

/// One `/cluster/resources?type=storage` entry; there is one per node.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StorageResourceRecord {
    pub storage: String,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub maxdisk: Option<u64>,
    #[serde(default, deserialize_with = "int_bool")]
    pub shared: Option<bool>,
}

/// Merge catalog entries with per-node usage into union rows.
///
/// Row order follows the catalog.
pub(crate) fn describe(
    records: Vec<StorageRecord>,
    resources: &[StorageResourceRecord],
) -> Vec<StorageDescription> {
    records
        .into_iter()
        .map(|record| {
            let per_node: Vec<&StorageResourceRecord> = resources
                .iter()
                .filter(|r| r.storage == record.storage)
                .collect();

            let nodes = record.node_list().unwrap_or_else(|| {
                let mut seen = Vec::new();
                for node in per_node.iter().filter_map(|r| r.node.clone()) {
                    if !seen.contains(&node) {
                        seen.push(node);
                    }
                }
                seen
            });
            let size = per_node.iter().filter_map(|r| r.maxdisk).max().unwrap_or(0);
            let shared = record
                .shared
                .or_else(|| per_node.iter().find_map(|r| r.shared))
                .unwrap_or(false);

            StorageDescription {
                source: record.source(),
                content: record
                    .content
                    .as_deref()
                    .map(split_list)
                    .unwrap_or_default(),
                id: record.storage,
                kind: record.kind,
                nodes,
                shared,
                size,
            }
        })
        .collect()
}

pub(crate) fn create_storage_body(config: &StorageConfig) -> Value {
    let mut body = Map::new();
    body.insert("storage".into(), json!(config.id()));
    body.insert("type".into(), json!(config.kind().as_str()));

    let (nodes, content) = match config {
        StorageConfig::Lvm(s) => {
            body.insert("vgname".into(), json!(s.volume_group));
            (&s.nodes, &s.content)
        }
        StorageConfig::LvmThin(s) => {
            body.insert("vgname".into(), json!(s.volume_group));
            body.insert("thinpool".into(), json!(s.thinpool));
            (&s.nodes, &s.content)
        }
        StorageConfig::Nfs(s) => {
            body.insert("server".into(), json!(s.server));
            body.insert("export".into(), json!(s.export));
            if let Some(path) = &s.mount {
                body.insert("path".into(), json!(path));
            }
            (&s.nodes, &s.content)
        }
        StorageConfig::Zfs(s) => {
            body.insert("pool".into(), json!(s.pool));
            if let Some(mountpoint) = &s.mount {
                body.insert("mountpoint".into(), json!(mountpoint));
            }
            (&s.nodes, &s.content)
        }
    };

    if let Some(nodes) = nodes.as_ref().filter(|n| !n.is_empty()) {
        body.insert("nodes".into(), json!(join_list(nodes)));
    }
    if !content.is_empty() {
        body.insert("content".into(), json!(content_list(content)));
    }
    Value::Object(body)
}

/// An empty node list lifts the restriction instead of sending `nodes=""`.
pub(crate) fn modify_storage_body(req: &ModifyStorageRequest) -> Value {
    let mut body = Map::new();
    if req.nodes.is_empty() {
        body.insert("delete".into(), json!("nodes"));
    } else {
        body.insert("nodes".into(), json!(join_list(&req.nodes)));
    }
    body.insert("content".into(), json!(content_list(&req.content)));
    Value::Object(body)
}
