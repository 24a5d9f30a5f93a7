//! Domain types exchanged with the Proxmox API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Content types and storage kinds
// =============================================================================

/// What kind of data a storage may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Images,
    Rootdir,
    Vztmpl,
    Backup,
    Iso,
    Snippets,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::Images,
        ContentType::Rootdir,
        ContentType::Vztmpl,
        ContentType::Backup,
        ContentType::Iso,
        ContentType::Snippets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Images => "images",
            ContentType::Rootdir => "rootdir",
            ContentType::Vztmpl => "vztmpl",
            ContentType::Backup => "backup",
            ContentType::Iso => "iso",
            ContentType::Snippets => "snippets",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Invalid content type '{}'", s))
    }
}

/// Storage backend type as Proxmox names it in `/storage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    #[serde(rename = "lvm")]
    Lvm,
    #[serde(rename = "lvmthin")]
    LvmThin,
    #[serde(rename = "nfs")]
    Nfs,
    #[serde(rename = "zfspool")]
    Zfs,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Lvm => "lvm",
            StorageKind::LvmThin => "lvmthin",
            StorageKind::Nfs => "nfs",
            StorageKind::Zfs => "zfspool",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lvm" => Ok(StorageKind::Lvm),
            "lvmthin" => Ok(StorageKind::LvmThin),
            "nfs" => Ok(StorageKind::Nfs),
            "zfspool" => Ok(StorageKind::Zfs),
            _ => Err(format!("Unsupported storage type '{}'", s)),
        }
    }
}

// =============================================================================
// Pools
// =============================================================================

/// Request to create a resource pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePoolRequest {
    pub id: String,
    pub comment: Option<String>,
}

/// Request to change a pool's comment or membership.
///
/// `delete` toggles between adding the listed members and removing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePoolRequest {
    pub comment: Option<String>,
    pub delete: bool,
    pub vms: Vec<u32>,
    pub storage: Vec<String>,
}

/// A pool as returned by `GET /pools/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInfo {
    pub id: String,
    pub comment: Option<String>,
    pub members: Vec<PoolMemberInfo>,
}

/// A raw pool member entry.
///
/// Storage members are reported once per node they live on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMemberInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vmid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

/// A pool entry from `GET /pools`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSummary {
    pub id: String,
    pub comment: Option<String>,
}

// =============================================================================
// Storage classes
// =============================================================================

/// LVM volume group storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LvmStorage {
    pub id: String,
    pub volume_group: String,
    /// `None` means the storage is not restricted to particular nodes.
    pub nodes: Option<Vec<String>>,
    pub content: Vec<ContentType>,
}

/// LVM thin pool storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LvmThinStorage {
    pub id: String,
    pub volume_group: String,
    pub thinpool: String,
    pub nodes: Option<Vec<String>>,
    pub content: Vec<ContentType>,
}

/// NFS export storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfsStorage {
    pub id: String,
    pub server: String,
    pub export: String,
    /// Local mount path, assigned by the server when not given.
    pub mount: Option<String>,
    pub nodes: Option<Vec<String>>,
    pub content: Vec<ContentType>,
}

/// ZFS pool storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZfsStorage {
    pub id: String,
    pub pool: String,
    pub mount: Option<String>,
    pub nodes: Option<Vec<String>>,
    pub content: Vec<ContentType>,
}

/// One entry of the heterogeneous `/storage` catalog that this facade manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Lvm(LvmStorage),
    LvmThin(LvmThinStorage),
    Nfs(NfsStorage),
    Zfs(ZfsStorage),
}

impl StorageConfig {
    pub fn kind(&self) -> StorageKind {
        match self {
            StorageConfig::Lvm(_) => StorageKind::Lvm,
            StorageConfig::LvmThin(_) => StorageKind::LvmThin,
            StorageConfig::Nfs(_) => StorageKind::Nfs,
            StorageConfig::Zfs(_) => StorageKind::Zfs,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            StorageConfig::Lvm(s) => &s.id,
            StorageConfig::LvmThin(s) => &s.id,
            StorageConfig::Nfs(s) => &s.id,
            StorageConfig::Zfs(s) => &s.id,
        }
    }

    pub fn nodes(&self) -> Option<&[String]> {
        match self {
            StorageConfig::Lvm(s) => s.nodes.as_deref(),
            StorageConfig::LvmThin(s) => s.nodes.as_deref(),
            StorageConfig::Nfs(s) => s.nodes.as_deref(),
            StorageConfig::Zfs(s) => s.nodes.as_deref(),
        }
    }
}

/// Fields that can be changed on an existing storage class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyStorageRequest {
    pub nodes: Vec<String>,
    pub content: Vec<ContentType>,
}

/// Union view of any configured storage, including kinds this facade
/// does not manage (dir, cifs, rbd, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDescription {
    pub id: String,
    /// Plugin type, e.g. `lvm` or `dir`.
    pub kind: String,
    /// Nodes the storage is available on.
    pub nodes: Vec<String>,
    pub shared: bool,
    /// Total size in bytes as reported by the nodes.
    pub size: u64,
    pub content: Vec<String>,
    /// Backing location: volume group, pool, `server:export` or path.
    pub source: String,
}

/// A storage entity with a typed per-kind surface over [`StorageConfig`].
pub trait StorageEntity: Clone + Send + Sync + Sized + 'static {
    const KIND: StorageKind;

    fn id(&self) -> &str;

    fn nodes(&self) -> Option<&[String]>;

    fn content(&self) -> &[ContentType];

    /// Narrow a catalog entry to this kind.
    fn from_config(config: StorageConfig) -> Option<Self>;

    fn into_config(self) -> StorageConfig;
}

macro_rules! storage_entity {
    ($ty:ty, $variant:ident) => {
        impl StorageEntity for $ty {
            const KIND: StorageKind = StorageKind::$variant;

            fn id(&self) -> &str {
                &self.id
            }

            fn nodes(&self) -> Option<&[String]> {
                self.nodes.as_deref()
            }

            fn content(&self) -> &[ContentType] {
                &self.content
            }

            fn from_config(config: StorageConfig) -> Option<Self> {
                match config {
                    StorageConfig::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn into_config(self) -> StorageConfig {
                StorageConfig::$variant(self)
            }
        }
    };
}

storage_entity!(LvmStorage, Lvm);
storage_entity!(LvmThinStorage, LvmThin);
storage_entity!(NfsStorage, Nfs);
storage_entity!(ZfsStorage, Zfs);
