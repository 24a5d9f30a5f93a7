//! pve-client: typed facade over the Proxmox VE API
//!
//! Covers what the provider manages: resource pools, LVM / LVM-thin / NFS /
//! ZFS storage classes, the union storage view and cluster node names.

pub mod api;
pub mod cancel;
pub mod error;
pub mod http;
pub mod types;
mod wire;

pub use api::{NodeApi, PoolApi, ProxmoxApi, StorageApi, create, delete, get, list, modify};
pub use cancel::cancellable;
pub use error::{ClientError, Result};
pub use http::{ClientConfig, HttpClient};
pub use types::{
    ContentType, CreatePoolRequest, LvmStorage, LvmThinStorage, ModifyStorageRequest,
    NfsStorage, PoolInfo, PoolMemberInfo, PoolSummary, StorageConfig, StorageDescription,
    StorageEntity, StorageKind, UpdatePoolRequest, ZfsStorage,
};
