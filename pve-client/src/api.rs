//! Facade traits over the Proxmox API.
//!
//! These traits abstract away the HTTP transport so that reconcilers work
//! with typed domain operations and can be driven by in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    CreatePoolRequest, ModifyStorageRequest, PoolInfo, PoolSummary, StorageConfig,
    StorageDescription, StorageEntity, StorageKind, UpdatePoolRequest,
};

/// Resource pool operations.
#[async_trait]
pub trait PoolApi: Send + Sync {
    /// Create an empty pool.
    async fn create_pool(&self, req: CreatePoolRequest) -> Result<()>;

    /// Add (`delete = false`) or remove (`delete = true`) members and
    /// optionally set the comment.
    async fn update_pool(&self, id: &str, req: UpdatePoolRequest) -> Result<()>;

    /// Get a pool with its members.
    async fn get_pool(&self, id: &str) -> Result<Option<PoolInfo>>;

    /// List all pools.
    async fn list_pools(&self) -> Result<Vec<PoolSummary>>;

    /// Delete a pool. Members must have been removed first.
    async fn delete_pool(&self, id: &str) -> Result<()>;
}

/// Storage catalog operations.
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Add a storage class to the cluster configuration.
    async fn create_storage(&self, config: StorageConfig) -> Result<()>;

    /// Get a storage class. An entry of a different kind counts as missing.
    async fn get_storage(&self, kind: StorageKind, id: &str) -> Result<Option<StorageConfig>>;

    /// List storage classes of one kind, in catalog order.
    async fn list_storage(&self, kind: StorageKind) -> Result<Vec<StorageConfig>>;

    /// Change the node restriction and content types.
    async fn modify_storage(
        &self,
        kind: StorageKind,
        id: &str,
        req: ModifyStorageRequest,
    ) -> Result<()>;

    /// Remove a storage class from the cluster configuration.
    async fn delete_storage(&self, kind: StorageKind, id: &str) -> Result<()>;

    /// Describe every configured storage, whatever its plugin type.
    async fn describe_storage(&self) -> Result<Vec<StorageDescription>>;

    /// Describe storage that is not shared between nodes.
    async fn describe_local_storage(&self) -> Result<Vec<StorageDescription>> {
        Ok(self
            .describe_storage()
            .await?
            .into_iter()
            .filter(|s| !s.shared)
            .collect())
    }
}

/// Cluster node discovery.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Names of all nodes in the cluster.
    async fn list_node_names(&self) -> Result<Vec<String>>;
}

/// Everything the provider needs from a Proxmox cluster.
pub trait ProxmoxApi: PoolApi + StorageApi + NodeApi {}

impl<T: PoolApi + StorageApi + NodeApi> ProxmoxApi for T {}

// =============================================================================
// Typed per-kind surface
// =============================================================================

/// Create a storage class of kind `E`.
pub async fn create<A, E>(api: &A, entity: E) -> Result<()>
where
    A: StorageApi + ?Sized,
    E: StorageEntity,
{
    api.create_storage(entity.into_config()).await
}

/// Get a storage class of kind `E`.
pub async fn get<A, E>(api: &A, id: &str) -> Result<Option<E>>
where
    A: StorageApi + ?Sized,
    E: StorageEntity,
{
    Ok(api.get_storage(E::KIND, id).await?.and_then(E::from_config))
}

/// List storage classes of kind `E`.
pub async fn list<A, E>(api: &A) -> Result<Vec<E>>
where
    A: StorageApi + ?Sized,
    E: StorageEntity,
{
    Ok(api
        .list_storage(E::KIND)
        .await?
        .into_iter()
        .filter_map(E::from_config)
        .collect())
}

/// Modify a storage class of kind `E`.
pub async fn modify<A, E>(api: &A, id: &str, req: ModifyStorageRequest) -> Result<()>
where
    A: StorageApi + ?Sized,
    E: StorageEntity,
{
    api.modify_storage(E::KIND, id, req).await
}

/// Delete a storage class of kind `E`.
pub async fn delete<A, E>(api: &A, id: &str) -> Result<()>
where
    A: StorageApi + ?Sized,
    E: StorageEntity,
{
    api.delete_storage(E::KIND, id).await
}
