//! Shared test utilities for pve-provider integration tests.
//!
//! [`FakeCluster`] is an in-memory Proxmox facade that records every
//! mutating call, so tests can assert the exact remote call sequence.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pve_client::{
    ClientError, ContentType, CreatePoolRequest, ModifyStorageRequest, NodeApi, PoolApi,
    PoolInfo, PoolMemberInfo, PoolSummary, ProxmoxApi, Result, StorageApi, StorageConfig,
    StorageDescription, StorageKind, UpdatePoolRequest,
};

/// A mutating facade call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreatePool {
        id: String,
        comment: Option<String>,
    },
    UpdatePool {
        id: String,
        comment: Option<String>,
        delete: bool,
        vms: Vec<u32>,
        storage: Vec<String>,
    },
    DeletePool(String),
    CreateStorage(StorageConfig),
    ModifyStorage {
        kind: StorageKind,
        id: String,
        nodes: Vec<String>,
        content: Vec<ContentType>,
    },
    DeleteStorage {
        kind: StorageKind,
        id: String,
    },
}

impl Call {
    /// Additive or subtractive member update without a comment.
    pub fn members(id: &str, delete: bool, vms: &[u32], storage: &[&str]) -> Self {
        Call::UpdatePool {
            id: id.to_string(),
            comment: None,
            delete,
            vms: vms.to_vec(),
            storage: storage.iter().map(|s| s.to_string()).collect(),
        }
    }
}

type FailPoint = Box<dyn Fn(&Call) -> bool + Send + Sync>;

#[derive(Default)]
struct Cluster {
    nodes: Vec<String>,
    pools: Vec<PoolInfo>,
    storage: Vec<StorageConfig>,
    descriptions: Vec<StorageDescription>,
    calls: Vec<Call>,
    reads: usize,
}

/// In-memory cluster implementing the facade traits.
pub struct FakeCluster {
    cluster: Mutex<Cluster>,
    fail: Mutex<Option<FailPoint>>,
    stalled: Mutex<bool>,
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl FakeCluster {
    /// A cluster with the given node names and nothing configured.
    pub fn new(nodes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            cluster: Mutex::new(Cluster {
                nodes: strings(nodes),
                ..Cluster::default()
            }),
            fail: Mutex::new(None),
            stalled: Mutex::new(false),
        })
    }

    pub fn api(self: &Arc<Self>) -> Arc<dyn ProxmoxApi> {
        Arc::clone(self) as Arc<dyn ProxmoxApi>
    }

    pub fn with_storage(&self, config: StorageConfig) {
        self.cluster.lock().unwrap().storage.push(config);
    }

    pub fn with_description(&self, description: StorageDescription) {
        self.cluster.lock().unwrap().descriptions.push(description);
    }

    /// Seed a pool directly, bypassing call recording.
    pub fn with_pool(&self, id: &str, comment: Option<&str>, vms: &[u32], storage: &[&str]) {
        let mut cluster = self.cluster.lock().unwrap();
        let members = member_entries(&cluster.nodes, vms, &strings(storage));
        cluster.pools.push(PoolInfo {
            id: id.to_string(),
            comment: comment.map(str::to_string),
            members,
        });
    }

    pub fn pool(&self, id: &str) -> Option<PoolInfo> {
        let cluster = self.cluster.lock().unwrap();
        cluster.pools.iter().find(|p| p.id == id).cloned()
    }

    pub fn storage(&self, id: &str) -> Option<StorageConfig> {
        let cluster = self.cluster.lock().unwrap();
        cluster.storage.iter().find(|s| s.id() == id).cloned()
    }

    pub fn remove_storage(&self, id: &str) {
        self.cluster.lock().unwrap().storage.retain(|s| s.id() != id);
    }

    /// Mutating calls seen so far.
    pub fn calls(&self) -> Vec<Call> {
        self.cluster.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.cluster.lock().unwrap().calls.clear();
    }

    pub fn reads(&self) -> usize {
        self.cluster.lock().unwrap().reads
    }

    /// Make matching calls fail with a 500 after being recorded.
    pub fn fail_when(&self, predicate: impl Fn(&Call) -> bool + Send + Sync + 'static) {
        *self.fail.lock().unwrap() = Some(Box::new(predicate));
    }

    /// Make every call hang until it is cancelled.
    pub fn stall(&self) {
        *self.stalled.lock().unwrap() = true;
    }

    async fn enter(&self) {
        let stalled = *self.stalled.lock().unwrap();
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn record(&self, call: Call) -> Result<()> {
        let failing = self
            .fail
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|predicate| predicate(&call));
        self.cluster.lock().unwrap().calls.push(call);
        if failing {
            return Err(ClientError::Api {
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn read(&self) {
        self.cluster.lock().unwrap().reads += 1;
    }
}

/// Remote member entries the way Proxmox reports them: storage once per node.
fn member_entries(nodes: &[String], vms: &[u32], storage: &[String]) -> Vec<PoolMemberInfo> {
    let mut entries: Vec<PoolMemberInfo> = vms
        .iter()
        .map(|vmid| PoolMemberInfo {
            id: format!("qemu/{}", vmid),
            kind: "qemu".to_string(),
            vmid: Some(*vmid),
            storage: None,
            node: nodes.first().cloned(),
        })
        .collect();
    for name in storage {
        for node in nodes {
            entries.push(PoolMemberInfo {
                id: format!("storage/{}/{}", node, name),
                kind: "storage".to_string(),
                vmid: None,
                storage: Some(name.clone()),
                node: Some(node.clone()),
            });
        }
    }
    entries
}

fn missing(what: &str, id: &str) -> ClientError {
    ClientError::Api {
        status: 500,
        message: format!("{} '{}' does not exist", what, id),
    }
}

fn modify_config(config: &mut StorageConfig, req: &ModifyStorageRequest) {
    let (nodes, content) = match config {
        StorageConfig::Lvm(s) => (&mut s.nodes, &mut s.content),
        StorageConfig::LvmThin(s) => (&mut s.nodes, &mut s.content),
        StorageConfig::Nfs(s) => (&mut s.nodes, &mut s.content),
        StorageConfig::Zfs(s) => (&mut s.nodes, &mut s.content),
    };
    *nodes = if req.nodes.is_empty() {
        None
    } else {
        Some(req.nodes.clone())
    };
    *content = req.content.clone();
}

#[async_trait]
impl PoolApi for FakeCluster {
    async fn create_pool(&self, req: CreatePoolRequest) -> Result<()> {
        self.enter().await;
        self.record(Call::CreatePool {
            id: req.id.clone(),
            comment: req.comment.clone(),
        })?;

        let mut cluster = self.cluster.lock().unwrap();
        if cluster.pools.iter().any(|p| p.id == req.id) {
            return Err(ClientError::Api {
                status: 500,
                message: format!("pool '{}' already exists", req.id),
            });
        }
        cluster.pools.push(PoolInfo {
            id: req.id,
            comment: req.comment,
            members: Vec::new(),
        });
        Ok(())
    }

    async fn update_pool(&self, id: &str, req: UpdatePoolRequest) -> Result<()> {
        self.enter().await;
        self.record(Call::UpdatePool {
            id: id.to_string(),
            comment: req.comment.clone(),
            delete: req.delete,
            vms: req.vms.clone(),
            storage: req.storage.clone(),
        })?;

        let mut cluster = self.cluster.lock().unwrap();
        let nodes = cluster.nodes.clone();
        let pool = cluster
            .pools
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing("pool", id))?;

        if let Some(comment) = req.comment {
            pool.comment = (!comment.is_empty()).then_some(comment);
        }
        if req.delete {
            pool.members.retain(|m| {
                let vm = m.vmid.is_some_and(|v| req.vms.contains(&v));
                let store = m.storage.as_ref().is_some_and(|s| req.storage.contains(s));
                !(vm || store)
            });
        } else {
            pool.members
                .extend(member_entries(&nodes, &req.vms, &req.storage));
        }
        Ok(())
    }

    async fn get_pool(&self, id: &str) -> Result<Option<PoolInfo>> {
        self.enter().await;
        self.read();
        Ok(self.pool(id))
    }

    async fn list_pools(&self) -> Result<Vec<PoolSummary>> {
        self.enter().await;
        self.read();
        let cluster = self.cluster.lock().unwrap();
        Ok(cluster
            .pools
            .iter()
            .map(|p| PoolSummary {
                id: p.id.clone(),
                comment: p.comment.clone(),
            })
            .collect())
    }

    async fn delete_pool(&self, id: &str) -> Result<()> {
        self.enter().await;
        self.record(Call::DeletePool(id.to_string()))?;

        let mut cluster = self.cluster.lock().unwrap();
        let pool = cluster
            .pools
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| missing("pool", id))?;
        if !pool.members.is_empty() {
            return Err(ClientError::Api {
                status: 500,
                message: format!("pool '{}' is not empty", id),
            });
        }
        cluster.pools.retain(|p| p.id != id);
        Ok(())
    }
}

#[async_trait]
impl StorageApi for FakeCluster {
    async fn create_storage(&self, config: StorageConfig) -> Result<()> {
        self.enter().await;
        self.record(Call::CreateStorage(config.clone()))?;

        let mut config = config;
        // The server assigns NFS mount points.
        if let StorageConfig::Nfs(nfs) = &mut config {
            if nfs.mount.is_none() {
                nfs.mount = Some(format!("/mnt/pve/{}", nfs.id));
            }
        }
        self.cluster.lock().unwrap().storage.push(config);
        Ok(())
    }

    async fn get_storage(&self, kind: StorageKind, id: &str) -> Result<Option<StorageConfig>> {
        self.enter().await;
        self.read();
        Ok(self.storage(id).filter(|s| s.kind() == kind))
    }

    async fn list_storage(&self, kind: StorageKind) -> Result<Vec<StorageConfig>> {
        self.enter().await;
        self.read();
        let cluster = self.cluster.lock().unwrap();
        Ok(cluster
            .storage
            .iter()
            .filter(|s| s.kind() == kind)
            .cloned()
            .collect())
    }

    async fn modify_storage(
        &self,
        kind: StorageKind,
        id: &str,
        req: ModifyStorageRequest,
    ) -> Result<()> {
        self.enter().await;
        self.record(Call::ModifyStorage {
            kind,
            id: id.to_string(),
            nodes: req.nodes.clone(),
            content: req.content.clone(),
        })?;

        let mut cluster = self.cluster.lock().unwrap();
        let config = cluster
            .storage
            .iter_mut()
            .find(|s| s.id() == id && s.kind() == kind)
            .ok_or_else(|| missing("storage", id))?;
        modify_config(config, &req);
        Ok(())
    }

    async fn delete_storage(&self, kind: StorageKind, id: &str) -> Result<()> {
        self.enter().await;
        self.record(Call::DeleteStorage {
            kind,
            id: id.to_string(),
        })?;

        let mut cluster = self.cluster.lock().unwrap();
        let before = cluster.storage.len();
        cluster.storage.retain(|s| !(s.id() == id && s.kind() == kind));
        if cluster.storage.len() == before {
            return Err(missing("storage", id));
        }
        Ok(())
    }

    async fn describe_storage(&self) -> Result<Vec<StorageDescription>> {
        self.enter().await;
        self.read();
        Ok(self.cluster.lock().unwrap().descriptions.clone())
    }
}

#[async_trait]
impl NodeApi for FakeCluster {
    async fn list_node_names(&self) -> Result<Vec<String>> {
        self.enter().await;
        self.read();
        Ok(self.cluster.lock().unwrap().nodes.clone())
    }
}
