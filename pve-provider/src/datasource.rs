//! Read-only listings: storage classes per kind, pools and the union
//! storage view.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use pve_client::{ProxmoxApi, StorageDescription, StorageEntity};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::resource::{Context, DataSource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::storage::{self, StorageClass};
use crate::value::{Value, known_list};

/// The only filter name entities are matched on.
pub const NODE_FILTER: &str = "node";

/// One `filters` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Schema of the `filters` block. Built per data source at registration.
pub fn filter_attribute() -> Attribute {
    Attribute::optional(
        "filters",
        AttributeType::Block(vec![
            Attribute::required("name", AttributeType::String)
                .describe("Attribute to filter on")
                .validate(Validator::one_of([NODE_FILTER])),
            Attribute::required("values", AttributeType::List(Box::new(AttributeType::String)))
                .describe("Accepted values; an entity matches if any of them applies"),
        ]),
    )
    .describe("Restrict results; blocks are combined with AND")
}

/// Whether an entity available on `nodes` passes every node filter.
///
/// A block without values does not filter.
pub fn matches_nodes(filters: &[Filter], nodes: &[String]) -> bool {
    filters
        .iter()
        .filter(|f| f.name == NODE_FILTER && !f.values.is_empty())
        .all(|f| f.values.iter().any(|v| nodes.contains(v)))
}

/// Turn a resource attribute into a read-only output attribute.
fn output(attribute: Attribute) -> Attribute {
    let ty = match attribute.ty {
        AttributeType::Block(inner) => AttributeType::Block(inner.into_iter().map(output).collect()),
        other => other,
    };
    Attribute::computed(attribute.name, ty).describe(attribute.description)
}

fn filters_of(config: &Value<Vec<Filter>>) -> &[Filter] {
    config.as_option().map(Vec::as_slice).unwrap_or_default()
}

// =============================================================================
// Storage classes of one kind
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "M: Serialize", deserialize = "M: DeserializeOwned"))]
pub struct StorageClassList<M> {
    #[serde(default)]
    pub filters: Value<Vec<Filter>>,
    #[serde(default)]
    pub storage_classes: Value<Vec<M>>,
}

/// Lists every storage class of kind `K` that passes the node filters.
pub struct StorageClassSource<K> {
    api: Arc<dyn ProxmoxApi>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: StorageClass> StorageClassSource<K> {
    pub fn new(api: Arc<dyn ProxmoxApi>) -> Self {
        Self {
            api,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K: StorageClass> DataSource for StorageClassSource<K> {
    type Model = StorageClassList<K::Model>;

    fn type_name(&self) -> &'static str {
        K::DATA_SOURCE_NAME
    }

    fn schema(&self) -> Schema {
        let row = storage::schema::<K>().attributes.into_iter().map(output).collect();
        Schema::new(K::DATA_SOURCE_NAME, K::DESCRIPTION)
            .attribute(filter_attribute())
            .attribute(Attribute::computed("storage_classes", AttributeType::Block(row)))
    }

    async fn read(&self, ctx: &Context, config: Self::Model) -> Result<Self::Model> {
        let summary = format!("Error listing {}es", K::DISPLAY_NAME);
        let entities = ctx
            .call(pve_client::list::<_, K::Entity>(self.api.as_ref()))
            .await
            .map_err(ProviderError::remote(&summary))?;

        // Entries without a node restriction are available everywhere.
        let mut cluster: Option<Vec<String>> = None;
        let filters = filters_of(&config.filters);
        let mut rows = Vec::new();
        for entity in entities {
            let nodes = match entity.nodes() {
                Some(nodes) => nodes.to_vec(),
                None => {
                    if cluster.is_none() {
                        let all = ctx
                            .call(self.api.list_node_names())
                            .await
                            .map_err(ProviderError::remote(&summary))?;
                        cluster = Some(all);
                    }
                    cluster.clone().unwrap_or_default()
                }
            };
            if !matches_nodes(filters, &nodes) {
                continue;
            }
            let content = entity.content().to_vec();
            rows.push(K::to_model(entity, nodes, content));
        }

        debug!(kind = %K::Entity::KIND, count = rows.len(), "Listed storage classes");
        Ok(StorageClassList {
            filters: config.filters,
            storage_classes: known_list(rows),
        })
    }
}

// =============================================================================
// Resource pools
// =============================================================================

pub const POOLS_TYPE_NAME: &str = "proxmox_resource_pools";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRow {
    pub id: String,
    #[serde(default)]
    pub comment: Value<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolList {
    #[serde(default)]
    pub pools: Value<Vec<PoolRow>>,
}

pub struct PoolSource {
    api: Arc<dyn ProxmoxApi>,
}

impl PoolSource {
    pub fn new(api: Arc<dyn ProxmoxApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for PoolSource {
    type Model = PoolList;

    fn type_name(&self) -> &'static str {
        POOLS_TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(POOLS_TYPE_NAME, "All resource pools").attribute(Attribute::computed(
            "pools",
            AttributeType::Block(vec![
                Attribute::computed("id", AttributeType::String),
                Attribute::computed("comment", AttributeType::String),
            ]),
        ))
    }

    async fn read(&self, ctx: &Context, _config: PoolList) -> Result<PoolList> {
        let pools = ctx
            .call(self.api.list_pools())
            .await
            .map_err(ProviderError::remote("Error listing resource pools"))?;

        Ok(PoolList {
            pools: known_list(pools.into_iter().map(|p| PoolRow {
                id: p.id,
                comment: p.comment.into(),
            })),
        })
    }
}

// =============================================================================
// Union storage view
// =============================================================================

pub const STORAGE_TYPE_NAME: &str = "proxmox_storage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRow {
    pub id: String,
    pub shared_nodes: Vec<String>,
    pub shared: bool,
    pub local: bool,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Vec<String>,
    pub source: String,
}

impl From<StorageDescription> for StorageRow {
    fn from(desc: StorageDescription) -> Self {
        Self {
            id: desc.id,
            shared_nodes: desc.nodes,
            local: !desc.shared,
            shared: desc.shared,
            size: desc.size,
            kind: desc.kind,
            content: desc.content,
            source: desc.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageList {
    #[serde(default)]
    pub filters: Value<Vec<Filter>>,
    /// Only list storage that is not shared between nodes.
    #[serde(default)]
    pub local_only: Value<bool>,
    #[serde(default)]
    pub storages: Value<Vec<StorageRow>>,
}

pub struct StorageSource {
    api: Arc<dyn ProxmoxApi>,
}

impl StorageSource {
    pub fn new(api: Arc<dyn ProxmoxApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for StorageSource {
    type Model = StorageList;

    fn type_name(&self) -> &'static str {
        STORAGE_TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let strings = || AttributeType::List(Box::new(AttributeType::String));
        Schema::new(STORAGE_TYPE_NAME, "All configured storage, of any type")
            .attribute(filter_attribute())
            .attribute(
                Attribute::optional("local_only", AttributeType::Bool)
                    .describe("Only list storage that is not shared"),
            )
            .attribute(Attribute::computed(
                "storages",
                AttributeType::Block(vec![
                    Attribute::computed("id", AttributeType::String),
                    Attribute::computed("shared_nodes", strings()),
                    Attribute::computed("shared", AttributeType::Bool),
                    Attribute::computed("local", AttributeType::Bool),
                    Attribute::computed("size", AttributeType::Number).describe("Size in bytes"),
                    Attribute::computed("type", AttributeType::String),
                    Attribute::computed("content", strings()),
                    Attribute::computed("source", AttributeType::String),
                ]),
            ))
    }

    async fn read(&self, ctx: &Context, config: StorageList) -> Result<StorageList> {
        let summary = "Error listing storage";
        let local_only = config.local_only.as_option().copied().unwrap_or(false);

        let descriptions = if local_only {
            ctx.call(self.api.describe_local_storage()).await
        } else {
            ctx.call(self.api.describe_storage()).await
        }
        .map_err(ProviderError::remote(summary))?;

        let filters = filters_of(&config.filters);
        let rows: Vec<StorageRow> = descriptions
            .into_iter()
            .filter(|d| matches_nodes(filters, &d.nodes))
            .map(StorageRow::from)
            .collect();

        debug!(count = rows.len(), local_only, "Listed storage");
        Ok(StorageList {
            storages: known_list(rows),
            ..config
        })
    }
}
