//! Storage class resources.
//!
//! All four kinds share one lifecycle, implemented once by
//! [`StorageClassResource`]. A kind only supplies its model, payload
//! builders, defaults and the attributes that force replacement.

pub mod lvm;
pub mod lvm_thin;
pub mod nfs;
pub mod zfs;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use pve_client::{ContentType, ModifyStorageRequest, ProxmoxApi, StorageEntity};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::defaults::{resolve_content_types, resolve_nodes};
use crate::error::{ProviderError, Result};
use crate::resource::{Context, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::value::{Value, reorder_like, same_elements};

pub use lvm::Lvm;
pub use lvm_thin::LvmThin;
pub use nfs::Nfs;
pub use zfs::Zfs;

/// Content types LVM, LVM-thin and ZFS accept, also their default.
pub const BLOCK_CONTENT: &[ContentType] = &[ContentType::Images, ContentType::Rootdir];

/// A storage class kind.
pub trait StorageClass: Send + Sync + 'static {
    type Entity: StorageEntity;
    type Model: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Resource type name, e.g. `proxmox_lvm_storage_class`.
    const TYPE_NAME: &'static str;
    /// Listing data source type name.
    const DATA_SOURCE_NAME: &'static str;
    /// Human name used in diagnostics, e.g. "LVM storage class".
    const DISPLAY_NAME: &'static str;
    const DESCRIPTION: &'static str;
    const DEFAULT_CONTENT: &'static [ContentType];
    const ALLOWED_CONTENT: &'static [ContentType];

    /// Attributes between `id` and `nodes`.
    fn kind_attributes() -> Vec<Attribute>;

    fn id(model: &Self::Model) -> &str;

    fn nodes(model: &Self::Model) -> &Value<Vec<String>>;

    fn content_types(model: &Self::Model) -> &Value<Vec<ContentType>>;

    /// Create payload from a plan with defaults already resolved.
    fn build_entity(
        model: &Self::Model,
        nodes: Vec<String>,
        content: Vec<ContentType>,
    ) -> Self::Entity;

    /// State for a remote entity. `nodes` and `content` are already resolved
    /// and ordered.
    fn to_model(entity: Self::Entity, nodes: Vec<String>, content: Vec<ContentType>)
    -> Self::Model;

    /// State after an in-place update: the plan with resolved defaults, and
    /// server computed fields carried over from `prior`.
    fn with_resolved(
        plan: Self::Model,
        prior: &Self::Model,
        nodes: Vec<String>,
        content: Vec<ContentType>,
    ) -> Self::Model;
}

/// Schema shared by every storage class kind.
pub fn schema<K: StorageClass>() -> Schema {
    Schema::new(K::TYPE_NAME, K::DESCRIPTION)
        .attribute(
            Attribute::required("id", AttributeType::String)
                .describe("Storage identifier")
                .replace()
                .validate(Validator::Identifier),
        )
        .attributes(K::kind_attributes())
        .attribute(
            Attribute::optional_computed("nodes", AttributeType::List(Box::new(AttributeType::String)))
                .describe("Nodes the storage is available on; all cluster nodes when unset")
                .validate(Validator::NonEmpty),
        )
        .attribute(
            Attribute::optional_computed(
                "content_types",
                AttributeType::List(Box::new(AttributeType::String)),
            )
            .describe("Content the storage may hold; kind defaults when unset")
            .validate(Validator::NonEmpty)
            .validate(Validator::subset_of(
                K::ALLOWED_CONTENT.iter().map(ContentType::as_str),
            )),
        )
}

fn prior_list<T>(value: &Value<Vec<T>>) -> &[T] {
    value.as_option().map(Vec::as_slice).unwrap_or_default()
}

/// Generic reconciler for one storage class kind.
pub struct StorageClassResource<K> {
    api: Arc<dyn ProxmoxApi>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: StorageClass> StorageClassResource<K> {
    pub fn new(api: Arc<dyn ProxmoxApi>) -> Self {
        Self {
            api,
            _kind: PhantomData,
        }
    }

    async fn fetch(&self, ctx: &Context, id: &str, summary: &str) -> Result<Option<K::Entity>> {
        ctx.call(pve_client::get::<_, K::Entity>(self.api.as_ref(), id))
            .await
            .map_err(ProviderError::remote(summary))
    }

    fn not_found(id: &str) -> ProviderError {
        ProviderError::NotFound {
            what: K::DISPLAY_NAME.to_string(),
            id: id.to_string(),
        }
    }

    /// Map a remote entity to state, keeping list order from `prior`.
    async fn to_state(
        &self,
        ctx: &Context,
        entity: K::Entity,
        prior: Option<&K::Model>,
        summary: &str,
    ) -> Result<K::Model> {
        let nodes = match entity.nodes() {
            Some(nodes) => nodes.to_vec(),
            None => ctx
                .call(self.api.list_node_names())
                .await
                .map_err(ProviderError::remote(summary))?,
        };
        let content = entity.content().to_vec();

        let (nodes, content) = match prior {
            Some(prior) => (
                reorder_like(prior_list(K::nodes(prior)), nodes),
                reorder_like(prior_list(K::content_types(prior)), content),
            ),
            None => (nodes, content),
        };

        Ok(K::to_model(entity, nodes, content))
    }

    async fn resolve(
        &self,
        ctx: &Context,
        plan: &K::Model,
        summary: &str,
    ) -> Result<(Vec<String>, Vec<ContentType>)> {
        let nodes = resolve_nodes(ctx, self.api.as_ref(), K::nodes(plan))
            .await
            .map_err(ProviderError::remote(summary))?;
        let content = resolve_content_types(K::content_types(plan), K::DEFAULT_CONTENT);
        Ok((nodes, content))
    }
}

#[async_trait]
impl<K: StorageClass> Resource for StorageClassResource<K> {
    type Model = K::Model;

    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema::<K>()
    }

    async fn create(&self, ctx: &Context, plan: K::Model) -> Result<K::Model> {
        let summary = format!("Error creating {}", K::DISPLAY_NAME);
        let id = K::id(&plan).to_string();

        let (nodes, content) = self.resolve(ctx, &plan, &summary).await?;
        let entity = K::build_entity(&plan, nodes, content);

        info!(id = %id, kind = %K::Entity::KIND, nodes = ?entity.nodes(), "Creating storage class");
        ctx.call(pve_client::create(self.api.as_ref(), entity))
            .await
            .map_err(ProviderError::remote(&summary))?;

        // Persist what the server reports, not the plan.
        let entity = self
            .fetch(ctx, &id, &summary)
            .await?
            .ok_or_else(|| Self::not_found(&id))?;
        self.to_state(ctx, entity, Some(&plan), &summary).await
    }

    async fn read(&self, ctx: &Context, state: K::Model) -> Result<Option<K::Model>> {
        let summary = format!("Error reading {}", K::DISPLAY_NAME);
        let id = K::id(&state);

        debug!(id = %id, kind = %K::Entity::KIND, "Reading storage class");
        match self.fetch(ctx, id, &summary).await? {
            Some(entity) => Ok(Some(self.to_state(ctx, entity, Some(&state), &summary).await?)),
            None => {
                info!(id = %id, "Storage class no longer exists, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, plan: K::Model, state: K::Model) -> Result<K::Model> {
        let summary = format!("Error updating {}", K::DISPLAY_NAME);
        let (nodes, content) = self.resolve(ctx, &plan, &summary).await?;

        let unchanged = same_elements(&nodes, prior_list(K::nodes(&state)))
            && same_elements(&content, prior_list(K::content_types(&state)));

        if unchanged {
            debug!(id = %K::id(&plan), "Storage class unchanged");
        } else {
            let id = K::id(&plan);
            info!(id = %id, nodes = ?nodes, content = ?content, "Modifying storage class");
            ctx.call(pve_client::modify::<_, K::Entity>(
                self.api.as_ref(),
                id,
                ModifyStorageRequest {
                    nodes: nodes.clone(),
                    content: content.clone(),
                },
            ))
            .await
            .map_err(ProviderError::remote(&summary))?;
        }

        Ok(K::with_resolved(plan, &state, nodes, content))
    }

    async fn delete(&self, ctx: &Context, state: K::Model) -> Result<()> {
        let id = K::id(&state);

        info!(id = %id, kind = %K::Entity::KIND, "Deleting storage class");
        ctx.call(pve_client::delete::<_, K::Entity>(self.api.as_ref(), id))
            .await
            .map_err(ProviderError::remote(format!(
                "Error deleting {}",
                K::DISPLAY_NAME
            )))
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<K::Model> {
        let summary = format!("Error importing {}", K::DISPLAY_NAME);
        let entity = self
            .fetch(ctx, id, &summary)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        self.to_state(ctx, entity, None, &summary).await
    }
}
