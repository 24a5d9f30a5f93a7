//! Resource and data source traits, and their JSON-erased handlers.
//!
//! Typed models are only converted to and from JSON at this boundary.

use std::future::Future;

use async_trait::async_trait;
use pve_client::{ClientError, cancellable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};
use crate::schema::Schema;

/// Per-request context handed down from the host.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
}

impl Context {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run a facade call, aborting it when the request is cancelled.
    pub async fn call<T, F>(&self, call: F) -> std::result::Result<T, ClientError>
    where
        F: Future<Output = std::result::Result<T, ClientError>>,
    {
        cancellable(&self.cancel, call).await
    }
}

/// Lifecycle of one managed resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    type Model: Serialize + DeserializeOwned + Send + Sync + 'static;

    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Create the remote object and return the state to persist.
    async fn create(&self, ctx: &Context, plan: Self::Model) -> Result<Self::Model>;

    /// Refresh state. `None` means the object is gone and should be
    /// dropped from state.
    async fn read(&self, ctx: &Context, state: Self::Model) -> Result<Option<Self::Model>>;

    async fn update(
        &self,
        ctx: &Context,
        plan: Self::Model,
        state: Self::Model,
    ) -> Result<Self::Model>;

    async fn delete(&self, ctx: &Context, state: Self::Model) -> Result<()>;

    /// Seed state for an existing object.
    async fn import(&self, ctx: &Context, id: &str) -> Result<Self::Model>;
}

/// A read-only listing.
#[async_trait]
pub trait DataSource: Send + Sync {
    type Model: Serialize + DeserializeOwned + Send + Sync + 'static;

    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, ctx: &Context, config: Self::Model) -> Result<Self::Model>;
}

fn decode<T: DeserializeOwned>(what: &'static str, doc: Json) -> Result<T> {
    serde_json::from_value(doc).map_err(|source| ProviderError::Document { what, source })
}

fn encode<T: Serialize>(what: &'static str, model: &T) -> Result<Json> {
    serde_json::to_value(model).map_err(|source| ProviderError::Document { what, source })
}

/// Object-safe view of a [`Resource`] over JSON documents.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn create(&self, ctx: &Context, plan: Json) -> Result<Json>;

    async fn read(&self, ctx: &Context, state: Json) -> Result<Option<Json>>;

    async fn update(&self, ctx: &Context, plan: Json, state: Json) -> Result<Json>;

    async fn delete(&self, ctx: &Context, state: Json) -> Result<()>;

    async fn import(&self, ctx: &Context, id: &str) -> Result<Json>;
}

/// Object-safe view of a [`DataSource`] over JSON documents.
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, ctx: &Context, config: Json) -> Result<Json>;
}

/// Adapts a typed [`Resource`] to [`ResourceHandler`].
pub struct Typed<R>(pub R);

#[async_trait]
impl<R: Resource> ResourceHandler for Typed<R> {
    fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    async fn create(&self, ctx: &Context, plan: Json) -> Result<Json> {
        let plan = decode("plan", plan)?;
        let state = self.0.create(ctx, plan).await?;
        encode("state", &state)
    }

    async fn read(&self, ctx: &Context, state: Json) -> Result<Option<Json>> {
        let state = decode("state", state)?;
        match self.0.read(ctx, state).await? {
            Some(state) => Ok(Some(encode("state", &state)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, ctx: &Context, plan: Json, state: Json) -> Result<Json> {
        let plan = decode("plan", plan)?;
        let state = decode("state", state)?;
        let state = self.0.update(ctx, plan, state).await?;
        encode("state", &state)
    }

    async fn delete(&self, ctx: &Context, state: Json) -> Result<()> {
        let state = decode("state", state)?;
        self.0.delete(ctx, state).await
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<Json> {
        let state = self.0.import(ctx, id).await?;
        encode("state", &state)
    }
}

/// Adapts a typed [`DataSource`] to [`DataSourceHandler`].
pub struct TypedSource<D>(pub D);

#[async_trait]
impl<D: DataSource> DataSourceHandler for TypedSource<D> {
    fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    async fn read(&self, ctx: &Context, config: Json) -> Result<Json> {
        let config = decode("config", config)?;
        let state = self.0.read(ctx, config).await?;
        encode("state", &state)
    }
}
