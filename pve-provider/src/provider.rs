//! Registry of resources and data sources, and dispatch by type name.

use std::collections::BTreeMap;
use std::sync::Arc;

use pve_client::ProxmoxApi;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::debug;

use crate::datasource::{PoolSource, StorageClassSource, StorageSource};
use crate::diagnostics::Diagnostics;
use crate::error::{ProviderError, Result};
use crate::pool::PoolResource;
use crate::resource::{Context, DataSourceHandler, ResourceHandler, Typed, TypedSource};
use crate::schema::Schema;
use crate::storage::{Lvm, LvmThin, Nfs, StorageClass, StorageClassResource, Zfs};

/// Every schema the provider serves.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    pub resources: Vec<Schema>,
    pub data_sources: Vec<Schema>,
}

/// A configured provider. Holds nothing but the facade handle shared by
/// its handlers.
pub struct Provider {
    resources: BTreeMap<&'static str, Box<dyn ResourceHandler>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSourceHandler>>,
}

impl Provider {
    pub fn configure(api: Arc<dyn ProxmoxApi>) -> Self {
        let mut provider = Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        };

        provider.add_resource(Box::new(Typed(PoolResource::new(Arc::clone(&api)))));
        provider.add_storage_class::<Lvm>(&api);
        provider.add_storage_class::<LvmThin>(&api);
        provider.add_storage_class::<Nfs>(&api);
        provider.add_storage_class::<Zfs>(&api);

        provider.add_data_source(Box::new(TypedSource(PoolSource::new(Arc::clone(&api)))));
        provider.add_data_source(Box::new(TypedSource(StorageSource::new(api))));

        provider
    }

    fn add_resource(&mut self, handler: Box<dyn ResourceHandler>) {
        self.resources.insert(handler.type_name(), handler);
    }

    fn add_data_source(&mut self, handler: Box<dyn DataSourceHandler>) {
        self.data_sources.insert(handler.type_name(), handler);
    }

    fn add_storage_class<K: StorageClass>(&mut self, api: &Arc<dyn ProxmoxApi>) {
        self.add_resource(Box::new(Typed(StorageClassResource::<K>::new(Arc::clone(api)))));
        self.add_data_source(Box::new(TypedSource(StorageClassSource::<K>::new(
            Arc::clone(api),
        ))));
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    pub fn schemas(&self) -> ProviderSchema {
        ProviderSchema {
            resources: self.resources.values().map(|r| r.schema()).collect(),
            data_sources: self.data_sources.values().map(|d| d.schema()).collect(),
        }
    }

    fn resource(&self, type_name: &str) -> Result<&dyn ResourceHandler> {
        self.resources
            .get(type_name)
            .map(|handler| &**handler)
            .ok_or_else(|| ProviderError::UnknownType(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> Result<&dyn DataSourceHandler> {
        self.data_sources
            .get(type_name)
            .map(|handler| &**handler)
            .ok_or_else(|| ProviderError::UnknownType(type_name.to_string()))
    }

    fn schema_of(&self, type_name: &str) -> Result<Schema> {
        match self.resources.get(type_name) {
            Some(resource) => Ok(resource.schema()),
            None => Ok(self.data_source(type_name)?.schema()),
        }
    }

    /// Validate a configuration document of any registered type.
    pub fn validate(&self, type_name: &str, config: &Json) -> Result<Diagnostics> {
        Ok(self.schema_of(type_name)?.validate(config))
    }

    /// Attributes whose change forces `type_name` to be replaced.
    pub fn plan(&self, type_name: &str, prior: &Json, proposed: &Json) -> Result<Vec<String>> {
        let schema = self.resource(type_name)?.schema();
        checked(schema.validate_plan(proposed))?;
        Ok(schema.requires_replace(prior, proposed))
    }

    pub async fn create(&self, ctx: &Context, type_name: &str, plan: Json) -> Result<Json> {
        let resource = self.resource(type_name)?;
        checked(resource.schema().validate_plan(&plan))?;
        debug!(type_name, "Dispatching create");
        resource.create(ctx, plan).await
    }

    pub async fn read(&self, ctx: &Context, type_name: &str, state: Json) -> Result<Option<Json>> {
        self.resource(type_name)?.read(ctx, state).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        type_name: &str,
        plan: Json,
        state: Json,
    ) -> Result<Json> {
        let resource = self.resource(type_name)?;
        checked(resource.schema().validate_plan(&plan))?;
        debug!(type_name, "Dispatching update");
        resource.update(ctx, plan, state).await
    }

    pub async fn delete(&self, ctx: &Context, type_name: &str, state: Json) -> Result<()> {
        self.resource(type_name)?.delete(ctx, state).await
    }

    pub async fn import(&self, ctx: &Context, type_name: &str, id: &str) -> Result<Json> {
        self.resource(type_name)?.import(ctx, id).await
    }

    pub async fn read_data_source(
        &self,
        ctx: &Context,
        type_name: &str,
        config: Json,
    ) -> Result<Json> {
        let source = self.data_source(type_name)?;
        checked(source.schema().validate(&config))?;
        source.read(ctx, config).await
    }
}

fn checked(diagnostics: Diagnostics) -> Result<()> {
    if diagnostics.has_errors() {
        Err(ProviderError::Validation(diagnostics))
    } else {
        Ok(())
    }
}
