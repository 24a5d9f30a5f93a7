//! pve-provider: declarative reconciliation of Proxmox VE resource pools and
//! storage classes.
//!
//! Resources and data sources are registered on a [`Provider`], which the
//! `pve-provider` binary drives over a line-delimited JSON protocol.

pub mod datasource;
pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod members;
pub mod pool;
pub mod protocol;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod storage;
pub mod value;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ProviderError, Result};
pub use provider::{Provider, ProviderSchema};
pub use resource::{Context, DataSource, Resource};
pub use value::Value;
