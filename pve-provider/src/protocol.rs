//! Line-delimited JSON protocol spoken with the host orchestrator.
//!
//! Each stdin line is one [`Request`]; each stdout line is one
//! [`Response`] carrying the same `id`. Requests may complete out of order.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ProviderError;
use crate::provider::{Provider, ProviderSchema};
use crate::resource::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Schema,
    Validate,
    Plan,
    Create,
    Read,
    Update,
    Delete,
    Import,
    ReadDataSource,
    Cancel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub id: String,
    pub op: Operation,
    #[serde(default, rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub plan: Json,
    #[serde(default)]
    pub state: Json,
    #[serde(default)]
    pub config: Json,
    #[serde(default)]
    pub import_id: Option<String>,
    /// Request to abort, for `cancel`.
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Response {
    pub id: String,
    /// New state. `null` after delete, or after a read of a vanished object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<ProviderSchema>,
    pub diagnostics: Diagnostics,
}

impl Response {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Response for a line that could not be parsed as a request.
    pub fn malformed(error: &serde_json::Error) -> Self {
        let mut response = Self::new("");
        response
            .diagnostics
            .push(Diagnostic::error("Malformed request", error.to_string()));
        response
    }
}

/// Cancellation tokens of the requests currently running.
#[derive(Debug, Default)]
pub struct InFlight {
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request; its token is a child of `parent`.
    pub fn register(&self, id: &str, parent: &CancellationToken) -> CancellationToken {
        let token = parent.child_token();
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(id.to_string(), token.clone());
        }
        token
    }

    pub fn finish(&self, id: &str) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.remove(id);
        }
    }

    /// Cancel a running request. Returns false if it is not running.
    pub fn cancel(&self, id: &str) -> bool {
        let token = self.tokens.lock().ok().and_then(|t| t.get(id).cloned());
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run one request to completion. Errors become diagnostics.
pub async fn handle(provider: &Provider, inflight: &InFlight, ctx: &Context, req: Request) -> Response {
    let mut response = Response::new(&req.id);
    debug!(id = %req.id, op = ?req.op, type_name = %req.type_name, "Handling request");

    let result = dispatch(provider, inflight, ctx, req, &mut response).await;
    if let Err(e) = result {
        warn!(id = %response.id, error = %e, "Request failed");
        response.diagnostics.extend(e.to_diagnostics());
    }
    response
}

async fn dispatch(
    provider: &Provider,
    inflight: &InFlight,
    ctx: &Context,
    req: Request,
    response: &mut Response,
) -> Result<(), ProviderError> {
    let type_name = req.type_name.as_str();
    match req.op {
        Operation::Schema => {
            response.schema = Some(provider.schemas());
        }
        Operation::Validate => {
            let diagnostics = provider.validate(type_name, &req.config)?;
            response.diagnostics.extend(diagnostics);
        }
        Operation::Plan => {
            response.replace = Some(provider.plan(type_name, &req.state, &req.plan)?);
            response.state = Some(req.plan);
        }
        Operation::Create => {
            response.state = Some(provider.create(ctx, type_name, req.plan).await?);
        }
        Operation::Read => {
            response.state = provider.read(ctx, type_name, req.state).await?;
        }
        Operation::Update => {
            response.state = Some(provider.update(ctx, type_name, req.plan, req.state).await?);
        }
        Operation::Delete => {
            provider.delete(ctx, type_name, req.state).await?;
        }
        Operation::Import => {
            let id = req
                .import_id
                .ok_or_else(|| ProviderError::invalid("import_id", "import requires an id"))?;
            response.state = Some(provider.import(ctx, type_name, &id).await?);
        }
        Operation::ReadDataSource => {
            response.state = Some(provider.read_data_source(ctx, type_name, req.config).await?);
        }
        Operation::Cancel => {
            let target = req
                .target
                .ok_or_else(|| ProviderError::invalid("target", "cancel requires a target id"))?;
            if !inflight.cancel(&target) {
                response.diagnostics.push(Diagnostic::warning(
                    "Nothing to cancel",
                    format!("request '{}' is not running", target),
                ));
            }
        }
    }
    Ok(())
}
