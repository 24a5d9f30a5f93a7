//! Apply-time defaults for storage class nodes and content types.

use pve_client::{ClientError, ContentType, NodeApi};
use tracing::debug;

use crate::resource::Context;
use crate::value::Value;

/// Nodes to configure: the planned list, or every cluster node when unset.
/// An empty list lifts the node restriction remotely, so it counts as unset.
///
/// Consults live cluster state, so a later plan may resolve differently
/// after nodes join or leave.
pub async fn resolve_nodes<A>(
    ctx: &Context,
    api: &A,
    planned: &Value<Vec<String>>,
) -> Result<Vec<String>, ClientError>
where
    A: NodeApi + ?Sized,
{
    match planned {
        Value::Known(nodes) if !nodes.is_empty() => Ok(nodes.clone()),
        _ => {
            let nodes = ctx.call(api.list_node_names()).await?;
            debug!(nodes = ?nodes, "Defaulting nodes to all cluster nodes");
            Ok(nodes)
        }
    }
}

/// Content types to configure: the planned list, or the kind's defaults
/// when unset or empty.
pub fn resolve_content_types(
    planned: &Value<Vec<ContentType>>,
    defaults: &[ContentType],
) -> Vec<ContentType> {
    match planned {
        Value::Known(content) if !content.is_empty() => content.clone(),
        _ => defaults.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Nodes {
        calls: AtomicUsize,
        result: fn() -> Result<Vec<String>, ClientError>,
    }

    #[async_trait]
    impl NodeApi for Nodes {
        async fn list_node_names(&self) -> Result<Vec<String>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn cluster() -> Nodes {
        Nodes {
            calls: AtomicUsize::new(0),
            result: || Ok(vec!["pve1".to_string(), "pve2".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_planned_nodes_are_kept() {
        let api = cluster();
        let planned = Value::Known(vec!["pve2".to_string()]);

        let nodes = resolve_nodes(&Context::default(), &api, &planned).await.unwrap();
        assert_eq!(nodes, vec!["pve2"]);
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unset_nodes_default_to_cluster() {
        let api = cluster();

        for planned in [Value::Null, Value::Unknown] {
            let nodes = resolve_nodes(&Context::default(), &api, &planned)
                .await
                .unwrap();
            assert_eq!(nodes, vec!["pve1", "pve2"]);
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_nodes_default_to_cluster() {
        let api = cluster();

        let nodes = resolve_nodes(&Context::default(), &api, &Value::Known(vec![]))
            .await
            .unwrap();
        assert_eq!(nodes, vec!["pve1", "pve2"]);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_node_lookup_failure_is_surfaced() {
        let api = Nodes {
            calls: AtomicUsize::new(0),
            result: || {
                Err(ClientError::Api {
                    status: 500,
                    message: "cluster not ready".to_string(),
                })
            },
        };

        let err = resolve_nodes(&Context::default(), &api, &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
    }

    #[test]
    fn test_content_defaults() {
        let defaults = [ContentType::Images, ContentType::Rootdir];
        assert_eq!(resolve_content_types(&Value::Null, &defaults), defaults);
        assert_eq!(
            resolve_content_types(&Value::Known(vec![ContentType::Iso]), &defaults),
            vec![ContentType::Iso]
        );
        assert_eq!(resolve_content_types(&Value::Known(vec![]), &defaults), defaults);
    }
}
